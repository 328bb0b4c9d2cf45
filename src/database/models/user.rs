use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::auth::{PasswordCredential, Role};

/// A persisted account row from `users`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn credential(&self) -> PasswordCredential {
        PasswordCredential::from_stored(&self.password)
    }

    pub fn role(&self) -> Role {
        Role::from_stored(self.role.as_deref())
    }

    /// Username or email match, the lookup rule used at login.
    pub fn matches_login(&self, login: &str) -> bool {
        self.username == login || self.email == login
    }
}

/// Insert payload for `users`; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub email_verified: bool,
}

impl NewUser {
    pub fn regular(username: String, email: String, password_hash: String) -> Self {
        Self {
            username,
            email,
            password_hash,
            role: Role::User,
            is_active: true,
            email_verified: false,
        }
    }
}
