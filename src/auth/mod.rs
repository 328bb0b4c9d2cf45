//! Principals, roles, token signing and password credentials.

pub mod password;
pub mod token;

use serde::{Deserialize, Serialize};

pub use password::{hash_password, PasswordCredential};
pub use token::{Claims, InvalidToken, JwtError, TokenCodec};

/// Subject id carried by tokens issued to the bootstrap admin.
pub const BOOTSTRAP_ADMIN_ID: i64 = 0;

/// User role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    #[default]
    User,
    /// Administrator.
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Role of a stored account, where a missing role means `user`.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Role::User,
            Some(other) => other.parse().unwrap_or_else(|_| {
                tracing::warn!("Unknown stored role '{}', treating as user", other);
                Role::User
            }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Authenticated identity reconstructed from a verified token, valid for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub subject_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(subject_id: i64, role: Role) -> Self {
        Self { subject_id, role }
    }

    pub fn bootstrap_admin() -> Self {
        Self::new(BOOTSTRAP_ADMIN_ID, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
