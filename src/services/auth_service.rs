use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::{hash_password, JwtError, PasswordCredential, Principal, Role, TokenCodec, BOOTSTRAP_ADMIN_ID};
use crate::config::BootstrapAdmin;
use crate::database::models::NewUser;
use crate::database::{Store, StoreError, UserStore};
use crate::error::ApiError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword", alias = "confirm_password")]
    pub confirm_password: Option<String>,
}

/// User block returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginSuccess {
    pub message: &'static str,
    pub user: SessionUser,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub message: &'static str,
    pub id: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username and password required")]
    MissingCredentials,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account inactive")]
    AccountInactive,

    #[error("{message}")]
    Validation {
        message: String,
        fields: HashMap<String, String>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::bad_request(err.to_string()),
            AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::AccountInactive => ApiError::forbidden(err.to_string()),
            AuthError::Validation { message, fields } => ApiError::validation_error(message, Some(fields)),
            AuthError::Conflict(message) => ApiError::conflict(message),
            AuthError::Store(e) => e.into(),
            AuthError::Token(e) => e.into(),
            AuthError::Hashing(e) => {
                tracing::error!("{}", e);
                ApiError::server_error()
            }
        }
    }
}

/// Login and registration against the user store and the configured bootstrap admin.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn Store>,
    codec: TokenCodec,
    bootstrap_admin: Option<BootstrapAdmin>,
}

impl AuthService {
    pub fn new(users: Arc<dyn Store>, codec: TokenCodec, bootstrap_admin: Option<BootstrapAdmin>) -> Self {
        Self {
            users,
            codec,
            bootstrap_admin,
        }
    }

    /// Authenticate a username-or-email and password.
    ///
    /// Order matters: the bootstrap admin is checked before the store, an
    /// unknown login and a wrong password fail identically, and the active
    /// flag is only consulted after the password matched.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginSuccess, AuthError> {
        let login = request.username.unwrap_or_default().trim().to_string();
        let password = request.password.unwrap_or_default();
        if login.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        if let Some(admin) = self.bootstrap_admin_for(&login, &password) {
            let token = self.codec.issue(&Principal::bootstrap_admin())?;
            info!("Bootstrap admin '{}' logged in", admin.username);
            return Ok(LoginSuccess {
                message: "Admin login successful",
                user: SessionUser {
                    id: BOOTSTRAP_ADMIN_ID,
                    username: admin.username.clone(),
                    email: admin.email.clone(),
                    role: Role::Admin,
                    is_admin: true,
                },
                token,
            });
        }

        let Some(account) = self.users.find_user_by_login(&login).await? else {
            debug!("Login failed: no account for '{}'", login);
            return Err(AuthError::InvalidCredentials);
        };

        let credential = account.credential();
        if credential.is_legacy() {
            warn!("Account {} still stores an unhashed password", account.id);
        }
        if !verify_password(credential, password).await {
            debug!("Login failed: wrong password for account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !account.is_active {
            info!("Login refused for inactive account {}", account.id);
            return Err(AuthError::AccountInactive);
        }

        self.users.record_login(account.id).await?;

        let role = account.role();
        let token = self.codec.issue(&Principal::new(account.id, role))?;
        info!("Account {} logged in as {}", account.id, role);

        Ok(LoginSuccess {
            message: "Login successful",
            user: SessionUser {
                id: account.id,
                username: account.username,
                email: account.email,
                role,
                is_admin: role == Role::Admin,
            },
            token,
        })
    }

    /// Create a regular, active user with a bcrypt-hashed password.
    pub async fn register(&self, request: RegisterRequest) -> Result<Registered, AuthError> {
        let username = request.username.unwrap_or_default().trim().to_string();
        let email = request.email.unwrap_or_default().trim().to_string();
        let password = request.password.unwrap_or_default();
        let confirm = request.confirm_password.unwrap_or_default();

        let mut fields = HashMap::new();
        if username.is_empty() {
            fields.insert("username".to_string(), "This field is required".to_string());
        } else if !valid_username(&username) {
            fields.insert(
                "username".to_string(),
                "Must be 3-50 characters of letters, digits, '.', '_' or '-'".to_string(),
            );
        }
        if email.is_empty() {
            fields.insert("email".to_string(), "This field is required".to_string());
        } else if !valid_email(&email) {
            fields.insert("email".to_string(), "Invalid email address".to_string());
        }
        if password.is_empty() {
            fields.insert("password".to_string(), "This field is required".to_string());
        } else if password.chars().count() < 6 {
            fields.insert("password".to_string(), "Must be at least 6 characters".to_string());
        }
        if password != confirm {
            fields.insert("confirmPassword".to_string(), "Passwords do not match".to_string());
        }
        if !fields.is_empty() {
            return Err(AuthError::Validation {
                message: "Invalid registration data".to_string(),
                fields,
            });
        }

        if let Some(admin) = &self.bootstrap_admin {
            if username == admin.username || email == admin.email {
                return Err(AuthError::Conflict("Username or email already registered".to_string()));
            }
        }

        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let id = match self.users.create_user(NewUser::regular(username.clone(), email, password_hash)).await {
            Ok(id) => id,
            Err(StoreError::Conflict(message)) => return Err(AuthError::Conflict(message)),
            Err(e) => return Err(e.into()),
        };
        info!("Registered account {} ('{}')", id, username);

        Ok(Registered {
            message: "Registration successful",
            id,
        })
    }

    fn bootstrap_admin_for(&self, login: &str, password: &str) -> Option<&BootstrapAdmin> {
        self.bootstrap_admin
            .as_ref()
            .filter(|admin| (login == admin.username || login == admin.email) && password == admin.password)
    }
}

async fn verify_password(credential: PasswordCredential, candidate: String) -> bool {
    match tokio::task::spawn_blocking(move || credential.verify(&candidate)).await {
        Ok(valid) => valid,
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}

fn valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (3..=50).contains(&len)
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn valid_email(email: &str) -> bool {
    if email.len() > 255 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
