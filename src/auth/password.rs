use anyhow::Context;

const BCRYPT_PREFIXES: [&str; 4] = ["$2a$", "$2b$", "$2x$", "$2y$"];

/// A stored password, classified once so the legacy path stays explicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordCredential {
    /// bcrypt hash
    Hashed(String),
    /// Unhashed value kept for accounts created before hashing was introduced.
    Plaintext(String),
}

impl PasswordCredential {
    pub fn from_stored(stored: &str) -> Self {
        if BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix)) {
            PasswordCredential::Hashed(stored.to_string())
        } else {
            PasswordCredential::Plaintext(stored.to_string())
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, PasswordCredential::Plaintext(_))
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match self {
            PasswordCredential::Hashed(hash) => match bcrypt::verify(candidate, hash) {
                Ok(valid) => valid,
                Err(e) => {
                    tracing::warn!("Stored bcrypt hash could not be verified: {}", e);
                    false
                }
            },
            PasswordCredential::Plaintext(stored) => stored == candidate,
        }
    }
}

/// Hash a password using bcrypt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    // Lower cost keeps debug builds and tests fast
    let cost = if cfg!(debug_assertions) { 4 } else { bcrypt::DEFAULT_COST };
    bcrypt::hash(password, cost).context("Failed to hash password")
}
