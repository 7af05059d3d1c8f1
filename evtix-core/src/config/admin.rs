use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Admin API configuration with the argon2-hashed secret.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub secret_hash: String,
}

impl AdminConfig {
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Check a presented secret against the stored hash. A malformed hash
    /// rejects everything.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}
