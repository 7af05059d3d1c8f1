/// Service API configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HMAC key shared with the identity/session backend.
    pub secret: Box<[u8]>,
}

impl ServiceConfig {
    pub fn new(secret: impl Into<Box<[u8]>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }
}
