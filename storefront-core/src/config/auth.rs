//! User token configuration.

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC key for user bearer tokens.
    pub token_secret: Box<[u8]>,
    /// Maximum token age in seconds.
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn new(token_secret: impl Into<Box<[u8]>>, token_ttl_secs: i64) -> Self {
        Self {
            token_secret: token_secret.into(),
            token_ttl_secs,
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.token_secret
    }
}
