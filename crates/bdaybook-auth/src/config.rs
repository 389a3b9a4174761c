//! Authentication configuration.

/// Configuration for the authentication service.
///
/// Every token purpose signs with its own secret; leaking one secret
/// cannot forge tokens of another purpose.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    pub access_token_secret: String,
    /// HMAC secret for refresh tokens.
    pub refresh_token_secret: String,
    /// HMAC secret for email-verification tokens.
    pub verification_token_secret: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    /// The single policy constant governing both the refresh JWT `exp`
    /// and the ledger row's `expires_at`.
    pub refresh_token_ttl_secs: u64,
    /// Verification token lifetime in seconds (default: 86_400 = 24 hours).
    pub verification_token_ttl_secs: u64,
    /// Base URL embedded in verification links.
    pub verification_base_url: String,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: String::new(),
            refresh_token_secret: String::new(),
            verification_token_secret: String::new(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 2_592_000,
            verification_token_ttl_secs: 86_400,
            verification_base_url: "http://localhost:3000".into(),
            pepper: None,
            min_password_length: 8,
        }
    }
}
