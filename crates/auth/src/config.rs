use warden_core::Rank;

use crate::password::PasswordCriteria;

/// Process-lifetime settings consumed by the controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// `iss` claim of tokens minted by the default factory.
    pub token_issuer: String,
    pub token_lifetime_secs: u64,
    /// Minimum session rank allowed to manage clients.
    pub client_management_rank: Rank,
    pub password_criteria: PasswordCriteria,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_issuer: "warden".to_string(),
            token_lifetime_secs: 3600,
            client_management_rank: Rank::new(10),
            password_criteria: PasswordCriteria::default(),
        }
    }
}
