//! Signed identity tokens for clients.
//!
//! Each [`TokenType`] maps to exactly one [`TokenFactory`]. Selection is an
//! exhaustive match, so adding a token type without a factory does not compile.

mod default;
mod firebase;

use std::sync::Arc;

use thiserror::Error;
use warden_core::{AssetLoader, ClientUid, LoadError, TokenType};

pub use default::{DefaultClaims, DefaultTokenFactory};
pub use firebase::{
    FIREBASE_AUDIENCE, FirebaseClaims, FirebaseTokenFactory, MAX_FIREBASE_LIFETIME_SECS,
    RoleClaims, ServiceAccount,
};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("invalid signing key '{uri}': {message}")]
    InvalidKey { uri: String, message: String },

    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

/// Produces a signed credential asserting `username` holds `role` on `client_uid`.
pub trait TokenFactory: Send + Sync {
    fn create_token(
        &self,
        key_uri: &str,
        client_uid: ClientUid,
        username: &str,
        role: &str,
    ) -> Result<String, TokenError>;
}

pub struct TokenFactorySelector {
    default: DefaultTokenFactory,
    firebase: FirebaseTokenFactory,
}

impl TokenFactorySelector {
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        issuer: impl Into<String>,
        lifetime_secs: u64,
    ) -> Self {
        Self {
            default: DefaultTokenFactory::new(loader.clone(), issuer, lifetime_secs),
            firebase: FirebaseTokenFactory::new(loader, lifetime_secs),
        }
    }

    pub fn select(&self, token_type: TokenType) -> &dyn TokenFactory {
        match token_type {
            TokenType::Default => &self.default,
            TokenType::Firebase => &self.firebase,
        }
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Lifetimes are configured as unsigned seconds; claims carry signed timestamps.
fn lifetime(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 2)
}
