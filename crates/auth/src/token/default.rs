use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use warden_core::{AssetLoader, ClientUid};

use super::{TokenError, TokenFactory, lifetime, now};

/// Claims of a locally signed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultClaims {
    pub iss: String,
    /// The client's uid.
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub username: String,
    pub role: String,
}

/// RS256 tokens signed with a PEM private key stored at the client's `key_uri`.
pub struct DefaultTokenFactory {
    loader: Arc<dyn AssetLoader>,
    issuer: String,
    lifetime_secs: u64,
}

impl DefaultTokenFactory {
    pub fn new(
        loader: Arc<dyn AssetLoader>,
        issuer: impl Into<String>,
        lifetime_secs: u64,
    ) -> Self {
        Self {
            loader,
            issuer: issuer.into(),
            lifetime_secs,
        }
    }
}

impl TokenFactory for DefaultTokenFactory {
    fn create_token(
        &self,
        key_uri: &str,
        client_uid: ClientUid,
        username: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        let pem = self.loader.load(key_uri)?;
        let key = EncodingKey::from_rsa_pem(&pem).map_err(|e| TokenError::InvalidKey {
            uri: key_uri.to_string(),
            message: e.to_string(),
        })?;

        let iat = now();
        let claims = DefaultClaims {
            iss: self.issuer.clone(),
            aud: client_uid.to_string(),
            iat,
            exp: iat.saturating_add(lifetime(self.lifetime_secs)),
            username: username.to_string(),
            role: role.to_string(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(TokenError::Sign)
    }
}
