use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use warden_core::{AssetLoader, ClientUid, load_json};

use super::{TokenError, TokenFactory, lifetime, now};

/// Audience the identity toolkit expects in custom tokens.
pub const FIREBASE_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Custom tokens are rejected by the toolkit beyond one hour.
pub const MAX_FIREBASE_LIFETIME_SECS: u64 = 3600;

/// The fields of a service-account descriptor this factory needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleClaims {
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: String,
    pub claims: RoleClaims,
}

/// Custom tokens signed with a service-account key.
///
/// `client_uid` is not part of the token: the audience is fixed by the
/// identity toolkit.
pub struct FirebaseTokenFactory {
    loader: Arc<dyn AssetLoader>,
    lifetime_secs: u64,
}

impl FirebaseTokenFactory {
    pub fn new(loader: Arc<dyn AssetLoader>, lifetime_secs: u64) -> Self {
        Self {
            loader,
            lifetime_secs: lifetime_secs.min(MAX_FIREBASE_LIFETIME_SECS),
        }
    }
}

impl TokenFactory for FirebaseTokenFactory {
    fn create_token(
        &self,
        key_uri: &str,
        _client_uid: ClientUid,
        username: &str,
        role: &str,
    ) -> Result<String, TokenError> {
        let account: ServiceAccount = load_json(&*self.loader, key_uri)?;
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes()).map_err(|e| {
            TokenError::InvalidKey {
                uri: key_uri.to_string(),
                message: e.to_string(),
            }
        })?;

        let iat = now();
        let claims = FirebaseClaims {
            iss: account.client_email.clone(),
            sub: account.client_email,
            aud: FIREBASE_AUDIENCE.to_string(),
            iat,
            exp: iat.saturating_add(lifetime(self.lifetime_secs)),
            uid: username.to_string(),
            claims: RoleClaims {
                role: role.to_string(),
            },
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = account.private_key_id;
        encode(&header, &claims, &key).map_err(TokenError::Sign)
    }
}
