//! Redirect-token issuance: authenticate a user for a client and hand back
//! the client's redirect URL carrying a freshly signed token.

use url::{Url, form_urlencoded};
use warden_core::{ClientUid, DataStore, ErrorKind, ServiceError, ServiceResult};

use crate::authenticate::Authenticator;
use crate::clients::fetch_client;
use crate::token::TokenFactorySelector;

/// Covers both bad credentials and a user without a role on the client.
pub const NOT_ASSIGNED: &str = "invalid username/password, or user not assigned to this client";

pub struct TokenIssuer {
    authenticator: Authenticator,
    selector: TokenFactorySelector,
}

impl TokenIssuer {
    pub fn new(authenticator: Authenticator, selector: TokenFactorySelector) -> Self {
        Self {
            authenticator,
            selector,
        }
    }

    /// Read-only; never mutates storage.
    pub fn issue_redirect_token<S>(
        &self,
        store: &S,
        client_uid: ClientUid,
        username: &str,
        password: &str,
    ) -> ServiceResult<String>
    where
        S: DataStore + ?Sized,
    {
        let client = fetch_client(store, client_uid)?;

        self.authenticator
            .authenticate(store, username, password)
            .map_err(|e| match e.kind() {
                ErrorKind::Client => ServiceError::client(NOT_ASSIGNED),
                _ => e,
            })?;

        let role = store
            .get_user_role_by_client_and_username(client_uid, username)
            .map_err(|e| ServiceError::internal("error fetching user role", e))?
            .ok_or_else(|| ServiceError::client(NOT_ASSIGNED))?;

        let token = self
            .selector
            .select(client.token_type)
            .create_token(&client.key_uri, client_uid, username, &role.role)
            .map_err(|e| ServiceError::internal("error creating token", e))?;

        let url = with_token(&client.redirect_url, &token)
            .map_err(|e| ServiceError::internal("error parsing redirect url", e))?;

        tracing::info!(%client_uid, %username, token_type = %client.token_type, "token issued");
        Ok(url)
    }
}

/// Set (or replace) the `token` query parameter. Every other query segment
/// is kept byte for byte, in order.
fn with_token(redirect_url: &str, token: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(redirect_url)?;
    let mut query: String = url
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| {
            let key = segment.split_once('=').map_or(*segment, |(key, _)| key);
            !segment.is_empty() && key != "token"
        })
        .flat_map(|segment| [segment, "&"])
        .collect();
    query.push_str("token=");
    query.extend(form_urlencoded::byte_serialize(token.as_bytes()));
    url.set_query(Some(&query));
    Ok(url.into())
}
