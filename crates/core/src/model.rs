//! Persisted entities.
//!
//! Values of these types are request-scoped snapshots of storage rows; nothing
//! here is cached across requests.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{ClientUid, SessionToken};

pub const MAX_USERNAME_LEN: usize = 30;
pub const MAX_CLIENT_NAME_LEN: usize = 30;
pub const MAX_REDIRECT_URL_LEN: usize = 100;
pub const MAX_KEY_URI_LEN: usize = 100;
pub const MAX_ROLE_LEN: usize = 15;

/// Privilege level. Higher ranks act on strictly lower ranks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(u32);

impl Rank {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether an actor of this rank may act on a subject of rank `subject`.
    pub fn outranks(self, subject: Rank) -> bool {
        subject < self
    }
}

impl core::fmt::Display for Rank {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for Rank {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: String,
    pub rank: Rank,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Signing strategy a client expects its identity tokens in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// RS256 JWT signed with a locally held private key.
    Default,
    /// Third-party custom token signed with a service-account key.
    Firebase,
}

impl TokenType {
    pub const ALL: [TokenType; 2] = [TokenType::Default, TokenType::Firebase];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Default => "default",
            TokenType::Firebase => "firebase",
        }
    }
}

impl core::fmt::Display for TokenType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized token type '{0}'")]
pub struct UnknownTokenType(pub String);

impl FromStr for TokenType {
    type Err = UnknownTokenType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(TokenType::Default),
            "firebase" => Ok(TokenType::Firebase),
            other => Err(UnknownTokenType(other.to_string())),
        }
    }
}

/// A relying application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Client {
    pub uid: ClientUid,
    pub name: String,
    pub redirect_url: String,
    pub token_type: TokenType,
    /// Locates the signing key (or service-account descriptor) under the static-asset root.
    pub key_uri: String,
}

/// A bearer session.
///
/// `rank` is the owner's rank at login time; permission checks use it without
/// re-reading the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    pub rank: Rank,
}

/// Role label a user holds for one client; injected into issued token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRole {
    pub client_uid: ClientUid,
    pub username: String,
    pub role: String,
}
