//! Password hashing and complexity rules.
//!
//! Hashes use Argon2id in PHC string format, so the algorithm parameters and
//! salt travel with the hash and verification works across parameter changes.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// The plaintext does not match the stored hash.
    #[error("password does not match")]
    Mismatch,

    /// Hashing failed or the stored hash is malformed.
    #[error("password hash error: {0}")]
    Hash(String),
}

/// Slow adaptive password hash.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, PasswordError>;

    fn verify(&self, hash: &str, password: &str) -> Result<(), PasswordError>;
}

/// Argon2id hasher with a random salt per hash.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, hash: &str, password: &str) -> Result<(), PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::Hash(e.to_string()))?;
        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(PasswordError::Mismatch),
            Err(e) => Err(PasswordError::Hash(e.to_string())),
        }
    }
}

/// Complexity requirements for new passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordCriteria {
    /// Minimum length in characters.
    pub min_length: usize,
    pub require_lower: bool,
    pub require_upper: bool,
    pub require_digit: bool,
    pub require_symbol: bool,
}

impl Default for PasswordCriteria {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_lower: true,
            require_upper: true,
            require_digit: true,
            require_symbol: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStatus {
    Valid,
    TooShort { min_length: usize },
    MissingLower,
    MissingUpper,
    MissingDigit,
    MissingSymbol,
}

impl PasswordStatus {
    pub fn is_valid(self) -> bool {
        self == PasswordStatus::Valid
    }

    pub fn message(self) -> String {
        match self {
            PasswordStatus::Valid => "password is valid".to_string(),
            PasswordStatus::TooShort { min_length } => {
                format!("password must be at least {min_length} characters long")
            }
            PasswordStatus::MissingLower => "password must contain a lowercase letter".to_string(),
            PasswordStatus::MissingUpper => "password must contain an uppercase letter".to_string(),
            PasswordStatus::MissingDigit => "password must contain a digit".to_string(),
            PasswordStatus::MissingSymbol => "password must contain a symbol".to_string(),
        }
    }
}

/// Checks a candidate password against [`PasswordCriteria`].
///
/// Rules are checked in a fixed order (length, lowercase, uppercase, digit,
/// symbol); the first failing rule is reported.
#[derive(Debug, Clone, Default)]
pub struct PasswordCriteriaValidator {
    criteria: PasswordCriteria,
}

impl PasswordCriteriaValidator {
    pub fn new(criteria: PasswordCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &PasswordCriteria {
        &self.criteria
    }

    pub fn validate(&self, password: &str) -> PasswordStatus {
        let c = &self.criteria;
        if password.chars().count() < c.min_length {
            return PasswordStatus::TooShort {
                min_length: c.min_length,
            };
        }
        if c.require_lower && !password.chars().any(char::is_lowercase) {
            return PasswordStatus::MissingLower;
        }
        if c.require_upper && !password.chars().any(char::is_uppercase) {
            return PasswordStatus::MissingUpper;
        }
        if c.require_digit && !password.chars().any(|ch| ch.is_ascii_digit()) {
            return PasswordStatus::MissingDigit;
        }
        if c.require_symbol && !password.chars().any(is_symbol) {
            return PasswordStatus::MissingSymbol;
        }
        PasswordStatus::Valid
    }
}

fn is_symbol(ch: char) -> bool {
    !ch.is_alphanumeric() && !ch.is_whitespace()
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2Hasher {
    match Params::new(Params::MIN_M_COST, 1, 1, None) {
        Ok(params) => Argon2Hasher::new(params),
        Err(e) => panic!("argon2 params: {e}"),
    }
}
