//! Username/password verification.

use std::sync::{Arc, OnceLock};

use warden_core::{ServiceError, ServiceResult, User, UserStore};

use crate::password::{PasswordError, PasswordHasher};

/// Shared by unknown-user and wrong-password failures so the two are
/// indistinguishable to the caller.
pub const INVALID_CREDENTIALS: &str = "invalid username and/or password";

/// Verified against when the username is unknown, so that path costs one
/// hash verification like a wrong password does.
const DUMMY_PASSWORD: &str = "warden-dummy-password";

#[derive(Clone)]
pub struct Authenticator {
    hasher: Arc<dyn PasswordHasher>,
    dummy_hash: Arc<OnceLock<Option<String>>>,
}

impl Authenticator {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            hasher,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn hasher(&self) -> &dyn PasswordHasher {
        &*self.hasher
    }

    pub fn authenticate<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
    ) -> ServiceResult<User>
    where
        S: UserStore + ?Sized,
    {
        let user = store
            .get_user_by_username(username)
            .map_err(|e| ServiceError::internal("error fetching user", e))?;
        let Some(user) = user else {
            if let Some(hash) = self.dummy_hash() {
                let _ = self.hasher.verify(hash, password);
            }
            return Err(ServiceError::client(INVALID_CREDENTIALS));
        };

        match self.hasher.verify(&user.password_hash, password) {
            Ok(()) => Ok(user),
            Err(PasswordError::Mismatch) => Err(ServiceError::client(INVALID_CREDENTIALS)),
            Err(e) => Err(ServiceError::internal("error verifying password", e)),
        }
    }

    fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash
            .get_or_init(|| match self.hasher.hash(DUMMY_PASSWORD) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to hash dummy password");
                    None
                }
            })
            .as_deref()
    }
}
