//! Bearer session lifecycle.

use warden_core::{
    DataStore, Rank, ServiceError, ServiceResult, Session, SessionStore, SessionToken,
};

use crate::authenticate::Authenticator;
use crate::rank::verify_rank;

pub const INVALID_SESSION: &str = "invalid session";
pub const SESSION_NOT_FOUND: &str = "session not found";

#[derive(Clone)]
pub struct SessionController {
    authenticator: Authenticator,
}

impl SessionController {
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }

    /// Authenticate and persist a new session carrying the user's current rank.
    pub fn create_session<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
    ) -> ServiceResult<Session>
    where
        S: DataStore + ?Sized,
    {
        let user = self.authenticator.authenticate(store, username, password)?;
        let session = Session {
            token: SessionToken::new(),
            username: user.username,
            rank: user.rank,
        };
        store
            .save_session(&session)
            .map_err(|e| ServiceError::internal("error saving session", e))?;

        tracing::info!(username = %session.username, rank = %session.rank, "session created");
        Ok(session)
    }

    /// Resolve a bearer token.
    pub fn get_session<S>(&self, store: &S, token: SessionToken) -> ServiceResult<Session>
    where
        S: SessionStore + ?Sized,
    {
        store
            .get_session_by_token(token)
            .map_err(|e| ServiceError::internal("error fetching session", e))?
            .ok_or_else(|| ServiceError::client(INVALID_SESSION))
    }

    pub fn delete_session<S>(&self, store: &S, token: SessionToken) -> ServiceResult<()>
    where
        S: SessionStore + ?Sized,
    {
        let found = store
            .delete_session(token)
            .map_err(|e| ServiceError::internal("error deleting session", e))?;
        if !found {
            return Err(ServiceError::client(SESSION_NOT_FOUND));
        }
        tracing::info!("session deleted");
        Ok(())
    }

    pub fn delete_all_user_sessions<S>(&self, store: &S, username: &str) -> ServiceResult<()>
    where
        S: SessionStore + ?Sized,
    {
        store
            .delete_all_user_sessions(username)
            .map_err(|e| ServiceError::internal("error deleting user sessions", e))
    }

    pub fn delete_all_other_user_sessions<S>(
        &self,
        store: &S,
        username: &str,
        keep: SessionToken,
    ) -> ServiceResult<()>
    where
        S: SessionStore + ?Sized,
    {
        store
            .delete_all_other_user_sessions(username, keep)
            .map_err(|e| ServiceError::internal("error deleting other user sessions", e))
    }

    /// Revoke every session of a lower-ranked user. `false` when the actor
    /// does not outrank the user.
    pub fn delete_user_sessions<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        username: &str,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !verify_rank(store, username, actor_rank)? {
            return Ok(false);
        }
        self.delete_all_user_sessions(store, username)?;
        tracing::info!(%username, "user sessions revoked");
        Ok(true)
    }
}
