//! User management.

use warden_core::{DataStore, Rank, ServiceError, ServiceResult, Session, StoreError, User};

use crate::authenticate::Authenticator;
use crate::password::{PasswordCriteriaValidator, PasswordStatus};
use crate::rank::{USER_NOT_FOUND, may_assign, verify_rank};
use crate::validate;

pub const USERNAME_TAKEN: &str = "username is already taken";

/// User operations. Mutating calls expect a transaction as `store`.
///
/// Operations subject to the rank rule return `false` (or `None`) when the
/// actor is not allowed to perform them; nothing is persisted in that case.
#[derive(Clone)]
pub struct UserController {
    authenticator: Authenticator,
    validator: PasswordCriteriaValidator,
}

impl UserController {
    pub fn new(authenticator: Authenticator, validator: PasswordCriteriaValidator) -> Self {
        Self {
            authenticator,
            validator,
        }
    }

    fn check_password(&self, password: &str) -> ServiceResult<()> {
        match self.validator.validate(password) {
            PasswordStatus::Valid => Ok(()),
            status => Err(ServiceError::client(status.message())),
        }
    }

    fn hash(&self, password: &str) -> ServiceResult<String> {
        self.authenticator
            .hasher()
            .hash(password)
            .map_err(|e| ServiceError::internal("error hashing password", e))
    }

    fn insert<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
        rank: Rank,
    ) -> ServiceResult<User>
    where
        S: DataStore + ?Sized,
    {
        validate::username(username)?;
        self.check_password(password)?;

        let existing = store
            .get_user_by_username(username)
            .map_err(|e| ServiceError::internal("error fetching user", e))?;
        if existing.is_some() {
            return Err(ServiceError::client(USERNAME_TAKEN));
        }

        let user = User {
            username: username.to_string(),
            rank,
            password_hash: self.hash(password)?,
        };
        store.create_user(&user).map_err(|e| match e {
            StoreError::Duplicate(_) => ServiceError::client(USERNAME_TAKEN),
            e => ServiceError::internal("error creating user", e),
        })?;
        Ok(user)
    }

    pub fn create_user<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        username: &str,
        password: &str,
        rank: Rank,
    ) -> ServiceResult<Option<User>>
    where
        S: DataStore + ?Sized,
    {
        if !may_assign(actor_rank, rank) {
            return Ok(None);
        }
        let user = self.insert(store, username, password, rank)?;
        tracing::info!(%username, %rank, "user created");
        Ok(Some(user))
    }

    /// Users the actor outranks, ordered by username.
    pub fn list_users<S>(&self, store: &S, actor_rank: Rank) -> ServiceResult<Vec<User>>
    where
        S: DataStore + ?Sized,
    {
        store
            .get_users_with_lesser_rank(actor_rank)
            .map_err(|e| ServiceError::internal("error listing users", e))
    }

    pub fn update_user_rank<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        username: &str,
        new_rank: Rank,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !may_assign(actor_rank, new_rank) || !verify_rank(store, username, actor_rank)? {
            return Ok(false);
        }
        let mut user = store
            .get_user_by_username(username)
            .map_err(|e| ServiceError::internal("error fetching user", e))?
            .ok_or_else(|| ServiceError::client(USER_NOT_FOUND))?;
        user.rank = new_rank;
        let found = store
            .update_user(&user)
            .map_err(|e| ServiceError::internal("error updating user", e))?;
        if !found {
            return Err(ServiceError::client(USER_NOT_FOUND));
        }
        tracing::info!(%username, rank = %new_rank, "user rank updated");
        Ok(true)
    }

    /// Administrative reset. Every session of the user is revoked.
    pub fn update_user_password<S>(
        &self,
        store: &S,
        actor_rank: Rank,
        username: &str,
        new_password: &str,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !verify_rank(store, username, actor_rank)? {
            return Ok(false);
        }
        self.check_password(new_password)?;
        let hash = self.hash(new_password)?;
        let found = store
            .update_user_password(username, &hash)
            .map_err(|e| ServiceError::internal("error updating password", e))?;
        if !found {
            return Err(ServiceError::client(USER_NOT_FOUND));
        }
        store
            .delete_all_user_sessions(username)
            .map_err(|e| ServiceError::internal("error deleting user sessions", e))?;
        tracing::info!(%username, "password reset; sessions revoked");
        Ok(true)
    }

    /// Self-service change. Requires the current password and revokes every
    /// other session of the user, keeping `session`.
    pub fn change_own_password<S>(
        &self,
        store: &S,
        session: &Session,
        old_password: &str,
        new_password: &str,
    ) -> ServiceResult<()>
    where
        S: DataStore + ?Sized,
    {
        self.authenticator
            .authenticate(store, &session.username, old_password)?;
        self.check_password(new_password)?;
        let hash = self.hash(new_password)?;
        let found = store
            .update_user_password(&session.username, &hash)
            .map_err(|e| ServiceError::internal("error updating password", e))?;
        if !found {
            return Err(ServiceError::client(USER_NOT_FOUND));
        }
        store
            .delete_all_other_user_sessions(&session.username, session.token)
            .map_err(|e| ServiceError::internal("error deleting other user sessions", e))?;
        tracing::info!(username = %session.username, "password changed");
        Ok(())
    }

    pub fn delete_user<S>(&self, store: &S, actor_rank: Rank, username: &str) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        if !verify_rank(store, username, actor_rank)? {
            return Ok(false);
        }
        let found = store
            .delete_user(username)
            .map_err(|e| ServiceError::internal("error deleting user", e))?;
        if !found {
            return Err(ServiceError::client(USER_NOT_FOUND));
        }
        tracing::info!(%username, "user deleted");
        Ok(true)
    }

    /// Create the initial administrator unless a user of that name exists.
    /// Returns whether a user was created.
    pub fn bootstrap_admin<S>(
        &self,
        store: &S,
        username: &str,
        password: &str,
        rank: Rank,
    ) -> ServiceResult<bool>
    where
        S: DataStore + ?Sized,
    {
        let existing = store
            .get_user_by_username(username)
            .map_err(|e| ServiceError::internal("error fetching user", e))?;
        if existing.is_some() {
            return Ok(false);
        }
        self.insert(store, username, password, rank)?;
        tracing::info!(%username, %rank, "bootstrap administrator created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warden_core::{ErrorKind, ScopeFactory, SessionStore, SessionToken, UserStore};
    use warden_infra::InMemoryAdapter;

    use super::*;
    use crate::password::fast_hasher;
    use crate::session::SessionController;

    struct Fixture {
        scope: ScopeFactory<InMemoryAdapter>,
        users: UserController,
        sessions: SessionController,
    }

    impl Fixture {
        fn new() -> Self {
            let authenticator = Authenticator::new(Arc::new(fast_hasher()));
            let f = Self {
                scope: ScopeFactory::new(InMemoryAdapter::new()),
                users: UserController::new(
                    authenticator.clone(),
                    PasswordCriteriaValidator::default(),
                ),
                sessions: SessionController::new(authenticator),
            };
            f.tx(|tx, u| u.bootstrap_admin(tx, "root", "Secret1!", Rank::new(100)))
                .unwrap();
            f.tx(|tx, u| u.create_user(tx, Rank::new(100), "alice", "Secret1!", Rank::new(5)))
                .unwrap();
            f
        }

        /// Run `op` in a transaction that commits unless `op` fails.
        fn tx<T>(
            &self,
            op: impl FnOnce(&dyn warden_core::Transaction, &UserController) -> ServiceResult<T>,
        ) -> ServiceResult<T> {
            let mut out = None;
            self.scope.in_transaction(|tx| {
                out = Some(op(tx, &self.users)?);
                Ok::<_, ServiceError>(true)
            })?;
            out.ok_or_else(|| ServiceError::client("no result"))
        }

        fn user(&self, name: &str) -> Option<User> {
            self.scope
                .with_executor(|ex| ex.get_user_by_username(name))
                .unwrap()
        }

        fn login(&self, name: &str, password: &str) -> ServiceResult<Session> {
            self.scope
                .with_executor(|ex| self.sessions.create_session(ex, name, password))
        }
    }

    #[test]
    fn creates_user_below_actor_rank() {
        let f = Fixture::new();
        let created = f
            .tx(|tx, u| u.create_user(tx, Rank::new(5), "bob", "Secret1!", Rank::new(4)))
            .unwrap();
        assert_eq!(created.map(|u| u.rank), Some(Rank::new(4)));
        assert!(f.login("bob", "Secret1!").is_ok());
    }

    #[test]
    fn create_at_or_above_actor_rank_is_denied_before_persistence() {
        let f = Fixture::new();
        for rank in [5, 6] {
            let created = f
                .tx(|tx, u| u.create_user(tx, Rank::new(5), "bob", "x", Rank::new(rank)))
                .unwrap();
            assert_eq!(created, None);
        }
        assert_eq!(f.user("bob"), None);
    }

    #[test]
    fn create_rejects_duplicates_and_weak_passwords() {
        let f = Fixture::new();
        let dup = f
            .tx(|tx, u| u.create_user(tx, Rank::new(100), "alice", "Secret1!", Rank::new(1)))
            .unwrap_err();
        assert_eq!(dup.message(), USERNAME_TAKEN);

        let weak = f
            .tx(|tx, u| u.create_user(tx, Rank::new(100), "carol", "secret", Rank::new(1)))
            .unwrap_err();
        assert_eq!(weak.kind(), ErrorKind::Client);
        assert_eq!(weak.message(), "password must be at least 8 characters long");

        let long_name = "n".repeat(31);
        let bad = f
            .tx(|tx, u| u.create_user(tx, Rank::new(100), &long_name, "Secret1!", Rank::new(1)))
            .unwrap_err();
        assert_eq!(bad.kind(), ErrorKind::Client);
    }

    #[test]
    fn list_only_shows_outranked_users() {
        let f = Fixture::new();
        let names: Vec<String> = f
            .scope
            .with_executor(|ex| f.users.list_users(ex, Rank::new(6)))
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice".to_string()]);
    }

    #[test]
    fn rank_update_obeys_both_checks() {
        let f = Fixture::new();
        let rerank = |actor: u32, rank: u32| {
            f.tx(|tx, u| u.update_user_rank(tx, Rank::new(actor), "alice", Rank::new(rank)))
        };
        // Actor 3 cannot touch alice (5).
        assert_eq!(rerank(3, 1), Ok(false));
        // Actor 10 cannot promote alice to 10.
        assert_eq!(rerank(10, 10), Ok(false));
        assert_eq!(rerank(10, 9), Ok(true));
        assert_eq!(f.user("alice").map(|u| u.rank), Some(Rank::new(9)));

        let missing = f.tx(|tx, u| u.update_user_rank(tx, Rank::new(10), "ghost", Rank::new(1)));
        assert_eq!(ErrorKind::of(&missing), ErrorKind::Client);
    }

    #[test]
    fn permission_denied_delete_leaves_user_in_place() {
        let f = Fixture::new();
        assert_eq!(f.tx(|tx, u| u.delete_user(tx, Rank::new(3), "alice")), Ok(false));
        assert!(f.user("alice").is_some());
        assert_eq!(f.tx(|tx, u| u.delete_user(tx, Rank::new(6), "alice")), Ok(true));
        assert!(f.user("alice").is_none());
    }

    #[test]
    fn administrative_reset_revokes_every_session() {
        let f = Fixture::new();
        let s1 = f.login("alice", "Secret1!").unwrap();
        let s2 = f.login("alice", "Secret1!").unwrap();

        let reset =
            f.tx(|tx, u| u.update_user_password(tx, Rank::new(100), "alice", "Fresh2@pass"));
        assert_eq!(reset, Ok(true));

        for token in [s1.token, s2.token] {
            let found = f.scope.with_executor(|ex| ex.get_session_by_token(token)).unwrap();
            assert!(found.is_none());
        }
        assert!(f.login("alice", "Secret1!").is_err());
        assert!(f.login("alice", "Fresh2@pass").is_ok());
    }

    #[test]
    fn self_service_change_keeps_current_session_only() {
        let f = Fixture::new();
        let current = f.login("alice", "Secret1!").unwrap();
        let other = f.login("alice", "Secret1!").unwrap();

        let wrong = f.tx(|tx, u| u.change_own_password(tx, &current, "nope", "Fresh2@pass"));
        assert_eq!(ErrorKind::of(&wrong), ErrorKind::Client);

        f.tx(|tx, u| u.change_own_password(tx, &current, "Secret1!", "Fresh2@pass"))
            .unwrap();

        let lookup = |token: SessionToken| {
            f.scope
                .with_executor(|ex| ex.get_session_by_token(token))
                .unwrap()
        };
        assert!(lookup(current.token).is_some());
        assert!(lookup(other.token).is_none());
        assert!(f.login("alice", "Fresh2@pass").is_ok());
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let f = Fixture::new();
        let again = f.tx(|tx, u| u.bootstrap_admin(tx, "root", "Other1!x", Rank::new(1)));
        assert_eq!(again, Ok(false));
        assert_eq!(f.user("root").map(|u| u.rank), Some(Rank::new(100)));
    }
}
