//! Storage contract consumed by the service layer.
//!
//! Backends implement one trait per entity plus [`Transaction`],
//! [`Executor`] and [`Adapter`]. All calls are blocking from the caller's
//! point of view; backends own timeouts.
//!
//! "found" booleans report whether the addressed row existed. They are not
//! errors: callers decide how to surface a missing row.

use thiserror::Error;

use crate::id::{ClientUid, SessionToken};
use crate::model::{Client, Rank, Session, User, UserRole};

/// Storage backend failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// A referenced row (user, client) does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// A stored row could not be decoded into its model type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The transaction was already committed or rolled back.
    #[error("transaction already finished")]
    TransactionFinished,

    /// Connection, IO or other backend failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait UserStore {
    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    fn create_user(&self, user: &User) -> StoreResult<()>;

    /// Updates the rank of `user.username`.
    fn update_user(&self, user: &User) -> StoreResult<bool>;

    fn update_user_password(&self, username: &str, password_hash: &str) -> StoreResult<bool>;

    /// Deletes the user together with its sessions and client roles.
    fn delete_user(&self, username: &str) -> StoreResult<bool>;

    fn get_users_with_lesser_rank(&self, rank: Rank) -> StoreResult<Vec<User>>;
}

pub trait ClientStore {
    fn create_client(&self, client: &Client) -> StoreResult<()>;

    fn get_client_by_uid(&self, uid: ClientUid) -> StoreResult<Option<Client>>;

    fn get_all_clients(&self) -> StoreResult<Vec<Client>>;

    fn update_client(&self, client: &Client) -> StoreResult<bool>;

    /// Deletes the client together with its user roles.
    fn delete_client(&self, uid: ClientUid) -> StoreResult<bool>;
}

pub trait SessionStore {
    fn save_session(&self, session: &Session) -> StoreResult<()>;

    fn get_session_by_token(&self, token: SessionToken) -> StoreResult<Option<Session>>;

    fn delete_session(&self, token: SessionToken) -> StoreResult<bool>;

    fn delete_all_user_sessions(&self, username: &str) -> StoreResult<()>;

    /// Deletes every session of `username` except `keep`.
    fn delete_all_other_user_sessions(&self, username: &str, keep: SessionToken) -> StoreResult<()>;
}

pub trait UserRoleStore {
    fn create_user_role(&self, role: &UserRole) -> StoreResult<()>;

    fn get_user_role_by_client_and_username(
        &self,
        client_uid: ClientUid,
        username: &str,
    ) -> StoreResult<Option<UserRole>>;

    /// Roles for `client_uid` held by users whose rank is below `rank`.
    fn get_user_roles_with_lesser_rank_by_client(
        &self,
        client_uid: ClientUid,
        rank: Rank,
    ) -> StoreResult<Vec<UserRole>>;

    fn update_user_role(&self, role: &UserRole) -> StoreResult<bool>;

    fn delete_user_role(&self, client_uid: ClientUid, username: &str) -> StoreResult<bool>;
}

/// Every entity operation.
pub trait DataStore: UserStore + ClientStore + SessionStore + UserRoleStore {}

impl<T> DataStore for T where T: UserStore + ClientStore + SessionStore + UserRoleStore + ?Sized {}

/// A unit of atomic work. Mutations become visible to others only on `commit`.
pub trait Transaction: DataStore {
    fn commit(&self) -> StoreResult<()>;

    fn rollback(&self) -> StoreResult<()>;
}

/// A backend connection. Reads outside a transaction see committed state.
pub trait Executor: DataStore {
    fn begin_transaction(&self) -> StoreResult<Box<dyn Transaction + '_>>;
}

/// A storage backend.
pub trait Adapter: Send + Sync {
    /// Acquire an executor for one unit of work.
    fn setup(&self) -> StoreResult<Box<dyn Executor + '_>>;

    /// Release resources acquired by `setup`.
    fn clean_up(&self, executor: Box<dyn Executor + '_>) -> StoreResult<()>;
}

impl<A> Adapter for std::sync::Arc<A>
where
    A: Adapter + ?Sized,
{
    fn setup(&self) -> StoreResult<Box<dyn Executor + '_>> {
        (**self).setup()
    }

    fn clean_up(&self, executor: Box<dyn Executor + '_>) -> StoreResult<()> {
        (**self).clean_up(executor)
    }
}
