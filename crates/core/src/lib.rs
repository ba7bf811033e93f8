//! Shared building blocks for the credential service.
//!
//! Pure types and contracts: the error model, identifiers, entities, the
//! storage and asset-loading contracts, and scoped storage access.

pub mod assets;
pub mod error;
pub mod id;
pub mod model;
pub mod scope;
pub mod store;

pub use assets::{AssetLoader, LoadError, load_json};
pub use error::{ErrorKind, INTERNAL_MESSAGE, ServiceError, ServiceResult};
pub use id::{ClientUid, IdParseError, SessionToken};
pub use model::{Client, Rank, Session, TokenType, UnknownTokenType, User, UserRole};
pub use scope::{ScopeFactory, with_transaction};
pub use store::{
    Adapter, ClientStore, DataStore, Executor, SessionStore, StoreError, StoreResult, Transaction,
    UserRoleStore, UserStore,
};
