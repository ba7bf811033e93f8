//! Authentication, sessions, rank-based authorization and token issuance.
//!
//! Controllers are storage-agnostic: every operation takes the store it should
//! act on (an executor for reads, a transaction for mutations) and never holds
//! it beyond the call.

pub mod authenticate;
pub mod clients;
pub mod config;
pub mod issuance;
pub mod password;
pub mod rank;
pub mod roles;
pub mod session;
pub mod token;
pub mod users;
mod validate;

pub use authenticate::{Authenticator, INVALID_CREDENTIALS};
pub use clients::{ClientController, ClientDraft};
pub use config::AuthConfig;
pub use issuance::{NOT_ASSIGNED, TokenIssuer};
pub use password::{
    Argon2Hasher, PasswordCriteria, PasswordCriteriaValidator, PasswordError, PasswordHasher,
    PasswordStatus,
};
pub use rank::{may_assign, verify_rank};
pub use session::SessionController;
pub use token::{TokenError, TokenFactory, TokenFactorySelector};
pub use users::UserController;
