//! Explicit dependency wiring for request handlers.

use std::sync::Arc;

use warden_auth::{
    Argon2Hasher, AuthConfig, Authenticator, ClientController, PasswordCriteriaValidator,
    PasswordHasher, SessionController, TokenFactorySelector, TokenIssuer, UserController,
};
use warden_core::{
    Adapter, AssetLoader, Executor, ScopeFactory, ServiceError, ServiceResult, Session,
    Transaction,
};

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub scope: ScopeFactory<Arc<dyn Adapter>>,
    pub sessions: SessionController,
    pub users: UserController,
    pub clients: ClientController,
    pub issuer: TokenIssuer,
}

impl AppState {
    pub fn new(
        config: &AuthConfig,
        adapter: Arc<dyn Adapter>,
        loader: Arc<dyn AssetLoader>,
    ) -> Self {
        Self::with_hasher(config, adapter, loader, Arc::new(Argon2Hasher::default()))
    }

    pub fn with_hasher(
        config: &AuthConfig,
        adapter: Arc<dyn Adapter>,
        loader: Arc<dyn AssetLoader>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let authenticator = Authenticator::new(hasher);
        let validator = PasswordCriteriaValidator::new(config.password_criteria.clone());
        let selector = TokenFactorySelector::new(
            loader,
            config.token_issuer.clone(),
            config.token_lifetime_secs,
        );

        Self {
            scope: ScopeFactory::new(adapter),
            sessions: SessionController::new(authenticator.clone()),
            users: UserController::new(authenticator.clone(), validator),
            clients: ClientController::new(config.client_management_rank),
            issuer: TokenIssuer::new(authenticator, selector),
        }
    }

    /// Read-only unit of work.
    pub fn read<T>(
        &self,
        op: impl FnOnce(&dyn Executor) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        self.scope.with_executor(op)
    }

    /// Unit of work in a transaction. Committed when `op` succeeds with a
    /// permitted outcome; a denial rolls back like an error does.
    pub fn write<T: Outcome>(
        &self,
        op: impl FnOnce(&dyn Transaction) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut output = None;
        self.scope.in_transaction(|tx| {
            let value = op(tx)?;
            let permitted = value.is_permitted();
            output = Some(value);
            Ok::<_, ServiceError>(permitted)
        })?;
        output.ok_or_else(|| ServiceError::internal("transaction finished without output", "empty"))
    }
}

/// Result of a controller operation; `false` from [`Outcome::is_permitted`]
/// means the actor was denied and nothing may be committed.
pub trait Outcome {
    fn is_permitted(&self) -> bool;
}

impl Outcome for bool {
    fn is_permitted(&self) -> bool {
        *self
    }
}

impl<T> Outcome for Option<T> {
    fn is_permitted(&self) -> bool {
        self.is_some()
    }
}

impl Outcome for () {
    fn is_permitted(&self) -> bool {
        true
    }
}

impl Outcome for Session {
    fn is_permitted(&self) -> bool {
        true
    }
}

/// Run a unit of work on the blocking pool.
pub async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> ServiceResult<T>
where
    F: FnOnce(&AppState) -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ServiceError::internal("request task failed", e))?
}
