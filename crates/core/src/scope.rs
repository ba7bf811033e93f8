//! Scoped access to storage.
//!
//! A scope acquires a backend resource, runs a caller-supplied unit of work
//! against it, and releases it on every exit path: normal return, error
//! return, or panic unwinding. Release is tied to guard drops, not to the
//! happy path.
//!
//! A transaction is committed if and only if its body returns `Ok(true)`.
//! Every other outcome rolls back. Nested transactions are not supported.

use crate::store::{Adapter, Executor, StoreError, Transaction};

/// Opens executor and transaction scopes over a storage [`Adapter`].
#[derive(Debug, Clone)]
pub struct ScopeFactory<A> {
    adapter: A,
}

impl<A: Adapter> ScopeFactory<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Run `body` with a freshly set-up executor.
    ///
    /// The adapter's `clean_up` runs on every exit path. The body's result is
    /// returned unchanged.
    pub fn with_executor<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&dyn Executor) -> Result<T, E>,
        E: From<StoreError>,
    {
        let executor = self.adapter.setup()?;
        let guard = ExecutorGuard {
            adapter: &self.adapter,
            executor: Some(executor),
        };
        let result = body(guard.executor());
        drop(guard);
        result
    }

    /// See [`with_transaction`].
    pub fn with_transaction<E, F>(&self, executor: &dyn Executor, body: F) -> Result<bool, E>
    where
        F: FnOnce(&dyn Transaction) -> Result<bool, E>,
        E: From<StoreError>,
    {
        with_transaction(executor, body)
    }

    /// Executor scope wrapping a single transaction scope.
    pub fn in_transaction<E, F>(&self, body: F) -> Result<bool, E>
    where
        F: FnOnce(&dyn Transaction) -> Result<bool, E>,
        E: From<StoreError>,
    {
        self.with_executor(|executor| with_transaction(executor, body))
    }
}

/// Run `body` inside a transaction begun on `executor`.
///
/// - `Err(e)`: roll back, return `Err(e)`.
/// - `Ok(false)`: roll back, return `Ok(false)` (declined, not a failure).
/// - `Ok(true)`: commit and return `Ok(true)`; a commit failure is returned
///   as an error after a rollback attempt.
pub fn with_transaction<E, F>(executor: &dyn Executor, body: F) -> Result<bool, E>
where
    F: FnOnce(&dyn Transaction) -> Result<bool, E>,
    E: From<StoreError>,
{
    let tx = executor.begin_transaction()?;
    let mut guard = TransactionGuard { tx, finished: false };

    match body(&*guard.tx) {
        Err(e) => {
            guard.rollback();
            Err(e)
        }
        Ok(false) => {
            guard.rollback();
            tracing::debug!("transaction declined by its body; rolled back");
            Ok(false)
        }
        Ok(true) => match guard.tx.commit() {
            Ok(()) => {
                guard.finished = true;
                Ok(true)
            }
            Err(e) => {
                tracing::error!(error = %e, "transaction commit failed");
                guard.rollback();
                Err(e.into())
            }
        },
    }
}

struct ExecutorGuard<'a, A: Adapter> {
    adapter: &'a A,
    executor: Option<Box<dyn Executor + 'a>>,
}

impl<'a, A: Adapter> ExecutorGuard<'a, A> {
    fn executor(&self) -> &(dyn Executor + 'a) {
        match &self.executor {
            Some(executor) => &**executor,
            // Only taken in `drop`.
            None => unreachable!("executor released before scope end"),
        }
    }
}

impl<A: Adapter> Drop for ExecutorGuard<'_, A> {
    fn drop(&mut self) {
        if let Some(executor) = self.executor.take() {
            if let Err(e) = self.adapter.clean_up(executor) {
                tracing::error!(error = %e, "executor clean-up failed");
            }
        }
    }
}

struct TransactionGuard<'a> {
    tx: Box<dyn Transaction + 'a>,
    finished: bool,
}

impl TransactionGuard<'_> {
    fn rollback(&mut self) {
        self.finished = true;
        if let Err(e) = self.tx.rollback() {
            tracing::error!(error = %e, "transaction rollback failed");
        }
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("transaction scope exited abnormally; rolling back");
            self.rollback();
        }
    }
}
