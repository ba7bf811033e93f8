//! In-memory storage adapter.
//!
//! Intended for tests/dev. Transactions read committed state until their
//! first mutation, then hold the table write lock and work on a staged copy
//! that replaces the live tables only on `commit`. Uniqueness and references
//! are checked against that copy, so they see every earlier commit.
//!
//! A transaction body must only use the transaction it was handed. Calling
//! back into the executor after the transaction has written deadlocks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use warden_core::{
    Adapter, Client, ClientStore, ClientUid, Executor, Rank, Session, SessionStore, SessionToken,
    StoreError, StoreResult, Transaction, User, UserRole, UserRoleStore, UserStore,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<String, User>,
    clients: HashMap<ClientUid, Client>,
    sessions: HashMap<SessionToken, Session>,
    roles: HashMap<(ClientUid, String), UserRole>,
}

impl Tables {
    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.get(username).cloned())
    }

    fn create_user(&mut self, user: &User) -> StoreResult<()> {
        if self.users.contains_key(&user.username) {
            return Err(StoreError::Duplicate(format!("user '{}'", user.username)));
        }
        self.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    fn update_user(&mut self, user: &User) -> StoreResult<bool> {
        match self.users.get_mut(&user.username) {
            Some(existing) => {
                existing.rank = user.rank;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn update_user_password(&mut self, username: &str, password_hash: &str) -> StoreResult<bool> {
        match self.users.get_mut(username) {
            Some(existing) => {
                existing.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_user(&mut self, username: &str) -> StoreResult<bool> {
        if self.users.remove(username).is_none() {
            return Ok(false);
        }
        self.sessions.retain(|_, s| s.username != username);
        self.roles.retain(|(_, u), _| u != username);
        Ok(true)
    }

    fn get_users_with_lesser_rank(&self, rank: Rank) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .values()
            .filter(|u| u.rank < rank)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    fn create_client(&mut self, client: &Client) -> StoreResult<()> {
        if self.clients.contains_key(&client.uid) {
            return Err(StoreError::Duplicate(format!("client '{}'", client.uid)));
        }
        self.clients.insert(client.uid, client.clone());
        Ok(())
    }

    fn get_client_by_uid(&self, uid: ClientUid) -> StoreResult<Option<Client>> {
        Ok(self.clients.get(&uid).cloned())
    }

    fn get_all_clients(&self) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.values().cloned().collect();
        clients.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.uid.as_uuid().cmp(b.uid.as_uuid()))
        });
        Ok(clients)
    }

    fn update_client(&mut self, client: &Client) -> StoreResult<bool> {
        match self.clients.get_mut(&client.uid) {
            Some(existing) => {
                *existing = client.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_client(&mut self, uid: ClientUid) -> StoreResult<bool> {
        if self.clients.remove(&uid).is_none() {
            return Ok(false);
        }
        self.roles.retain(|(c, _), _| *c != uid);
        Ok(true)
    }

    fn save_session(&mut self, session: &Session) -> StoreResult<()> {
        if !self.users.contains_key(&session.username) {
            return Err(StoreError::MissingReference(format!(
                "user '{}'",
                session.username
            )));
        }
        if self.sessions.contains_key(&session.token) {
            return Err(StoreError::Duplicate("session token".to_string()));
        }
        self.sessions.insert(session.token, session.clone());
        Ok(())
    }

    fn get_session_by_token(&self, token: SessionToken) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(&token).cloned())
    }

    fn delete_session(&mut self, token: SessionToken) -> StoreResult<bool> {
        Ok(self.sessions.remove(&token).is_some())
    }

    fn delete_all_user_sessions(&mut self, username: &str) -> StoreResult<()> {
        self.sessions.retain(|_, s| s.username != username);
        Ok(())
    }

    fn delete_all_other_user_sessions(
        &mut self,
        username: &str,
        keep: SessionToken,
    ) -> StoreResult<()> {
        self.sessions
            .retain(|token, s| s.username != username || *token == keep);
        Ok(())
    }

    fn create_user_role(&mut self, role: &UserRole) -> StoreResult<()> {
        if !self.clients.contains_key(&role.client_uid) {
            return Err(StoreError::MissingReference(format!(
                "client '{}'",
                role.client_uid
            )));
        }
        if !self.users.contains_key(&role.username) {
            return Err(StoreError::MissingReference(format!("user '{}'", role.username)));
        }
        let key = (role.client_uid, role.username.clone());
        if self.roles.contains_key(&key) {
            return Err(StoreError::Duplicate(format!(
                "role for '{}' on client '{}'",
                role.username, role.client_uid
            )));
        }
        self.roles.insert(key, role.clone());
        Ok(())
    }

    fn get_user_role_by_client_and_username(
        &self,
        client_uid: ClientUid,
        username: &str,
    ) -> StoreResult<Option<UserRole>> {
        Ok(self.roles.get(&(client_uid, username.to_string())).cloned())
    }

    fn get_user_roles_with_lesser_rank_by_client(
        &self,
        client_uid: ClientUid,
        rank: Rank,
    ) -> StoreResult<Vec<UserRole>> {
        let mut roles: Vec<UserRole> = self
            .roles
            .values()
            .filter(|r| r.client_uid == client_uid)
            .filter(|r| self.users.get(&r.username).is_some_and(|u| u.rank < rank))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(roles)
    }

    fn update_user_role(&mut self, role: &UserRole) -> StoreResult<bool> {
        match self.roles.get_mut(&(role.client_uid, role.username.clone())) {
            Some(existing) => {
                existing.role = role.role.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_user_role(&mut self, client_uid: ClientUid, username: &str) -> StoreResult<bool> {
        Ok(self.roles.remove(&(client_uid, username.to_string())).is_some())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Shared in-memory tables. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAdapter {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed sessions across all users.
    pub fn session_count(&self) -> StoreResult<usize> {
        Ok(self.tables.read().map_err(poisoned)?.sessions.len())
    }
}

impl Adapter for InMemoryAdapter {
    fn setup(&self) -> StoreResult<Box<dyn Executor + '_>> {
        Ok(Box::new(InMemoryExecutor {
            tables: &self.tables,
        }))
    }

    fn clean_up(&self, _executor: Box<dyn Executor + '_>) -> StoreResult<()> {
        Ok(())
    }
}

/// Executor over the live tables; each call takes the lock briefly.
pub struct InMemoryExecutor<'a> {
    tables: &'a RwLock<Tables>,
}

impl InMemoryExecutor<'_> {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> StoreResult<T>) -> StoreResult<T> {
        let tables = self.tables.read().map_err(poisoned)?;
        f(&tables)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        f(&mut tables)
    }
}

impl Executor for InMemoryExecutor<'_> {
    fn begin_transaction(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(InMemoryTransaction {
            tables: self.tables,
            state: RefCell::new(TxState::Reading),
        }))
    }
}

enum TxState<'a> {
    /// No mutation yet; reads see committed state.
    Reading,
    /// Holds the write lock until commit or rollback.
    Writing {
        live: RwLockWriteGuard<'a, Tables>,
        staged: Tables,
    },
    Finished,
}

/// Read-committed transaction over a staged copy of the tables.
///
/// The write lock is taken on the first mutation, so work done before it
/// (password hashing, permission checks) does not block other requests.
pub struct InMemoryTransaction<'a> {
    tables: &'a RwLock<Tables>,
    state: RefCell<TxState<'a>>,
}

impl<'a> InMemoryTransaction<'a> {
    fn read<T>(&self, f: impl FnOnce(&Tables) -> StoreResult<T>) -> StoreResult<T> {
        match &*self.state.borrow() {
            TxState::Reading => f(&*self.tables.read().map_err(poisoned)?),
            TxState::Writing { staged, .. } => f(staged),
            TxState::Finished => Err(StoreError::TransactionFinished),
        }
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> StoreResult<T>) -> StoreResult<T> {
        let mut state = self.state.borrow_mut();
        if matches!(*state, TxState::Reading) {
            let live = self.tables.write().map_err(poisoned)?;
            let staged = live.clone();
            *state = TxState::Writing { live, staged };
        }
        match &mut *state {
            TxState::Writing { staged, .. } => f(staged),
            _ => Err(StoreError::TransactionFinished),
        }
    }

    fn finish(&self) -> TxState<'a> {
        std::mem::replace(&mut *self.state.borrow_mut(), TxState::Finished)
    }
}

impl Transaction for InMemoryTransaction<'_> {
    fn commit(&self) -> StoreResult<()> {
        match self.finish() {
            TxState::Reading => Ok(()),
            TxState::Writing { mut live, staged } => {
                *live = staged;
                Ok(())
            }
            TxState::Finished => Err(StoreError::TransactionFinished),
        }
    }

    fn rollback(&self) -> StoreResult<()> {
        // Releasing the guard discards the staged copy.
        match self.finish() {
            TxState::Finished => Err(StoreError::TransactionFinished),
            _ => Ok(()),
        }
    }
}

macro_rules! impl_store_via_tables {
    ($t:ty) => {
        impl UserStore for $t {
            fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
                self.read(|t| t.get_user_by_username(username))
            }
            fn create_user(&self, user: &User) -> StoreResult<()> {
                self.write(|t| t.create_user(user))
            }
            fn update_user(&self, user: &User) -> StoreResult<bool> {
                self.write(|t| t.update_user(user))
            }
            fn update_user_password(
                &self,
                username: &str,
                password_hash: &str,
            ) -> StoreResult<bool> {
                self.write(|t| t.update_user_password(username, password_hash))
            }
            fn delete_user(&self, username: &str) -> StoreResult<bool> {
                self.write(|t| t.delete_user(username))
            }
            fn get_users_with_lesser_rank(&self, rank: Rank) -> StoreResult<Vec<User>> {
                self.read(|t| t.get_users_with_lesser_rank(rank))
            }
        }

        impl ClientStore for $t {
            fn create_client(&self, client: &Client) -> StoreResult<()> {
                self.write(|t| t.create_client(client))
            }
            fn get_client_by_uid(&self, uid: ClientUid) -> StoreResult<Option<Client>> {
                self.read(|t| t.get_client_by_uid(uid))
            }
            fn get_all_clients(&self) -> StoreResult<Vec<Client>> {
                self.read(|t| t.get_all_clients())
            }
            fn update_client(&self, client: &Client) -> StoreResult<bool> {
                self.write(|t| t.update_client(client))
            }
            fn delete_client(&self, uid: ClientUid) -> StoreResult<bool> {
                self.write(|t| t.delete_client(uid))
            }
        }

        impl SessionStore for $t {
            fn save_session(&self, session: &Session) -> StoreResult<()> {
                self.write(|t| t.save_session(session))
            }
            fn get_session_by_token(&self, token: SessionToken) -> StoreResult<Option<Session>> {
                self.read(|t| t.get_session_by_token(token))
            }
            fn delete_session(&self, token: SessionToken) -> StoreResult<bool> {
                self.write(|t| t.delete_session(token))
            }
            fn delete_all_user_sessions(&self, username: &str) -> StoreResult<()> {
                self.write(|t| t.delete_all_user_sessions(username))
            }
            fn delete_all_other_user_sessions(
                &self,
                username: &str,
                keep: SessionToken,
            ) -> StoreResult<()> {
                self.write(|t| t.delete_all_other_user_sessions(username, keep))
            }
        }

        impl UserRoleStore for $t {
            fn create_user_role(&self, role: &UserRole) -> StoreResult<()> {
                self.write(|t| t.create_user_role(role))
            }
            fn get_user_role_by_client_and_username(
                &self,
                client_uid: ClientUid,
                username: &str,
            ) -> StoreResult<Option<UserRole>> {
                self.read(|t| t.get_user_role_by_client_and_username(client_uid, username))
            }
            fn get_user_roles_with_lesser_rank_by_client(
                &self,
                client_uid: ClientUid,
                rank: Rank,
            ) -> StoreResult<Vec<UserRole>> {
                self.read(|t| t.get_user_roles_with_lesser_rank_by_client(client_uid, rank))
            }
            fn update_user_role(&self, role: &UserRole) -> StoreResult<bool> {
                self.write(|t| t.update_user_role(role))
            }
            fn delete_user_role(&self, client_uid: ClientUid, username: &str) -> StoreResult<bool> {
                self.write(|t| t.delete_user_role(client_uid, username))
            }
        }
    };
}

impl_store_via_tables!(InMemoryExecutor<'_>);
impl_store_via_tables!(InMemoryTransaction<'_>);

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use warden_core::{ScopeFactory, TokenType};

    use super::*;

    fn user(name: &str, rank: u32) -> User {
        User {
            username: name.to_string(),
            rank: Rank::new(rank),
            password_hash: "hash".to_string(),
        }
    }

    fn client(name: &str) -> Client {
        Client {
            uid: ClientUid::new(),
            name: name.to_string(),
            redirect_url: "https://app.example/cb".to_string(),
            token_type: TokenType::Default,
            key_uri: "k.pem".to_string(),
        }
    }

    fn lookup(scope: &ScopeFactory<InMemoryAdapter>, name: &str) -> Option<User> {
        scope
            .with_executor(|ex| ex.get_user_by_username(name))
            .unwrap()
    }

    #[test]
    fn committed_transaction_is_visible() {
        let scope = ScopeFactory::new(InMemoryAdapter::new());
        let committed: Result<bool, StoreError> = scope.in_transaction(|tx| {
            tx.create_user(&user("alice", 5))?;
            Ok(true)
        });
        assert_eq!(committed, Ok(true));
        assert_eq!(lookup(&scope, "alice"), Some(user("alice", 5)));
    }

    #[test]
    fn declined_transaction_leaves_no_trace() {
        let scope = ScopeFactory::new(InMemoryAdapter::new());
        let committed: Result<bool, StoreError> = scope.in_transaction(|tx| {
            tx.create_user(&user("alice", 5))?;
            Ok(false)
        });
        assert_eq!(committed, Ok(false));
        assert_eq!(lookup(&scope, "alice"), None);
    }

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let scope = ScopeFactory::new(InMemoryAdapter::new());
        let result: Result<bool, StoreError> = scope.in_transaction(|tx| {
            tx.create_user(&user("alice", 5))?;
            tx.create_user(&user("alice", 6))?;
            Ok(true)
        });
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(lookup(&scope, "alice"), None);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let scope = ScopeFactory::new(InMemoryAdapter::new());
        let result: Result<bool, StoreError> = scope.in_transaction(|tx| {
            tx.create_user(&user("bob", 1))?;
            Ok(tx.get_user_by_username("bob")?.is_some())
        });
        assert_eq!(result, Ok(true));
    }

    #[test]
    fn dropped_transaction_discards_staged_writes() {
        let adapter = InMemoryAdapter::new();
        {
            let executor = adapter.setup().unwrap();
            let tx = executor.begin_transaction().unwrap();
            tx.create_user(&user("carol", 2)).unwrap();
        }
        let executor = adapter.setup().unwrap();
        assert_eq!(executor.get_user_by_username("carol").unwrap(), None);
    }

    #[test]
    fn finished_transaction_rejects_further_use() {
        let adapter = InMemoryAdapter::new();
        let executor = adapter.setup().unwrap();
        let tx = executor.begin_transaction().unwrap();
        tx.commit().unwrap();
        assert_eq!(tx.commit(), Err(StoreError::TransactionFinished));
        assert_eq!(
            tx.get_user_by_username("x"),
            Err(StoreError::TransactionFinished)
        );
    }

    #[test]
    fn deleting_user_cascades_to_sessions_and_roles() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let c = client("app");
        ex.create_user(&user("alice", 5)).unwrap();
        ex.create_client(&c).unwrap();
        let session = Session {
            token: SessionToken::new(),
            username: "alice".into(),
            rank: Rank::new(5),
        };
        ex.save_session(&session).unwrap();
        ex.create_user_role(&UserRole {
            client_uid: c.uid,
            username: "alice".into(),
            role: "admin".into(),
        })
        .unwrap();

        assert!(ex.delete_user("alice").unwrap());
        assert_eq!(ex.get_session_by_token(session.token).unwrap(), None);
        assert_eq!(ex.get_user_role_by_client_and_username(c.uid, "alice").unwrap(), None);
        assert!(!ex.delete_user("alice").unwrap());
    }

    #[test]
    fn deleting_client_cascades_to_roles() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let c = client("app");
        ex.create_user(&user("alice", 5)).unwrap();
        ex.create_client(&c).unwrap();
        ex.create_user_role(&UserRole {
            client_uid: c.uid,
            username: "alice".into(),
            role: "admin".into(),
        })
        .unwrap();

        assert!(ex.delete_client(c.uid).unwrap());
        assert_eq!(ex.get_user_role_by_client_and_username(c.uid, "alice").unwrap(), None);
    }

    #[test]
    fn references_are_enforced() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let orphan = Session {
            token: SessionToken::new(),
            username: "ghost".into(),
            rank: Rank::new(1),
        };
        assert!(matches!(ex.save_session(&orphan), Err(StoreError::MissingReference(_))));

        ex.create_user(&user("alice", 5)).unwrap();
        let role = UserRole {
            client_uid: ClientUid::new(),
            username: "alice".into(),
            role: "admin".into(),
        };
        assert!(matches!(ex.create_user_role(&role), Err(StoreError::MissingReference(_))));
    }

    #[test]
    fn other_sessions_are_removed_but_the_kept_one_survives() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        ex.create_user(&user("alice", 5)).unwrap();
        ex.create_user(&user("bob", 1)).unwrap();
        let mk = |name: &str| Session {
            token: SessionToken::new(),
            username: name.into(),
            rank: Rank::new(1),
        };
        let (a1, a2, b1) = (mk("alice"), mk("alice"), mk("bob"));
        for s in [&a1, &a2, &b1] {
            ex.save_session(s).unwrap();
        }

        ex.delete_all_other_user_sessions("alice", a1.token).unwrap();
        assert!(ex.get_session_by_token(a1.token).unwrap().is_some());
        assert!(ex.get_session_by_token(a2.token).unwrap().is_none());
        assert!(ex.get_session_by_token(b1.token).unwrap().is_some());

        ex.delete_all_user_sessions("alice").unwrap();
        assert!(ex.get_session_by_token(a1.token).unwrap().is_none());
    }

    #[test]
    fn lesser_rank_queries_are_strict() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let c = client("app");
        ex.create_client(&c).unwrap();
        for (name, rank) in [("a", 1), ("b", 5), ("c", 9)] {
            ex.create_user(&user(name, rank)).unwrap();
            ex.create_user_role(&UserRole {
                client_uid: c.uid,
                username: name.into(),
                role: "member".into(),
            })
            .unwrap();
        }

        let users = ex.get_users_with_lesser_rank(Rank::new(5)).unwrap();
        assert_eq!(users.iter().map(|u| u.username.as_str()).collect::<Vec<_>>(), vec!["a"]);

        let roles = ex
            .get_user_roles_with_lesser_rank_by_client(c.uid, Rank::new(6))
            .unwrap();
        assert_eq!(
            roles.iter().map(|r| r.username.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn reading_transaction_does_not_block_other_writers() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let tx = ex.begin_transaction().unwrap();
        assert_eq!(tx.get_user_by_username("alice").unwrap(), None);

        let other = adapter.clone();
        let (done, finished) = mpsc::channel();
        thread::spawn(move || {
            let ex = other.setup().unwrap();
            let _ = done.send(ex.create_user(&user("alice", 5)));
        });
        assert_eq!(finished.recv_timeout(Duration::from_secs(5)), Ok(Ok(())));

        // The concurrent commit is visible, and the first write sees it too.
        assert!(tx.get_user_by_username("alice").unwrap().is_some());
        assert!(matches!(
            tx.create_user(&user("alice", 1)),
            Err(StoreError::Duplicate(_))
        ));
        tx.create_user(&user("bob", 1)).unwrap();
        tx.commit().unwrap();

        let ex = adapter.setup().unwrap();
        assert_eq!(ex.get_user_by_username("bob").unwrap(), Some(user("bob", 1)));
        assert_eq!(ex.get_user_by_username("alice").unwrap(), Some(user("alice", 5)));
    }

    #[test]
    fn writing_transaction_holds_readers_until_commit() {
        let adapter = InMemoryAdapter::new();
        let ex = adapter.setup().unwrap();
        let tx = ex.begin_transaction().unwrap();
        tx.create_user(&user("alice", 5)).unwrap();

        let other = adapter.clone();
        let (done, finished) = mpsc::channel();
        thread::spawn(move || {
            let ex = other.setup().unwrap();
            let _ = done.send(ex.get_user_by_username("alice"));
        });
        assert_eq!(
            finished.recv_timeout(Duration::from_millis(100)),
            Err(mpsc::RecvTimeoutError::Timeout)
        );

        tx.commit().unwrap();
        assert_eq!(
            finished.recv_timeout(Duration::from_secs(5)),
            Ok(Ok(Some(user("alice", 5))))
        );
    }
}
