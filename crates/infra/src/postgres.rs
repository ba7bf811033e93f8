//! Postgres storage adapter.
//!
//! ## Blocking bridge
//!
//! The storage traits are synchronous. Every call is driven to completion with
//! `Handle::block_on`, so callers must run on a thread outside the async
//! executor (the API uses `spawn_blocking`). That includes dropping an
//! unfinished transaction, which issues its `ROLLBACK` the same way.
//!
//! An executor holds a single pooled connection; `BEGIN`/`COMMIT`/`ROLLBACK`
//! are issued on it directly.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (foreign key violation) | `23503` | `MissingReference` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / other | N/A | `Backend` |
//!
//! Rows that fail to decode (negative rank, unknown token type) surface as
//! `Corrupt`.

use std::cell::{Cell, RefCell, RefMut};

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Postgres, Row};
use tokio::runtime::Handle;
use tracing::instrument;
use uuid::Uuid;

use warden_core::{
    Adapter, Client, ClientStore, ClientUid, Executor, Rank, Session, SessionStore, SessionToken,
    StoreError, StoreResult, TokenType, Transaction, User, UserRole, UserRoleStore, UserStore,
};

/// Ordered schema migrations, applied once each and recorded in `migrations`.
const MIGRATIONS: &[(&str, &str)] = &[("0001_init", include_str!("../migrations/0001_init.sql"))];

#[derive(Debug, Clone)]
pub struct PostgresAdapter {
    pool: PgPool,
    handle: Handle,
}

impl PostgresAdapter {
    /// Wrap an existing pool. Must be called from within a Tokio runtime.
    pub fn new(pool: PgPool) -> StoreResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| StoreError::Backend(format!("no tokio runtime: {e}")))?;
        Ok(Self { pool, handle })
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Self::new(pool)
    }

    /// Apply pending migrations in order. Returns the versions applied by this call.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<Vec<&'static str>> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS migrations (
                version    TEXT PRIMARY KEY,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;

        let mut applied = Vec::new();
        for &(version, script) in MIGRATIONS {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;

            let done = sqlx::query("SELECT 1 FROM migrations WHERE version = $1")
                .bind(version)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
            if done.is_some() {
                continue;
            }

            sqlx::raw_sql(script)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
            sqlx::query("INSERT INTO migrations (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;

            tracing::info!(version, "applied migration");
            applied.push(version);
        }
        Ok(applied)
    }
}

impl Adapter for PostgresAdapter {
    fn setup(&self) -> StoreResult<Box<dyn Executor + '_>> {
        let conn = self
            .handle
            .block_on(self.pool.acquire())
            .map_err(|e| map_sqlx_error("acquire", e))?;
        Ok(Box::new(PostgresExecutor {
            handle: &self.handle,
            conn: RefCell::new(Some(conn)),
            broken: Cell::new(false),
        }))
    }

    fn clean_up(&self, executor: Box<dyn Executor + '_>) -> StoreResult<()> {
        // Dropping the executor returns its connection to the pool.
        drop(executor);
        Ok(())
    }
}

/// Holds one pooled connection for the duration of a unit of work.
///
/// Transactions run on that same connection, so a unit of work never needs
/// more than one connection from the pool.
pub struct PostgresExecutor<'a> {
    handle: &'a Handle,
    conn: RefCell<Option<PoolConnection<Postgres>>>,
    /// Set when a transaction could not be closed; the connection is then
    /// discarded instead of going back to the pool.
    broken: Cell<bool>,
}

impl PostgresExecutor<'_> {
    fn conn(&self) -> StoreResult<RefMut<'_, PgConnection>> {
        let conn = self
            .conn
            .try_borrow_mut()
            .map_err(|_| StoreError::Backend("connection already in use".to_string()))?;
        RefMut::filter_map(conn, |c| c.as_deref_mut())
            .map_err(|_| StoreError::Backend("connection released".to_string()))
    }

    /// Run a transaction-control statement on the held connection.
    fn control(&self, statement: &'static str) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let result = self
            .handle
            .block_on(sqlx::raw_sql(statement).execute(&mut *conn))
            .map(drop)
            .map_err(|e| map_sqlx_error(statement, e));
        if result.is_err() {
            self.broken.set(true);
        }
        result
    }
}

impl Drop for PostgresExecutor<'_> {
    fn drop(&mut self) {
        if self.broken.get() {
            if let Some(conn) = self.conn.get_mut().take() {
                tracing::warn!("discarding connection left in an unknown transaction state");
                drop(conn.detach());
            }
        }
    }
}

impl Executor for PostgresExecutor<'_> {
    fn begin_transaction(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        self.control("BEGIN")?;
        Ok(Box::new(PostgresTransaction {
            executor: self,
            handle: self.handle,
            open: Cell::new(true),
        }))
    }
}

/// A transaction on the executor's connection. Dropping it unfinished rolls
/// it back.
pub struct PostgresTransaction<'a> {
    executor: &'a PostgresExecutor<'a>,
    handle: &'a Handle,
    open: Cell<bool>,
}

impl PostgresTransaction<'_> {
    fn conn(&self) -> StoreResult<RefMut<'_, PgConnection>> {
        if !self.open.get() {
            return Err(StoreError::TransactionFinished);
        }
        self.executor.conn()
    }

    fn finish(&self, statement: &'static str) -> StoreResult<()> {
        if !self.open.replace(false) {
            return Err(StoreError::TransactionFinished);
        }
        self.executor.control(statement)
    }
}

impl Transaction for PostgresTransaction<'_> {
    fn commit(&self) -> StoreResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(&self) -> StoreResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for PostgresTransaction<'_> {
    fn drop(&mut self) {
        if self.open.get() {
            if let Err(e) = self.finish("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

macro_rules! impl_store_via_queries {
    ($t:ty) => {
        impl UserStore for $t {
            fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_user_by_username(&mut conn, username))
            }
            fn create_user(&self, user: &User) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::create_user(&mut conn, user))
            }
            fn update_user(&self, user: &User) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::update_user(&mut conn, user))
            }
            fn update_user_password(
                &self,
                username: &str,
                password_hash: &str,
            ) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle
                    .block_on(queries::update_user_password(&mut conn, username, password_hash))
            }
            fn delete_user(&self, username: &str) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::delete_user(&mut conn, username))
            }
            fn get_users_with_lesser_rank(&self, rank: Rank) -> StoreResult<Vec<User>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_users_with_lesser_rank(&mut conn, rank))
            }
        }

        impl ClientStore for $t {
            fn create_client(&self, client: &Client) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::create_client(&mut conn, client))
            }
            fn get_client_by_uid(&self, uid: ClientUid) -> StoreResult<Option<Client>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_client_by_uid(&mut conn, uid))
            }
            fn get_all_clients(&self) -> StoreResult<Vec<Client>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_all_clients(&mut conn))
            }
            fn update_client(&self, client: &Client) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::update_client(&mut conn, client))
            }
            fn delete_client(&self, uid: ClientUid) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::delete_client(&mut conn, uid))
            }
        }

        impl SessionStore for $t {
            fn save_session(&self, session: &Session) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::save_session(&mut conn, session))
            }
            fn get_session_by_token(&self, token: SessionToken) -> StoreResult<Option<Session>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_session_by_token(&mut conn, token))
            }
            fn delete_session(&self, token: SessionToken) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::delete_session(&mut conn, token))
            }
            fn delete_all_user_sessions(&self, username: &str) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle
                    .block_on(queries::delete_all_user_sessions(&mut conn, username))
            }
            fn delete_all_other_user_sessions(
                &self,
                username: &str,
                keep: SessionToken,
            ) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle
                    .block_on(queries::delete_all_other_user_sessions(&mut conn, username, keep))
            }
        }

        impl UserRoleStore for $t {
            fn create_user_role(&self, role: &UserRole) -> StoreResult<()> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::create_user_role(&mut conn, role))
            }
            fn get_user_role_by_client_and_username(
                &self,
                client_uid: ClientUid,
                username: &str,
            ) -> StoreResult<Option<UserRole>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_user_role_by_client_and_username(
                    &mut conn, client_uid, username,
                ))
            }
            fn get_user_roles_with_lesser_rank_by_client(
                &self,
                client_uid: ClientUid,
                rank: Rank,
            ) -> StoreResult<Vec<UserRole>> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::get_user_roles_with_lesser_rank_by_client(
                    &mut conn, client_uid, rank,
                ))
            }
            fn update_user_role(&self, role: &UserRole) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle.block_on(queries::update_user_role(&mut conn, role))
            }
            fn delete_user_role(&self, client_uid: ClientUid, username: &str) -> StoreResult<bool> {
                let mut conn = self.conn()?;
                self.handle
                    .block_on(queries::delete_user_role(&mut conn, client_uid, username))
            }
        }
    };
}

impl_store_via_queries!(PostgresExecutor<'_>);
impl_store_via_queries!(PostgresTransaction<'_>);

mod queries {
    use super::*;

    fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::Corrupt(format!("failed to read {name}: {e}")))
    }

    fn rank_column(row: &PgRow) -> StoreResult<Rank> {
        let raw: i64 = column(row, "rank")?;
        u32::try_from(raw)
            .map(Rank::new)
            .map_err(|_| StoreError::Corrupt(format!("rank out of range: {raw}")))
    }

    fn user_from_row(row: &PgRow) -> StoreResult<User> {
        Ok(User {
            username: column(row, "username")?,
            rank: rank_column(row)?,
            password_hash: column(row, "password_hash")?,
        })
    }

    fn client_from_row(row: &PgRow) -> StoreResult<Client> {
        let token_type: String = column(row, "token_type")?;
        let token_type: TokenType = token_type
            .parse()
            .map_err(|e: warden_core::UnknownTokenType| StoreError::Corrupt(e.to_string()))?;
        let uid: Uuid = column(row, "uid")?;
        Ok(Client {
            uid: ClientUid::from_uuid(uid),
            name: column(row, "name")?,
            redirect_url: column(row, "redirect_url")?,
            token_type,
            key_uri: column(row, "key_uri")?,
        })
    }

    fn session_from_row(row: &PgRow) -> StoreResult<Session> {
        let token: Uuid = column(row, "token")?;
        Ok(Session {
            token: SessionToken::from_uuid(token),
            username: column(row, "username")?,
            rank: rank_column(row)?,
        })
    }

    fn role_from_row(row: &PgRow) -> StoreResult<UserRole> {
        let client_uid: Uuid = column(row, "client_uid")?;
        Ok(UserRole {
            client_uid: ClientUid::from_uuid(client_uid),
            username: column(row, "username")?,
            role: column(row, "role")?,
        })
    }

    fn rank_param(rank: Rank) -> i64 {
        i64::from(rank.value())
    }

    pub(super) async fn get_user_by_username(
        conn: &mut PgConnection,
        username: &str,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT username, rank, password_hash FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_username", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    pub(super) async fn create_user(conn: &mut PgConnection, user: &User) -> StoreResult<()> {
        sqlx::query("INSERT INTO users (username, rank, password_hash) VALUES ($1, $2, $3)")
            .bind(&user.username)
            .bind(rank_param(user.rank))
            .bind(&user.password_hash)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(())
    }

    pub(super) async fn update_user(conn: &mut PgConnection, user: &User) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET rank = $2 WHERE username = $1")
            .bind(&user.username)
            .bind(rank_param(user.rank))
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn update_user_password(
        conn: &mut PgConnection,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("update_user_password", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_user(conn: &mut PgConnection, username: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(username)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn get_users_with_lesser_rank(
        conn: &mut PgConnection,
        rank: Rank,
    ) -> StoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT username, rank, password_hash FROM users WHERE rank < $1 ORDER BY username",
        )
        .bind(rank_param(rank))
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("get_users_with_lesser_rank", e))?;
        rows.iter().map(user_from_row).collect()
    }

    pub(super) async fn create_client(conn: &mut PgConnection, client: &Client) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO clients (uid, name, redirect_url, token_type, key_uri)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(client.uid.as_uuid())
        .bind(&client.name)
        .bind(&client.redirect_url)
        .bind(client.token_type.as_str())
        .bind(&client.key_uri)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("create_client", e))?;
        Ok(())
    }

    pub(super) async fn get_client_by_uid(
        conn: &mut PgConnection,
        uid: ClientUid,
    ) -> StoreResult<Option<Client>> {
        let row = sqlx::query(
            "SELECT uid, name, redirect_url, token_type, key_uri FROM clients WHERE uid = $1",
        )
        .bind(uid.as_uuid())
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx_error("get_client_by_uid", e))?;
        row.as_ref().map(client_from_row).transpose()
    }

    pub(super) async fn get_all_clients(conn: &mut PgConnection) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query(
            "SELECT uid, name, redirect_url, token_type, key_uri FROM clients ORDER BY name, uid",
        )
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("get_all_clients", e))?;
        rows.iter().map(client_from_row).collect()
    }

    pub(super) async fn update_client(
        conn: &mut PgConnection,
        client: &Client,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = $2, redirect_url = $3, token_type = $4, key_uri = $5
            WHERE uid = $1
            "#,
        )
        .bind(client.uid.as_uuid())
        .bind(&client.name)
        .bind(&client.redirect_url)
        .bind(client.token_type.as_str())
        .bind(&client.key_uri)
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("update_client", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_client(
        conn: &mut PgConnection,
        uid: ClientUid,
    ) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE uid = $1")
            .bind(uid.as_uuid())
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_client", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn save_session(
        conn: &mut PgConnection,
        session: &Session,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO sessions (token, username, rank) VALUES ($1, $2, $3)")
            .bind(session.token.as_uuid())
            .bind(&session.username)
            .bind(rank_param(session.rank))
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("save_session", e))?;
        Ok(())
    }

    pub(super) async fn get_session_by_token(
        conn: &mut PgConnection,
        token: SessionToken,
    ) -> StoreResult<Option<Session>> {
        let row = sqlx::query("SELECT token, username, rank FROM sessions WHERE token = $1")
            .bind(token.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(|e| map_sqlx_error("get_session_by_token", e))?;
        row.as_ref().map(session_from_row).transpose()
    }

    pub(super) async fn delete_session(
        conn: &mut PgConnection,
        token: SessionToken,
    ) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token.as_uuid())
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_session", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_all_user_sessions(
        conn: &mut PgConnection,
        username: &str,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE username = $1")
            .bind(username)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_all_user_sessions", e))?;
        Ok(())
    }

    pub(super) async fn delete_all_other_user_sessions(
        conn: &mut PgConnection,
        username: &str,
        keep: SessionToken,
    ) -> StoreResult<()> {
        sqlx::query("DELETE FROM sessions WHERE username = $1 AND token <> $2")
            .bind(username)
            .bind(keep.as_uuid())
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_all_other_user_sessions", e))?;
        Ok(())
    }

    pub(super) async fn create_user_role(
        conn: &mut PgConnection,
        role: &UserRole,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO user_roles (client_uid, username, role) VALUES ($1, $2, $3)")
            .bind(role.client_uid.as_uuid())
            .bind(&role.username)
            .bind(&role.role)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("create_user_role", e))?;
        Ok(())
    }

    pub(super) async fn get_user_role_by_client_and_username(
        conn: &mut PgConnection,
        client_uid: ClientUid,
        username: &str,
    ) -> StoreResult<Option<UserRole>> {
        let row = sqlx::query(
            "SELECT client_uid, username, role FROM user_roles \
             WHERE client_uid = $1 AND username = $2",
        )
        .bind(client_uid.as_uuid())
        .bind(username)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_sqlx_error("get_user_role_by_client_and_username", e))?;
        row.as_ref().map(role_from_row).transpose()
    }

    pub(super) async fn get_user_roles_with_lesser_rank_by_client(
        conn: &mut PgConnection,
        client_uid: ClientUid,
        rank: Rank,
    ) -> StoreResult<Vec<UserRole>> {
        let rows = sqlx::query(
            r#"
            SELECT r.client_uid, r.username, r.role
            FROM user_roles r
            JOIN users u ON u.username = r.username
            WHERE r.client_uid = $1 AND u.rank < $2
            ORDER BY r.username
            "#,
        )
        .bind(client_uid.as_uuid())
        .bind(rank_param(rank))
        .fetch_all(conn)
        .await
        .map_err(|e| map_sqlx_error("get_user_roles_with_lesser_rank_by_client", e))?;
        rows.iter().map(role_from_row).collect()
    }

    pub(super) async fn update_user_role(
        conn: &mut PgConnection,
        role: &UserRole,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE user_roles SET role = $3 WHERE client_uid = $1 AND username = $2")
                .bind(role.client_uid.as_uuid())
                .bind(&role.username)
                .bind(&role.role)
                .execute(conn)
                .await
                .map_err(|e| map_sqlx_error("update_user_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub(super) async fn delete_user_role(
        conn: &mut PgConnection,
        client_uid: ClientUid,
        username: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM user_roles WHERE client_uid = $1 AND username = $2")
            .bind(client_uid.as_uuid())
            .bind(username)
            .execute(conn)
            .await
            .map_err(|e| map_sqlx_error("delete_user_role", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{} in {}", db_err.message(), operation);
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
