//! Connection management.
//!
//! Each session holds at most one live [`Connection`]. It wraps a
//! database-specific pool (MySqlPool, PgPool, SqlitePool) sized to a single
//! connection that is never recycled, so session state such as an in-memory
//! SQLite database or an open transaction survives between statements.

use crate::db::macros::with_connection;
use crate::db::transaction::DbTransaction;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectRequest, ConnectionParameters, DatabaseType, RowSet};
#[cfg(feature = "mysql")]
use sqlx::{MySqlPool, mysql::MySqlConnectOptions, mysql::MySqlPoolOptions};
#[cfg(feature = "postgres")]
use sqlx::{PgPool, postgres::PgConnectOptions, postgres::PgPoolOptions};
#[cfg(feature = "sqlite")]
use sqlx::{SqlitePool, sqlite::SqliteConnectOptions, sqlite::SqlitePoolOptions};
#[cfg(feature = "sqlite")]
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long to wait for the server before giving up on a connect.
const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Database-specific connection pool (avoids AnyPool limitations).
#[derive(Debug, Clone)]
pub enum DbPool {
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
}

impl DbPool {
    /// Close the connection pool.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(pool) => pool.close().await,
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => pool.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(pool) => pool.close().await,
        }
    }

    /// Get the database type for this pool.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "mysql")]
            DbPool::MySql(_) => DatabaseType::MySQL,
            #[cfg(feature = "postgres")]
            DbPool::Postgres(_) => DatabaseType::PostgreSQL,
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(_) => DatabaseType::SQLite,
        }
    }
}

/// A live session connection.
pub struct Connection {
    pool: DbPool,
    transaction: Option<DbTransaction>,
    parameters: ConnectionParameters,
    server_version: Option<String>,
}

impl Connection {
    /// Open a connection for the request.
    ///
    /// The password is consumed here and never retained.
    pub async fn connect(request: &ConnectRequest) -> DbResult<Self> {
        let dialect = request.dialect();
        if !dialect.driver_available() {
            return Err(DbError::dependency_missing(
                dialect.display_name(),
                dialect.driver_feature(),
            ));
        }

        let parameters = request.parameters();
        info!(connection = %parameters, "Connecting to database");

        let pool = Self::create_pool(request).await?;
        let server_version = get_server_version(&pool).await;

        info!(
            db_type = %dialect,
            server_version = ?server_version,
            "Connected successfully"
        );

        Ok(Self {
            pool,
            transaction: None,
            parameters,
            server_version,
        })
    }

    async fn create_pool(request: &ConnectRequest) -> DbResult<DbPool> {
        let acquire_timeout = Duration::from_secs(ACQUIRE_TIMEOUT_SECS);
        let dialect = request.dialect();

        match request {
            #[cfg(feature = "sqlite")]
            ConnectRequest::SQLite { path } => {
                let options = if path == ":memory:" {
                    SqliteConnectOptions::from_str("sqlite::memory:")?
                } else {
                    SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                };

                let pool = SqlitePoolOptions::new()
                    .min_connections(1)
                    .max_connections(1)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(|e| connect_error(dialect, e))?;
                Ok(DbPool::SQLite(pool))
            }
            #[cfg(feature = "mysql")]
            ConnectRequest::MySQL(server) => {
                let options = MySqlConnectOptions::new()
                    .host(&server.host)
                    .port(server.port)
                    .username(&server.user)
                    .password(&server.password)
                    .database(&server.database)
                    .charset("utf8mb4");

                let pool = MySqlPoolOptions::new()
                    .min_connections(1)
                    .max_connections(1)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(|e| connect_error(dialect, e))?;
                Ok(DbPool::MySql(pool))
            }
            #[cfg(feature = "postgres")]
            ConnectRequest::PostgreSQL(server) => {
                let options = PgConnectOptions::new()
                    .host(&server.host)
                    .port(server.port)
                    .username(&server.user)
                    .password(&server.password)
                    .database(&server.database);

                let pool = PgPoolOptions::new()
                    .min_connections(1)
                    .max_connections(1)
                    .acquire_timeout(acquire_timeout)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .map_err(|e| connect_error(dialect, e))?;
                Ok(DbPool::Postgres(pool))
            }
            #[allow(unreachable_patterns)]
            _ => Err(DbError::dependency_missing(
                dialect.display_name(),
                dialect.driver_feature(),
            )),
        }
    }

    pub fn dialect(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// Password-free parameters the connection was opened with.
    pub fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    /// True while an explicit transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Run a data-returning statement.
    pub async fn fetch(&mut self, sql: &str) -> DbResult<RowSet> {
        debug!(sql = %sql, in_transaction = self.in_transaction(), "Fetching");
        with_connection!(&self.pool, self.transaction.as_mut(), fetch(sql))
    }

    /// Run an effecting statement and return the affected row count.
    pub async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        debug!(sql = %sql, in_transaction = self.in_transaction(), "Executing");
        with_connection!(&self.pool, self.transaction.as_mut(), execute(sql))
    }

    /// Open a transaction unless one is already open.
    pub async fn begin(&mut self) -> DbResult<()> {
        if self.transaction.is_none() {
            self.transaction = Some(DbTransaction::begin(&self.pool).await?);
        }
        Ok(())
    }

    /// Commit the open transaction, if any.
    pub async fn commit(&mut self) -> DbResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.commit().await?;
                debug!("Transaction committed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Roll back the open transaction, if any.
    pub async fn rollback(&mut self) -> DbResult<()> {
        match self.transaction.take() {
            Some(tx) => {
                tx.rollback().await?;
                debug!("Transaction rolled back");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Close the connection, discarding any uncommitted work.
    pub async fn close(mut self) {
        if self.in_transaction() {
            warn!(connection = %self.parameters, "Rolling back uncommitted transaction on close");
            if let Err(e) = self.rollback().await {
                warn!(error = %e, "Rollback on close failed");
            }
        }
        self.pool.close().await;
        info!(connection = %self.parameters, "Disconnected");
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("parameters", &self.parameters)
            .field("server_version", &self.server_version)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

/// Get the server version from the connected database.
async fn get_server_version(pool: &DbPool) -> Option<String> {
    let result = match pool {
        #[cfg(feature = "mysql")]
        DbPool::MySql(pool) => {
            sqlx::query_scalar::<_, String>("SELECT version()")
                .fetch_one(pool)
                .await
        }
        #[cfg(feature = "postgres")]
        DbPool::Postgres(pool) => {
            sqlx::query_scalar::<_, String>("SELECT version()")
                .fetch_one(pool)
                .await
        }
        #[cfg(feature = "sqlite")]
        DbPool::SQLite(pool) => {
            sqlx::query_scalar::<_, String>("SELECT sqlite_version()")
                .fetch_one(pool)
                .await
        }
    };

    match result {
        Ok(version) => {
            debug!(version = %version, "Got server version");
            Some(version)
        }
        Err(e) => {
            warn!(error = %e, "Failed to get server version");
            None
        }
    }
}

fn connect_error(db_type: DatabaseType, error: sqlx::Error) -> DbError {
    DbError::connection(
        format!("Failed to connect: {}", error),
        connection_suggestion(db_type, &error),
    )
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and accessible",
            db_type
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify the username and password".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that the database name exists".to_string();
    }

    if error_str.contains("unable to open database") {
        return "Check that the directory exists and is writable".to_string();
    }

    match db_type {
        DatabaseType::PostgreSQL => {
            "Usage: connect postgresql <host> <user> <password> <database> [port]".to_string()
        }
        DatabaseType::MySQL => {
            "Usage: connect mysql <host> <user> <password> <database> [port]".to_string()
        }
        DatabaseType::SQLite => "Usage: connect sqlite <path>".to_string(),
    }
}
