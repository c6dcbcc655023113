//! Explicit transactions for sessions running with auto-commit off.
//!
//! A transaction owns the connection's only pooled connection until it is
//! committed or rolled back, so statements executed meanwhile observe its
//! uncommitted changes.

use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::DatabaseType;
use sqlx::Transaction;
#[cfg(feature = "mysql")]
use sqlx::MySql;
#[cfg(feature = "postgres")]
use sqlx::Postgres;
#[cfg(feature = "sqlite")]
use sqlx::Sqlite;
use tracing::debug;

/// Database-specific transaction wrapper.
pub enum DbTransaction {
    #[cfg(feature = "mysql")]
    MySql(Transaction<'static, MySql>),
    #[cfg(feature = "postgres")]
    Postgres(Transaction<'static, Postgres>),
    #[cfg(feature = "sqlite")]
    SQLite(Transaction<'static, Sqlite>),
}

impl DbTransaction {
    /// Start a transaction on the pool's connection.
    pub async fn begin(pool: &DbPool) -> DbResult<Self> {
        let tx = match pool {
            #[cfg(feature = "mysql")]
            DbPool::MySql(p) => DbTransaction::MySql(p.begin().await.map_err(DbError::from)?),
            #[cfg(feature = "postgres")]
            DbPool::Postgres(p) => {
                DbTransaction::Postgres(p.begin().await.map_err(DbError::from)?)
            }
            #[cfg(feature = "sqlite")]
            DbPool::SQLite(p) => DbTransaction::SQLite(p.begin().await.map_err(DbError::from)?),
        };
        debug!(db_type = %tx.db_type(), "Transaction started");
        Ok(tx)
    }

    /// Get the database type for this transaction.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(_) => DatabaseType::MySQL,
            #[cfg(feature = "postgres")]
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            #[cfg(feature = "sqlite")]
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Commit the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self {
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(tx) => tx.commit().await.map_err(DbError::from),
            #[cfg(feature = "postgres")]
            DbTransaction::Postgres(tx) => tx.commit().await.map_err(DbError::from),
            #[cfg(feature = "sqlite")]
            DbTransaction::SQLite(tx) => tx.commit().await.map_err(DbError::from),
        }
    }

    /// Rollback the transaction.
    pub async fn rollback(self) -> DbResult<()> {
        match self {
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(tx) => tx.rollback().await.map_err(DbError::from),
            #[cfg(feature = "postgres")]
            DbTransaction::Postgres(tx) => tx.rollback().await.map_err(DbError::from),
            #[cfg(feature = "sqlite")]
            DbTransaction::SQLite(tx) => tx.rollback().await.map_err(DbError::from),
        }
    }
}

impl std::fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.db_type()).finish()
    }
}
