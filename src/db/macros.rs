//! Database dispatch macros for reducing code duplication.
//!
//! The executor functions are written once per dialect against the concrete
//! driver connection type. These macros pick the right one for a `DbPool`
//! and its optional open transaction, expanding at compile time.

/// Run an executor operation on the open transaction, or on a connection
/// acquired from the pool when no transaction is open.
///
/// # Example
///
/// ```ignore
/// with_connection!(&self.pool, self.transaction.as_mut(), fetch(sql))
/// ```
macro_rules! with_connection {
    ($pool:expr, $tx:expr, $op:ident($($arg:expr),* $(,)?)) => {
        match ($pool, $tx) {
            #[cfg(feature = "mysql")]
            (_, Some($crate::db::DbTransaction::MySql(tx))) => {
                $crate::db::executor::mysql::$op(&mut **tx, $($arg),*).await
            }
            #[cfg(feature = "mysql")]
            ($crate::db::DbPool::MySql(pool), None) => {
                let mut conn = pool.acquire().await?;
                $crate::db::executor::mysql::$op(&mut conn, $($arg),*).await
            }
            #[cfg(feature = "postgres")]
            (_, Some($crate::db::DbTransaction::Postgres(tx))) => {
                $crate::db::executor::postgres::$op(&mut **tx, $($arg),*).await
            }
            #[cfg(feature = "postgres")]
            ($crate::db::DbPool::Postgres(pool), None) => {
                let mut conn = pool.acquire().await?;
                $crate::db::executor::postgres::$op(&mut conn, $($arg),*).await
            }
            #[cfg(feature = "sqlite")]
            (_, Some($crate::db::DbTransaction::SQLite(tx))) => {
                $crate::db::executor::sqlite::$op(&mut **tx, $($arg),*).await
            }
            #[cfg(feature = "sqlite")]
            ($crate::db::DbPool::SQLite(pool), None) => {
                let mut conn = pool.acquire().await?;
                $crate::db::executor::sqlite::$op(&mut conn, $($arg),*).await
            }
            #[allow(unreachable_patterns)]
            _ => Err($crate::error::DbError::connection_lost(
                "Connection is in an inconsistent state",
            )),
        }
    };
}

pub(crate) use with_connection;
