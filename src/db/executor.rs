//! Statement execution.
//!
//! Statements arrive as raw text typed at the prompt and run over the simple
//! query protocol, without bound parameters.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch and execute
//! - `postgres`: PostgreSQL-specific fetch and execute
//! - `sqlite`: SQLite-specific fetch and execute
//!
//! Each submodule takes the driver's concrete connection type so the same code
//! serves both pooled connections and open transactions.

use crate::db::types::RowToValues;
use crate::error::DbResult;
use crate::models::RowSet;
#[allow(unused_imports)]
use sqlx::{Column, Executor, Statement};
use tracing::debug;

/// Build a row set from fetched rows.
///
/// Headers come from the first row; when there are none the caller supplies
/// the statement's declared columns.
fn build_row_set<R: RowToValues>(rows: Vec<R>, fallback_headers: Vec<String>) -> RowSet {
    let headers = match rows.first() {
        Some(row) => row.column_names(),
        None => fallback_headers,
    };
    let values = rows.iter().map(RowToValues::to_values).collect();
    debug!(columns = headers.len(), rows = rows.len(), "Fetched rows");
    RowSet::new(headers, values)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.

#[cfg(feature = "mysql")]
pub(crate) mod mysql {
    use super::*;
    use sqlx::MySqlConnection;

    pub async fn fetch(conn: &mut MySqlConnection, sql: &str) -> DbResult<RowSet> {
        let rows = (&mut *conn).fetch_all(sql).await?;
        let headers = if rows.is_empty() {
            statement_headers(conn, sql).await
        } else {
            Vec::new()
        };
        Ok(build_row_set(rows, headers))
    }

    pub async fn execute(conn: &mut MySqlConnection, sql: &str) -> DbResult<u64> {
        let result = (&mut *conn).execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn statement_headers(conn: &mut MySqlConnection, sql: &str) -> Vec<String> {
        (&mut *conn)
            .prepare(sql)
            .await
            .map(|stmt| {
                stmt.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(feature = "postgres")]
pub(crate) mod postgres {
    use super::*;
    use sqlx::PgConnection;

    pub async fn fetch(conn: &mut PgConnection, sql: &str) -> DbResult<RowSet> {
        let rows = (&mut *conn).fetch_all(sql).await?;
        let headers = if rows.is_empty() {
            statement_headers(conn, sql).await
        } else {
            Vec::new()
        };
        Ok(build_row_set(rows, headers))
    }

    pub async fn execute(conn: &mut PgConnection, sql: &str) -> DbResult<u64> {
        let result = (&mut *conn).execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn statement_headers(conn: &mut PgConnection, sql: &str) -> Vec<String> {
        (&mut *conn)
            .prepare(sql)
            .await
            .map(|stmt| {
                stmt.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(feature = "sqlite")]
pub(crate) mod sqlite {
    use super::*;
    use sqlx::SqliteConnection;

    pub async fn fetch(conn: &mut SqliteConnection, sql: &str) -> DbResult<RowSet> {
        let rows = (&mut *conn).fetch_all(sql).await?;
        let headers = if rows.is_empty() {
            statement_headers(conn, sql).await
        } else {
            Vec::new()
        };
        Ok(build_row_set(rows, headers))
    }

    pub async fn execute(conn: &mut SqliteConnection, sql: &str) -> DbResult<u64> {
        let result = (&mut *conn).execute(sql).await?;
        Ok(result.rows_affected())
    }

    async fn statement_headers(conn: &mut SqliteConnection, sql: &str) -> Vec<String> {
        (&mut *conn)
            .prepare(sql)
            .await
            .map(|stmt| {
                stmt.columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}
