//! Query-related data models.
//!
//! This module defines statement classification and the shapes a successful
//! execution can take.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Leading keywords of statements that return rows.
pub const DATA_RETURNING_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "EXPLAIN"];

/// How a statement is expected to behave when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns a row set (SELECT, SHOW, DESCRIBE, EXPLAIN)
    DataReturning,
    /// Mutates without returning rows (INSERT, UPDATE, DELETE, DDL, ...)
    Effecting,
}

impl StatementKind {
    /// Classify a statement by keyword prefix, case-insensitively, after trimming.
    pub fn classify(sql: &str) -> Self {
        let upper = sql.trim().to_uppercase();
        if DATA_RETURNING_KEYWORDS
            .iter()
            .any(|keyword| upper.starts_with(keyword))
        {
            Self::DataReturning
        } else {
            Self::Effecting
        }
    }
}

/// Tabular result of a data-returning statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl RowSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Successful outcome of one executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    RowSet(RowSet),
    Affected(u64),
}

impl QueryOutcome {
    /// Row count summarized into history.
    pub fn rows_affected(&self) -> u64 {
        match self {
            Self::RowSet(rows) => rows.row_count() as u64,
            Self::Affected(count) => *count,
        }
    }

    pub fn as_row_set(&self) -> Option<&RowSet> {
        match self {
            Self::RowSet(rows) => Some(rows),
            Self::Affected(_) => None,
        }
    }
}
