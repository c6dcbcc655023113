//! Data models for sqlexec.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod history;
pub mod query;

// Re-export commonly used types
pub use connection::{
    ConnectRequest, ConnectRequestError, ConnectionParameters, DatabaseType, ServerParams,
};
pub use history::HistoryEntry;
pub use query::{DATA_RETURNING_KEYWORDS, QueryOutcome, RowSet, StatementKind};
