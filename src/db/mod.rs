//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - The session connection and its dialect-specific pool
//! - Statement execution
//! - Explicit transactions for auto-commit off
//! - Type mappings from driver rows to cell values
//! - Dispatch macros for reducing code duplication

#[cfg(not(any(feature = "sqlite", feature = "mysql", feature = "postgres")))]
compile_error!("enable at least one database driver feature: sqlite, mysql or postgres");

pub mod executor;
pub(crate) mod macros;
pub mod pool;
pub mod transaction;
pub mod types;

pub use pool::{Connection, DbPool};
pub use transaction::DbTransaction;
