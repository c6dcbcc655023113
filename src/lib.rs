//! sqlexec Library
//!
//! An interactive SQL client for SQLite, PostgreSQL and MySQL: password
//! gate, meta-commands, confirmation of destructive statements, tabular
//! output, persisted query history and CSV/TXT export.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod models;
pub mod session;
pub mod terminal;

pub use config::Config;
pub use db::Connection;
pub use error::{DbError, DbResult};
pub use session::Dispatcher;
