//! The interactive session.
//!
//! This module turns operator input into meta-commands or SQL statements:
//! - `commands`: meta-command recognition
//! - `guard`: confirmation of destructive statements
//! - `dispatcher`: the REPL and the query execution pipeline
//! - `format`: result grids and status blocks
//! - `export`: writing the last row set to CSV or TXT

pub mod commands;
pub mod dispatcher;
pub mod export;
pub mod format;
pub mod guard;

pub use commands::MetaCommand;
pub use dispatcher::Dispatcher;
pub use format::StatusBlock;

use crate::db::Connection;
use crate::models::RowSet;

/// Prompt while connected.
pub const CONNECTED_PROMPT: &str = "✓sql> ";
/// Prompt while not connected.
pub const DISCONNECTED_PROMPT: &str = "✗sql> ";
/// Prompt while a statement is missing its terminating `;`.
pub const CONTINUATION_PROMPT: &str = "...> ";

/// What the REPL should do after one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing ran (empty input or cancelled statement)
    Continue,
    /// End the session
    Exit,
    /// A command or statement ran, successfully or not
    Handled,
}

/// Mutable state of one operator session.
#[derive(Debug)]
pub struct SessionState {
    pub connection: Option<Connection>,
    pub auto_commit: bool,
    /// Most recent row set, source for `export`
    pub last_rows: Option<RowSet>,
    /// True while the REPL loop is reading input
    pub running: bool,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn prompt(&self) -> &'static str {
        if self.is_connected() {
            CONNECTED_PROMPT
        } else {
            DISCONNECTED_PROMPT
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            connection: None,
            auto_commit: true,
            last_rows: None,
            running: false,
        }
    }
}
