//! Confirmation gate for destructive statements.
//!
//! Detection is plain substring matching on the upper-cased statement. It
//! does not parse SQL: `DELETE` inside a string literal still triggers the
//! prompt, and a `WHERE` anywhere in the text suppresses it.

use crate::error::{DbError, DbResult};
use crate::session::format::StatusBlock;
use crate::terminal::{InputEvent, Terminal};
use tracing::{info, warn};

/// Type of dangerous SQL operation detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerousOperationType {
    /// DELETE without WHERE clause
    DeleteWithoutWhere,
    /// DROP TABLE statement
    DropTable,
}

impl DangerousOperationType {
    /// Get the operation name for the warning block.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Self::DeleteWithoutWhere => "DELETE without WHERE clause",
            Self::DropTable => "DROP TABLE",
        }
    }

    /// Get the reason why this operation is dangerous.
    pub fn risk(&self) -> &'static str {
        match self {
            Self::DeleteWithoutWhere => "This will delete ALL rows in the table",
            Self::DropTable => "This will permanently delete the table and all data",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::DeleteWithoutWhere => "Add WHERE clause to limit deletion",
            Self::DropTable => "Backup data before dropping tables",
        }
    }

    /// Question put to the operator.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::DeleteWithoutWhere => "Continue with DELETE ALL? (y/N): ",
            Self::DropTable => "Continue with DROP TABLE? (y/N): ",
        }
    }

    /// Veto reason when the operator declines.
    pub fn cancelled_reason(&self) -> &'static str {
        match self {
            Self::DeleteWithoutWhere => "DELETE operation cancelled by user",
            Self::DropTable => "DROP TABLE operation cancelled by user",
        }
    }

    fn warning(&self) -> StatusBlock {
        StatusBlock::new("⚠️  SECURITY WARNING")
            .field("Operation", self.operation_name())
            .field("Risk", self.risk())
            .field("Recommendation", self.recommendation())
            .footer("Confirm to continue")
    }
}

/// Every dangerous operation the statement matches, in the order they are
/// confirmed.
///
/// # Examples
///
/// ```
/// use sqlexec::session::guard::{detect, DangerousOperationType};
///
/// assert_eq!(detect("DELETE FROM users;"), vec![DangerousOperationType::DeleteWithoutWhere]);
/// assert!(detect("DELETE FROM users WHERE id = 1;").is_empty());
/// assert_eq!(detect("drop table users;"), vec![DangerousOperationType::DropTable]);
/// ```
pub fn detect(sql: &str) -> Vec<DangerousOperationType> {
    let upper = sql.trim().to_uppercase();
    let mut found = Vec::new();
    if upper.contains("DELETE") && !upper.contains("WHERE") {
        found.push(DangerousOperationType::DeleteWithoutWhere);
    }
    if upper.contains("DROP TABLE") {
        found.push(DangerousOperationType::DropTable);
    }
    found
}

/// Ask the operator to confirm each dangerous operation in `sql`.
///
/// Returns `SafetyVetoed` at the first declined confirmation. Anything other
/// than `y` or `yes` declines, including Ctrl-C and end of input.
pub fn check(sql: &str, terminal: &mut dyn Terminal) -> DbResult<()> {
    for operation in detect(sql) {
        terminal.write_line(&operation.warning().render());
        if !confirm(terminal, operation.prompt()) {
            info!(operation = operation.operation_name(), "Operation declined");
            return Err(DbError::safety_vetoed(operation.cancelled_reason()));
        }
        warn!(operation = operation.operation_name(), "Dangerous operation confirmed");
    }
    Ok(())
}

fn confirm(terminal: &mut dyn Terminal, prompt: &str) -> bool {
    match terminal.read_line(prompt) {
        InputEvent::Line(answer) => {
            matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
        }
        InputEvent::Interrupted | InputEvent::Eof => false,
    }
}
