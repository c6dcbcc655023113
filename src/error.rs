//! Error types for sqlexec.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Driver failures are split into recoverable execution failures (bad SQL, constraint
//! violations) and connection loss, so callers can decide what to do without
//! string-matching messages.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("No database connection")]
    NotConnected,

    #[error("{dialect} driver not available: built without the '{feature}' feature")]
    DependencyMissing {
        dialect: String,
        feature: &'static str,
    },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("{reason}")]
    SafetyVetoed { reason: String },

    #[error("{message}")]
    Execution {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Connection lost: {message}")]
    ConnectionLost { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Could not persist {what}: {message}")]
    Persistence { what: String, message: String },
}

impl DbError {
    /// Create a missing driver error for a dialect compiled out of this build.
    pub fn dependency_missing(dialect: impl Into<String>, feature: &'static str) -> Self {
        Self::DependencyMissing {
            dialect: dialect.into(),
            feature,
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a vetoed-by-operator error.
    pub fn safety_vetoed(reason: impl Into<String>) -> Self {
        Self::SafetyVetoed {
            reason: reason.into(),
        }
    }

    /// Create an execution error with optional SQL state.
    pub fn execution(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql_state,
        }
    }

    pub fn connection_lost(message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a persistence error for a named file-backed store.
    pub fn persistence(what: impl Into<String>, message: impl ToString) -> Self {
        Self::Persistence {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NotConnected => Some("Use the 'connect' command first".to_string()),
            Self::DependencyMissing { feature, .. } => Some(format!(
                "Rebuild with the driver enabled: cargo install sqlexec --features {}",
                feature
            )),
            Self::Connection { suggestion, .. } => Some(suggestion.clone()),
            Self::ConnectionLost { .. } => {
                Some("Reconnect with the 'connect' command".to_string())
            }
            _ => None,
        }
    }

    /// True for failures that happened while a statement reached the driver.
    ///
    /// These are the only errors recorded in query history.
    pub fn is_execution_attempt(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::ConnectionLost { .. })
    }

    /// True when the session can keep using the current connection.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ConnectionLost { .. })
    }

    /// True for errors raised while establishing a connection.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::DependencyMissing { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection parameters and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::execution(db_err.message(), code)
            }
            sqlx::Error::RowNotFound => DbError::execution("No rows returned", None),
            sqlx::Error::PoolTimedOut => {
                DbError::connection_lost("Timed out waiting for the database connection")
            }
            sqlx::Error::PoolClosed => DbError::connection_lost("Connection is closed"),
            sqlx::Error::Io(io_err) => DbError::connection_lost(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => {
                DbError::connection_lost(format!("TLS error: {}", tls_err))
            }
            sqlx::Error::Protocol(msg) => {
                DbError::connection_lost(format!("Protocol error: {}", msg))
            }
            sqlx::Error::WorkerCrashed => DbError::connection_lost("Database worker crashed"),
            sqlx::Error::TypeNotFound { type_name } => {
                DbError::execution(format!("Type not found: {}", type_name), None)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::execution(format!("Column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::execution(
                format!("Column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => DbError::execution(
                format!("Failed to decode column {}: {}", index, source),
                None,
            ),
            sqlx::Error::Decode(source) => {
                DbError::execution(format!("Decode error: {}", source), None)
            }
            _ => DbError::execution(format!("Unknown database error: {}", err), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
        assert_eq!(DbError::NotConnected.to_string(), "No database connection");
    }

    #[test]
    fn test_vetoed_displays_reason_only() {
        let err = DbError::safety_vetoed("DROP TABLE operation cancelled by user");
        assert_eq!(err.to_string(), "DROP TABLE operation cancelled by user");
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("refused", "Check the server is running");
        assert_eq!(
            err.suggestion().as_deref(),
            Some("Check the server is running")
        );
        assert!(DbError::execution("syntax error", None).suggestion().is_none());
    }

    #[test]
    fn test_dependency_missing_suggests_feature() {
        let err = DbError::dependency_missing("MySQL", "mysql");
        assert!(err.to_string().contains("'mysql' feature"));
        assert!(err.suggestion().unwrap().contains("--features mysql"));
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_execution_attempt_classification() {
        assert!(DbError::execution("no such table: t", None).is_execution_attempt());
        assert!(DbError::connection_lost("broken pipe").is_execution_attempt());
        assert!(!DbError::NotConnected.is_execution_attempt());
        assert!(!DbError::safety_vetoed("declined").is_execution_attempt());
    }

    #[test]
    fn test_recoverable() {
        assert!(DbError::execution("bad sql", None).is_recoverable());
        assert!(!DbError::connection_lost("reset by peer").is_recoverable());
    }

    #[test]
    fn test_sqlx_pool_closed_is_connection_lost() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::ConnectionLost { .. }));
    }

    #[test]
    fn test_sqlx_row_not_found_is_execution() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Execution { .. }));
    }
}
