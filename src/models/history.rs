//! Query history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One execution attempt, as persisted in the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "query")]
    pub query_text: String,
    #[serde(rename = "execution_time")]
    pub duration_seconds: f64,
    #[serde(default)]
    pub rows_affected: u64,
    #[serde(default)]
    pub error: Option<String>,
}

impl HistoryEntry {
    /// Record a successful execution.
    pub fn success(query: &str, duration: Duration, rows_affected: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            query_text: query.trim().to_string(),
            duration_seconds: duration.as_secs_f64(),
            rows_affected,
            error: None,
        }
    }

    /// Record a failed execution; failures never report affected rows.
    pub fn failure(query: &str, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            query_text: query.trim().to_string(),
            duration_seconds: duration.as_secs_f64(),
            rows_affected: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
