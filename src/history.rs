//! Persisted query history.
//!
//! The recorder keeps the most recent entries in memory and rewrites the
//! whole history file after every change. A failed write is logged and never
//! interrupts the statement that triggered it.

use crate::error::{DbError, DbResult};
use crate::models::HistoryEntry;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Maximum number of entries kept in memory and on disk.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Number of entries shown by the `history` command.
pub const DISPLAY_LIMIT: usize = 10;

/// Bounded, file-backed log of execution attempts.
#[derive(Debug)]
pub struct HistoryRecorder {
    path: Option<PathBuf>,
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl HistoryRecorder {
    /// Load history from `path`, keeping at most `limit` entries (never more
    /// than [`DEFAULT_HISTORY_LIMIT`]).
    ///
    /// A missing file starts an empty history. An unreadable or corrupt file
    /// is logged and also starts empty; it is overwritten on the next record.
    pub fn load(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt history file");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read history file");
                Vec::new()
            }
        };

        let mut recorder = Self {
            path: Some(path),
            entries: entries.into(),
            limit: limit.min(DEFAULT_HISTORY_LIMIT),
        };
        recorder.truncate();
        debug!(entries = recorder.len(), "History loaded");
        recorder
    }

    /// A history that is never written to disk.
    pub fn in_memory(limit: usize) -> Self {
        Self {
            path: None,
            entries: VecDeque::new(),
            limit: limit.min(DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an entry, drop the oldest beyond the limit, and persist.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_back(entry);
        self.truncate();
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to save history");
        }
    }

    /// The last `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(limit))
    }

    /// Forget every entry, in memory and on disk.
    pub fn clear(&mut self) -> DbResult<()> {
        self.entries.clear();
        self.flush()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the history file with the current entries.
    pub fn flush(&self) -> DbResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| DbError::persistence("history", e))?;
        std::fs::write(path, json).map_err(|e| DbError::persistence("history", e))
    }

    fn truncate(&mut self) {
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }
}
