//! Session dispatcher.
//!
//! Reads operator input, routes meta-commands, assembles multi-line SQL and
//! runs statements through the safety gate, the connection, history and the
//! formatter.
//!
//! ```text
//! input ─┬─ meta-command ──────────────────────────────► handler
//!        └─ SQL ─► continuation until ';' ─► guard ─► connection
//!                                                         │
//!                                     history ◄───────────┤
//!                                     format  ◄───────────┘
//! ```

use crate::auth::{self, PasswordStore};
use crate::db::Connection;
use crate::error::{DbError, DbResult};
use crate::history::{DISPLAY_LIMIT, HistoryRecorder};
use crate::models::{
    ConnectRequest, DatabaseType, HistoryEntry, QueryOutcome, RowSet, StatementKind,
};
use crate::session::commands::MetaCommand;
use crate::session::export::{self, ExportFormat};
use crate::session::format::{StatusBlock, render};
use crate::session::{CONTINUATION_PROMPT, Outcome, SessionState, guard};
use crate::terminal::{InputEvent, Terminal};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const WELCOME: &str = "\
╔══════════════════════════════════════════════════════════════╗
║         COMMAND-BASED SQL EXECUTOR                           ║
║         Professional Database Management Tool                ║
╚══════════════════════════════════════════════════════════════╝

Type 'help' for available commands or 'exit' to quit";

const HELP_TEXT: &str = "\
╔══════════════════════════════════════════════════════════════╗
║                    COMMAND REFERENCE                         ║
╚══════════════════════════════════════════════════════════════╝

┌─ SECURITY COMMANDS
│  changepassword                  - Change application password
└─

┌─ DATABASE CONNECTION
│  connect sqlite <file>           - Connect to SQLite database
│  connect mysql <host> <user> <pass> <db> [port] - Connect to MySQL
│  connect postgresql <host> <user> <pass> <db> [port] - Connect to PostgreSQL
│  disconnect                      - Close the current connection
│  status                          - Show connection status
└─

┌─ SQL COMMANDS
│  Any valid SQL statement ending with semicolon (;)
│  Examples: SELECT, INSERT, UPDATE, DELETE, CREATE, DROP, ALTER
└─

┌─ USER COMMANDS
│  help                            - Show this help
│  history                         - Show query history
│  history clear                   - Clear query history
│  clear                           - Clear terminal screen
│  exit                            - Exit application
└─

┌─ TRANSACTION CONTROL
│  commit                          - Commit current transaction
│  rollback                        - Rollback current transaction
│  autocommit on/off               - Toggle auto-commit mode
└─

┌─ SHORTCUT COMMANDS
│  \\dt                             - Show all tables
│  \\d <table_name>                 - Describe table structure
└─

┌─ EXPORT COMMANDS
│  export csv <filename>           - Export last query to CSV
│  export txt <filename>           - Export last query to TXT
└─

┌─ EXAMPLES
│  connect sqlite test.db
│  CREATE TABLE users (id INTEGER, name TEXT);
│  INSERT INTO users VALUES (1, 'Alice');
│  SELECT * FROM users;
└─";

const HISTORY_BANNER: &str = "\
╔══════════════════════════════════════════════════════════════╗
║                    QUERY HISTORY                             ║
╚══════════════════════════════════════════════════════════════╝";

const HISTORY_FOOTER: &str = "\
╔══════════════════════════════════════════════════════════════╗
║           End of Query History                               ║
╚══════════════════════════════════════════════════════════════╝";

/// Queries longer than this are cut in the history listing.
const HISTORY_QUERY_WIDTH: usize = 50;

/// Drives one operator session.
pub struct Dispatcher<T: Terminal> {
    terminal: T,
    state: SessionState,
    history: HistoryRecorder,
    passwords: PasswordStore,
}

impl<T: Terminal> Dispatcher<T> {
    pub fn new(terminal: T, history: HistoryRecorder, passwords: PasswordStore) -> Self {
        Self {
            terminal,
            state: SessionState::default(),
            history,
            passwords,
        }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Row set of the most recent data-returning statement.
    pub fn last_rows(&self) -> Option<&RowSet> {
        self.state.last_rows.as_ref()
    }

    /// Run the read-eval-print loop until `exit` or end of input.
    pub async fn run(&mut self) {
        self.terminal.write_line(WELCOME);
        self.state.running = true;

        while self.state.running {
            let prompt = self.state.prompt();
            match self.terminal.read_line(prompt) {
                InputEvent::Line(line) => {
                    if self.submit(&line).await == Outcome::Exit {
                        self.state.running = false;
                    }
                }
                InputEvent::Interrupted => self.terminal.write_line("\nUse 'exit' to quit"),
                InputEvent::Eof => {
                    self.terminal.write_line("\nGoodbye!");
                    self.state.running = false;
                }
            }
        }

        self.shutdown().await;
    }

    /// Handle one line of operator input.
    ///
    /// SQL without a trailing `;` reads continuation lines from the terminal
    /// until one ends with `;`.
    pub async fn submit(&mut self, raw_input: &str) -> Outcome {
        let input = raw_input.trim();
        if input.is_empty() {
            return Outcome::Continue;
        }
        self.terminal.add_history(input);

        if let Some(command) = MetaCommand::parse(input) {
            debug!(command = ?command, "Meta-command");
            return self.handle_command(command).await;
        }

        let Some(query) = self.read_statement(input) else {
            return Outcome::Continue;
        };
        // Failures are already reported to the operator
        let _ = self.execute_query(&query).await;
        Outcome::Handled
    }

    /// Accumulate lines until the statement ends with `;`.
    fn read_statement(&mut self, first_line: &str) -> Option<String> {
        if first_line.ends_with(';') {
            return Some(first_line.to_string());
        }

        let mut lines = vec![first_line.to_string()];
        loop {
            match self.terminal.read_line(CONTINUATION_PROMPT) {
                InputEvent::Line(line) => {
                    let done = line.trim().ends_with(';');
                    lines.push(line);
                    if done {
                        return Some(lines.join("\n"));
                    }
                }
                InputEvent::Interrupted => {
                    self.terminal.write_line("\nQuery cancelled");
                    return None;
                }
                InputEvent::Eof => return None,
            }
        }
    }

    /// Run one SQL statement typed by the operator.
    pub async fn execute_query(&mut self, query: &str) -> DbResult<QueryOutcome> {
        self.execute_with(query, StatementKind::classify(query), true)
            .await
    }

    async fn execute_with(
        &mut self,
        query: &str,
        kind: StatementKind,
        guarded: bool,
    ) -> DbResult<QueryOutcome> {
        if !self.state.is_connected() {
            self.terminal.write_line(&not_connected_block());
            return Err(DbError::NotConnected);
        }

        if guarded {
            if let Err(e) = guard::check(query, &mut self.terminal) {
                self.terminal.write_line(
                    &StatusBlock::new("Operation Cancelled")
                        .field("Reason", &e)
                        .footer("Query not executed")
                        .render(),
                );
                return Err(e);
            }
        }

        let auto_commit = self.state.auto_commit;
        let Some(conn) = self.state.connection.as_mut() else {
            return Err(DbError::NotConnected);
        };

        let start = Instant::now();
        let result = match kind {
            StatementKind::DataReturning => conn.fetch(query).await.map(QueryOutcome::RowSet),
            StatementKind::Effecting => run_effecting(conn, query, auto_commit)
                .await
                .map(QueryOutcome::Affected),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(outcome) => {
                self.history.record(HistoryEntry::success(
                    query,
                    elapsed,
                    outcome.rows_affected(),
                ));
                self.report_outcome(outcome, elapsed);
                if let QueryOutcome::RowSet(rows) = outcome {
                    self.state.last_rows = Some(rows.clone());
                }
            }
            Err(e) => {
                self.history.record(HistoryEntry::failure(
                    query,
                    elapsed,
                    format!("SQL Error: {}", e),
                ));
                if !e.is_recoverable() {
                    warn!(error = %e, "Connection problem while executing statement");
                }
                self.report_failure(e, elapsed);
            }
        }
        result
    }

    fn report_outcome(&mut self, outcome: &QueryOutcome, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        match outcome {
            QueryOutcome::RowSet(rows) if rows.is_empty() => {
                self.terminal.write_line(&render(&rows.rows, &rows.headers));
            }
            QueryOutcome::RowSet(rows) => {
                let count = rows.row_count();
                self.terminal.write_line(&format!(
                    "\n{}",
                    StatusBlock::new("Query Results")
                        .field("Rows returned", count)
                        .field("Execution time", format!("{:.3} seconds", secs))
                        .footer("Output:")
                ));
                self.terminal.write_line(&render(&rows.rows, &rows.headers));
                self.terminal.write_line(&format!(
                    "\n{}",
                    StatusBlock::new("Query Summary")
                        .field("Status", "Success")
                        .field("Rows", count)
                        .field("Time", format!("{:.3}s", secs))
                        .footer("Complete")
                ));
            }
            QueryOutcome::Affected(count) => {
                self.terminal.write_line(
                    &StatusBlock::new("Query Execution Complete")
                        .field("Status", "Success")
                        .field("Rows affected", count)
                        .field("Execution time", format!("{:.3} seconds", secs))
                        .field("Auto-commit", on_off(self.state.auto_commit))
                        .footer("Operation completed")
                        .render(),
                );
            }
        }
    }

    fn report_failure(&mut self, error: &DbError, elapsed: Duration) {
        let mut block = StatusBlock::new("Query Execution Failed")
            .field("Status", "Error")
            .field("Error", error)
            .field("Time", format!("{:.3}s", elapsed.as_secs_f64()));
        if let Some(suggestion) = error.suggestion() {
            block = block.field("Suggestion", suggestion);
        }
        self.terminal
            .write_line(&block.footer("Query terminated").render());
    }

    async fn handle_command(&mut self, command: MetaCommand) -> Outcome {
        match command {
            MetaCommand::Help => self.terminal.write_line(HELP_TEXT),
            MetaCommand::Exit => {
                self.terminal.write_line(
                    &StatusBlock::new("Session Ending")
                        .field("Status", "Disconnecting...")
                        .field("Message", "Thank you for using SQL CLI")
                        .field("Action", "Closing application")
                        .footer("Goodbye!")
                        .render(),
                );
                return Outcome::Exit;
            }
            MetaCommand::ChangePassword => {
                if let Err(e) = auth::change_password(&mut self.passwords, &mut self.terminal) {
                    info!(error = %e, "Password not changed");
                }
            }
            MetaCommand::History => self.show_history(),
            MetaCommand::HistoryClear => self.clear_history(),
            MetaCommand::Clear => self.terminal.clear_screen(),
            MetaCommand::Status => self.show_status(),
            MetaCommand::ListTables => self.list_tables().await,
            MetaCommand::DescribeTable(table) => self.describe_table(&table).await,
            MetaCommand::Connect(args) => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match ConnectRequest::from_args(&args) {
                    Ok(request) => {
                        let _ = self.connect(&request).await;
                    }
                    Err(e) => self.terminal.write_line(&connect_usage(&e.to_string())),
                }
            }
            MetaCommand::Disconnect => self.disconnect().await,
            MetaCommand::Export(args) => self.export(&args),
            MetaCommand::AutoCommit(enabled) => self.set_auto_commit(enabled),
            MetaCommand::Commit => self.end_transaction(true).await,
            MetaCommand::Rollback => self.end_transaction(false).await,
            MetaCommand::Usage(usage) => self.terminal.write_line(usage),
        }
        Outcome::Handled
    }

    /// Open a connection, replacing the current one only on success.
    pub async fn connect(&mut self, request: &ConnectRequest) -> DbResult<()> {
        let conn = match Connection::connect(request).await {
            Ok(conn) => conn,
            Err(e) => {
                let mut block = StatusBlock::new("Connection Failed").field("Error", &e);
                if let Some(suggestion) = e.suggestion() {
                    block = block.field("Solution", suggestion);
                }
                let footer = if matches!(e, DbError::DependencyMissing { .. }) {
                    "Install required dependencies"
                } else {
                    "Please check connection parameters"
                };
                self.terminal
                    .write_line(&block.field("Status", "Disconnected").footer(footer).render());
                return Err(e);
            }
        };

        self.terminal.write_line(&established_block(&conn));
        if let Some(previous) = self.state.connection.replace(conn) {
            warn!(previous = %previous.parameters(), "Replacing active connection");
            previous.close().await;
        }
        Ok(())
    }

    async fn disconnect(&mut self) {
        match self.state.connection.take() {
            Some(conn) => {
                let dialect = conn.dialect();
                conn.close().await;
                self.terminal.write_line(
                    &StatusBlock::new("Disconnection Complete")
                        .field("Database", dialect)
                        .field("Status", "Disconnected")
                        .footer("Session ended")
                        .render(),
                );
            }
            None => self.terminal.write_line(&not_connected_block()),
        }
    }

    /// Close the connection at the end of the session.
    pub async fn shutdown(&mut self) {
        if let Some(conn) = self.state.connection.take() {
            conn.close().await;
        }
    }

    async fn list_tables(&mut self) {
        let Some(dialect) = self.state.connection.as_ref().map(Connection::dialect) else {
            self.terminal.write_line(&not_connected_block());
            return;
        };
        self.terminal.write_line(
            &StatusBlock::new("Retrieving Table List")
                .field("Database", dialect)
                .field("Status", "Querying...")
                .footer("Processing")
                .render(),
        );
        let _ = self
            .execute_with(dialect.list_tables_sql(), StatementKind::DataReturning, false)
            .await;
    }

    async fn describe_table(&mut self, table: &str) {
        let Some(dialect) = self.state.connection.as_ref().map(Connection::dialect) else {
            self.terminal.write_line(&not_connected_block());
            return;
        };
        self.terminal.write_line(
            &StatusBlock::new(format!("Table Structure: {}", table))
                .field("Database", dialect)
                .field("Status", "Querying...")
                .footer("Processing")
                .render(),
        );
        let sql = dialect.describe_table_sql(table);
        let _ = self
            .execute_with(&sql, StatementKind::DataReturning, false)
            .await;
    }

    fn set_auto_commit(&mut self, enabled: bool) {
        self.state.auto_commit = enabled;
        info!(auto_commit = enabled, "Auto-commit changed");
        let block = if enabled {
            StatusBlock::new("Auto-commit Settings")
                .field("Status", "Enabled")
                .field("Behavior", "Changes are committed immediately")
        } else {
            StatusBlock::new("Auto-commit Settings")
                .field("Status", "Disabled")
                .field("Behavior", "Manual commit required")
                .field("Action", "Use 'commit' or 'rollback'")
        };
        self.terminal
            .write_line(&block.footer("Setting updated").render());
    }

    async fn end_transaction(&mut self, commit: bool) {
        let Some(conn) = self.state.connection.as_mut() else {
            self.terminal.write_line(
                &StatusBlock::new("Transaction Error")
                    .field("Status", "No database connection")
                    .field("Action", "Connect to database first")
                    .footer("Connection required")
                    .render(),
            );
            return;
        };

        let (action, result) = if commit {
            ("Commit", conn.commit().await)
        } else {
            ("Rollback", conn.rollback().await)
        };

        let block = match result {
            Ok(()) => {
                info!(action, "Transaction ended");
                let (outcome, footer) = if commit {
                    ("Changes saved permanently", "Transaction completed")
                } else {
                    ("Changes discarded", "Transaction cancelled")
                };
                StatusBlock::new("Transaction Control")
                    .field("Action", action)
                    .field("Status", "Success")
                    .field("Result", outcome)
                    .footer(footer)
            }
            Err(e) => {
                warn!(action, error = %e, "Transaction control failed");
                StatusBlock::new("Transaction Error")
                    .field("Action", format!("{} failed", action))
                    .field("Error", e)
                    .footer("Please try again")
            }
        };
        self.terminal.write_line(&block.render());
    }

    fn export(&mut self, args: &[String]) {
        let [format_name, filename, ..] = args else {
            self.terminal.write_line("Usage: export <csv|txt> <filename>");
            return;
        };
        let Some(format) = ExportFormat::from_name(format_name) else {
            self.terminal.write_line("Usage: export <csv|txt> <filename>");
            return;
        };
        let Some(rows) = &self.state.last_rows else {
            self.terminal
                .write_line("Export functionality requires previous query results");
            self.terminal
                .write_line("Use: export csv filename.csv  (after running a SELECT query)");
            return;
        };

        let message = match export::export(rows, format, Path::new(filename)) {
            Ok(_) => format!("✓ Results exported to {}", filename),
            Err(e) => format!("✗ {} export failed: {}", format.name(), e),
        };
        self.terminal.write_line(&message);
    }

    fn show_history(&mut self) {
        if self.history.is_empty() {
            self.terminal.write_line(
                &StatusBlock::new("Query History")
                    .field("Status", "No history available")
                    .field("Message", "Start executing queries to build history")
                    .footer("End of history")
                    .render(),
            );
            return;
        }

        let mut out = vec![format!("\n{}", HISTORY_BANNER)];
        for (i, entry) in self.history.recent(DISPLAY_LIMIT).enumerate() {
            out.push(history_entry_block(i + 1, entry));
        }
        out.push(HISTORY_FOOTER.to_string());
        self.terminal.write_line(&out.join("\n"));
    }

    fn clear_history(&mut self) {
        let block = match self.history.clear() {
            Ok(()) => StatusBlock::new("Query History")
                .field("Status", "Cleared")
                .footer("End of history"),
            Err(e) => {
                warn!(error = %e, "Failed to clear history file");
                StatusBlock::new("Query History")
                    .field("Status", "Cleared in memory")
                    .field("Warning", e)
                    .footer("End of history")
            }
        };
        self.terminal.write_line(&block.render());
    }

    fn show_status(&mut self) {
        let block = StatusBlock::new("Session Status");
        let block = match &self.state.connection {
            Some(conn) => {
                let mut block =
                    block.field("Connection", format!("Connected to {}", conn.parameters()));
                if let Some(version) = conn.server_version() {
                    block = block.field("Server version", version);
                }
                block.field(
                    "Transaction",
                    if conn.in_transaction() { "Open" } else { "None" },
                )
            }
            None => block.field("Connection", "Not connected to any database"),
        };
        let block = block
            .field("Auto-commit", on_off(self.state.auto_commit))
            .field("History entries", self.history.len())
            .footer("End of status");
        self.terminal.write_line(&block.render());
    }
}

/// Execute an effecting statement under the current auto-commit mode.
async fn run_effecting(conn: &mut Connection, sql: &str, auto_commit: bool) -> DbResult<u64> {
    if !auto_commit {
        conn.begin().await?;
    }
    let affected = conn.execute(sql).await?;
    if auto_commit {
        conn.commit().await?;
    }
    Ok(affected)
}

fn on_off(enabled: bool) -> &'static str {
    if enabled { "ON" } else { "OFF" }
}

fn not_connected_block() -> String {
    StatusBlock::new("Database Connection Required")
        .field("Status", "Not connected")
        .field("Action", "Use 'connect' command first")
        .footer("Connection needed")
        .render()
}

fn connect_usage(problem: &str) -> String {
    [
        problem,
        "Examples:",
        "  connect sqlite mydb.db",
        "  connect mysql localhost user password database [port]",
        "  connect postgresql localhost user password database [port]",
    ]
    .join("\n")
}

fn established_block(conn: &Connection) -> String {
    let params = conn.parameters();
    let value = |key: &str| params.get(key).unwrap_or_default().to_string();
    let database = match conn.server_version() {
        Some(version) => format!("{} {}", conn.dialect(), version),
        None => conn.dialect().to_string(),
    };

    let block = StatusBlock::new("Connection Established").field("Database", database);
    let block = match conn.dialect() {
        DatabaseType::SQLite => block.field("Path", value("path")),
        DatabaseType::MySQL => block
            .field("Host", format!("{}:{}", value("host"), value("port")))
            .field("User", value("user"))
            .field("Schema", value("database")),
        DatabaseType::PostgreSQL => block
            .field("Host", format!("{}:{}", value("host"), value("port")))
            .field("User", value("user"))
            .field("Database", value("database")),
    };
    block
        .field("Status", "Connected")
        .footer("Ready for queries")
        .render()
}

fn history_entry_block(index: usize, entry: &HistoryEntry) -> String {
    let query = if entry.query_text.chars().count() > HISTORY_QUERY_WIDTH {
        let cut: String = entry.query_text.chars().take(HISTORY_QUERY_WIDTH).collect();
        format!("{}...", cut)
    } else {
        entry.query_text.clone()
    };
    let rows = if entry.rows_affected > 0 {
        entry.rows_affected.to_string()
    } else {
        "N/A".to_string()
    };

    StatusBlock::new(format!("Entry #{}", index))
        .field("Time", entry.timestamp.format("%Y-%m-%dT%H:%M:%S"))
        .field("Status", if entry.is_error() { "ERROR" } else { "SUCCESS" })
        .field("Duration", format!("{:.3}s", entry.duration_seconds))
        .field("Rows", rows)
        .field("Query", query)
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::ScriptedTerminal;
    use chrono::Utc;

    fn dispatcher(lines: &[&str]) -> Dispatcher<ScriptedTerminal> {
        Dispatcher::new(
            ScriptedTerminal::new(lines.iter().copied()),
            HistoryRecorder::in_memory(100),
            PasswordStore::load(std::env::temp_dir().join("sqlexec-unused-password.json")),
        )
    }

    #[test]
    fn test_history_entry_block_truncates_long_queries() {
        let entry = HistoryEntry {
            timestamp: Utc::now(),
            query_text: "SELECT ".to_string() + &"x, ".repeat(30),
            duration_seconds: 0.25,
            rows_affected: 0,
            error: None,
        };
        let block = history_entry_block(1, &entry);
        assert!(block.contains("│  Rows: N/A"));
        assert!(block.contains("│  Duration: 0.250s"));
        assert!(block.contains("│  Status: SUCCESS"));
        let query_line = block.lines().find(|l| l.contains("Query:")).unwrap();
        assert!(query_line.ends_with("..."));
        assert_eq!(query_line.trim_start_matches("│  Query: ").chars().count(), 53);
    }

    #[tokio::test]
    async fn test_empty_input_continues() {
        let mut d = dispatcher(&[]);
        assert_eq!(d.submit("   ").await, Outcome::Continue);
    }

    #[tokio::test]
    async fn test_query_without_connection() {
        let mut d = dispatcher(&[]);
        assert_eq!(d.submit("SELECT 1;").await, Outcome::Handled);
        assert!(d.terminal().output().contains("Database Connection Required"));
        assert!(d.history().is_empty());
        assert!(matches!(
            d.execute_query("SELECT 1;").await,
            Err(DbError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_exit_and_quit() {
        let mut d = dispatcher(&[]);
        assert_eq!(d.submit("exit").await, Outcome::Exit);
        assert_eq!(d.submit("QUIT").await, Outcome::Exit);
    }

    #[tokio::test]
    async fn test_autocommit_toggle() {
        let mut d = dispatcher(&[]);
        d.submit("autocommit off").await;
        assert!(!d.state().auto_commit);
        d.submit("AUTOCOMMIT ON").await;
        assert!(d.state().auto_commit);
    }

    #[tokio::test]
    async fn test_commit_without_connection() {
        let mut d = dispatcher(&[]);
        d.submit("commit").await;
        assert!(d.terminal().output().contains("No database connection"));
    }

    #[tokio::test]
    async fn test_export_without_results() {
        let mut d = dispatcher(&[]);
        d.submit("export csv out.csv").await;
        assert!(d
            .terminal()
            .output()
            .contains("Export functionality requires previous query results"));
    }

    #[tokio::test]
    async fn test_connect_usage_errors() {
        let mut d = dispatcher(&[]);
        d.submit("connect").await;
        d.submit("connect oracle x").await;
        let output = d.terminal().output();
        assert!(output.contains("Usage: connect <db_type> <parameters>"));
        assert!(output.contains("Unknown database type: oracle"));
        assert!(!d.state().is_connected());
    }

    #[tokio::test]
    async fn test_empty_history() {
        let mut d = dispatcher(&[]);
        d.submit("history").await;
        assert!(d.terminal().output().contains("No history available"));
    }
}
