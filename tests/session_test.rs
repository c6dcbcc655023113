//! Integration tests for the interactive session.
//!
//! These tests drive the dispatcher with a scripted terminal against
//! in-memory SQLite databases.

use serde_json::json;
use sqlexec::auth::PasswordStore;
use sqlexec::error::DbError;
use sqlexec::history::HistoryRecorder;
use sqlexec::models::{ConnectRequest, QueryOutcome};
use sqlexec::session::{Dispatcher, Outcome};
use sqlexec::terminal::ScriptedTerminal;
use tempfile::TempDir;

/// Helper to build a dispatcher whose files live in a fresh directory.
fn setup_dispatcher(lines: &[&str]) -> (Dispatcher<ScriptedTerminal>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let history = HistoryRecorder::load(dir.path().join("query_history.json"), 100);
    let passwords = PasswordStore::load(dir.path().join("sql_cli_config.json"));
    let terminal = ScriptedTerminal::new(lines.iter().copied());
    (Dispatcher::new(terminal, history, passwords), dir)
}

/// Helper to build a dispatcher connected to an in-memory database.
async fn setup_connected() -> (Dispatcher<ScriptedTerminal>, TempDir) {
    let (mut dispatcher, dir) = setup_dispatcher(&[]);
    dispatcher
        .connect(&memory_request())
        .await
        .expect("Failed to connect to in-memory SQLite");
    (dispatcher, dir)
}

fn memory_request() -> ConnectRequest {
    ConnectRequest::SQLite {
        path: ":memory:".to_string(),
    }
}

// =========================================================================
// Query execution
// =========================================================================

#[tokio::test]
async fn test_create_insert_select_scenario() {
    let (mut d, _dir) = setup_connected().await;

    let created = d
        .execute_query("CREATE TABLE t (id INTEGER);")
        .await
        .unwrap();
    assert_eq!(created, QueryOutcome::Affected(0));
    assert_eq!(d.history().len(), 1);

    let inserted = d.execute_query("INSERT INTO t VALUES (1);").await.unwrap();
    assert_eq!(inserted, QueryOutcome::Affected(1));
    assert_eq!(d.history().len(), 2);

    let selected = d.execute_query("SELECT * FROM t;").await.unwrap();
    let rows = selected.as_row_set().expect("SELECT returns rows");
    assert_eq!(rows.headers, vec!["id".to_string()]);
    assert_eq!(rows.rows, vec![vec![json!(1)]]);
    assert_eq!(d.history().len(), 3);

    let output = d.terminal().output();
    assert!(output.contains("Query Execution Complete"));
    assert!(output.contains("Rows returned: 1"));
    assert!(output.contains("│id"));
}

#[tokio::test]
async fn test_empty_select_prints_no_rows_block() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();
    d.terminal_mut().clear_output();

    let outcome = d.execute_query("SELECT * FROM t;").await.unwrap();
    let rows = outcome.as_row_set().unwrap();
    assert!(rows.is_empty());
    assert_eq!(rows.headers, vec!["id".to_string()]);
    assert!(d.terminal().output().contains("No rows found"));
}

#[tokio::test]
async fn test_failed_statement_is_recorded() {
    let (mut d, _dir) = setup_connected().await;

    let err = d.execute_query("SELECT * FROM missing;").await.unwrap_err();
    assert!(err.is_execution_attempt());
    assert!(d.state().is_connected());

    let entry = d.history().recent(1).next().unwrap();
    assert!(entry.is_error());
    assert!(entry.error.as_deref().unwrap().starts_with("SQL Error:"));
    assert_eq!(entry.rows_affected, 0);
    assert!(d.terminal().output().contains("Query Execution Failed"));
}

#[tokio::test]
async fn test_multiline_statement() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();
    d.terminal_mut().push_line("INTO t");
    d.terminal_mut().push_line("VALUES (7);");

    assert_eq!(d.submit("INSERT").await, Outcome::Handled);
    assert!(d.terminal().prompts().iter().all(|p| p == "...> "));

    let entry = d.history().recent(1).next().unwrap();
    assert_eq!(entry.query_text, "INSERT\nINTO t\nVALUES (7);");
    assert_eq!(entry.rows_affected, 1);
}

#[tokio::test]
async fn test_cancelled_continuation_records_nothing() {
    let (mut d, _dir) = setup_connected().await;
    d.terminal_mut().push_line("FROM sqlite_master");
    d.terminal_mut().push_interrupt();

    assert_eq!(d.submit("SELECT name").await, Outcome::Continue);
    assert!(d.history().is_empty());
    assert!(d.terminal().output().contains("Query cancelled"));
}

// =========================================================================
// Safety gate
// =========================================================================

#[tokio::test]
async fn test_declined_delete_is_not_executed() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();
    d.execute_query("INSERT INTO t VALUES (1);").await.unwrap();
    d.execute_query("SELECT * FROM t;").await.unwrap();

    d.terminal_mut().push_line("n");
    let err = d.execute_query("DELETE FROM t;").await.unwrap_err();
    assert!(matches!(err, DbError::SafetyVetoed { .. }));
    assert_eq!(d.history().len(), 3);

    let remaining = d.execute_query("SELECT COUNT(*) AS n FROM t;").await.unwrap();
    assert_eq!(remaining.as_row_set().unwrap().rows, vec![vec![json!(1)]]);
    assert!(d.terminal().output().contains("Operation Cancelled"));
}

#[tokio::test]
async fn test_confirmed_drop_table_runs() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();

    d.terminal_mut().push_line("yes");
    d.execute_query("DROP TABLE t;").await.unwrap();

    d.submit("\\dt").await;
    assert!(d.last_rows().unwrap().is_empty());
}

// =========================================================================
// Meta-commands
// =========================================================================

#[tokio::test]
async fn test_list_and_describe_tables() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);")
        .await
        .unwrap();

    d.submit("\\dt").await;
    assert_eq!(d.last_rows().unwrap().rows, vec![vec![json!("users")]]);

    d.submit("\\d users").await;
    let described = d.last_rows().unwrap();
    assert!(described.headers.contains(&"name".to_string()));
    assert!(described.headers.contains(&"type".to_string()));
    assert_eq!(described.row_count(), 2);
    assert!(d.terminal().output().contains("Table Structure: users"));
}

#[tokio::test]
async fn test_history_listing() {
    let (mut d, _dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();
    let _ = d.execute_query("SELEC 1;").await;
    d.terminal_mut().clear_output();

    d.submit("history").await;
    let output = d.terminal().output();
    assert!(output.contains("QUERY HISTORY"));
    assert!(output.contains("Entry #1"));
    assert!(output.contains("Entry #2"));
    assert!(output.contains("Status: SUCCESS"));
    assert!(output.contains("Status: ERROR"));

    d.submit("history clear").await;
    assert!(d.history().is_empty());
}

#[tokio::test]
async fn test_history_survives_restart() {
    let (mut d, dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();
    d.shutdown().await;

    let reloaded = HistoryRecorder::load(dir.path().join("query_history.json"), 100);
    assert_eq!(reloaded.len(), 1);
    assert_eq!(
        reloaded.recent(1).next().unwrap().query_text,
        "CREATE TABLE t (id INTEGER);"
    );
}

#[tokio::test]
async fn test_status_and_clear() {
    let (mut d, _dir) = setup_connected().await;
    d.submit("status").await;
    d.submit("clear").await;

    assert!(d.terminal().output().contains("Connected to SQLite"));
    assert_eq!(d.terminal().clear_count(), 1);
}

// =========================================================================
// Connections
// =========================================================================

#[tokio::test]
async fn test_connect_command_replaces_connection() {
    let (mut d, _dir) = setup_dispatcher(&[]);
    d.submit("connect sqlite :memory:").await;
    assert!(d.state().is_connected());
    d.execute_query("CREATE TABLE old_table (id INTEGER);")
        .await
        .unwrap();

    d.submit("connect SQLite :memory:").await;
    d.submit("\\dt").await;
    assert!(d.last_rows().unwrap().is_empty());
    assert_eq!(
        d.terminal().output().matches("Connection Established").count(),
        2
    );
}

#[tokio::test]
async fn test_failed_connect_keeps_current_connection() {
    let (mut d, dir) = setup_connected().await;
    d.execute_query("CREATE TABLE t (id INTEGER);").await.unwrap();

    let bad_path = dir.path().join("missing").join("db.sqlite");
    let request = ConnectRequest::SQLite {
        path: bad_path.display().to_string(),
    };
    let err = d.connect(&request).await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(d.terminal().output().contains("Connection Failed"));

    // Still talking to the original database
    d.execute_query("SELECT * FROM t;").await.unwrap();
}

#[tokio::test]
async fn test_disconnect() {
    let (mut d, _dir) = setup_connected().await;
    d.submit("disconnect").await;
    assert!(!d.state().is_connected());

    let err = d.execute_query("SELECT 1;").await.unwrap_err();
    assert!(matches!(err, DbError::NotConnected));
    assert!(d.history().is_empty());
}

// =========================================================================
// REPL loop
// =========================================================================

#[tokio::test]
async fn test_run_until_exit() {
    let (mut d, _dir) = setup_dispatcher(&[
        "connect sqlite :memory:",
        "CREATE TABLE t (id INTEGER);",
        "exit",
        "SELECT 1;",
    ]);
    d.run().await;

    let prompts = d.terminal().prompts();
    assert_eq!(prompts[0], "✗sql> ");
    assert_eq!(prompts[1], "✓sql> ");
    assert_eq!(prompts.len(), 3);
    assert_eq!(d.history().len(), 1);
    assert!(!d.state().is_connected());
    assert!(d.terminal().output().contains("Session Ending"));
}

#[tokio::test]
async fn test_run_interrupt_then_eof() {
    let (mut d, _dir) = setup_dispatcher(&[]);
    d.terminal_mut().push_interrupt();
    d.run().await;

    let output = d.terminal().output();
    assert!(output.contains("Use 'exit' to quit"));
    assert!(output.contains("Goodbye!"));
    assert_eq!(d.terminal().prompts().len(), 2);
}
