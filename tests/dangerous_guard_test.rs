//! Integration tests for the destructive statement confirmation.
//!
//! These tests verify that DELETE without WHERE and DROP TABLE only run
//! after the operator confirms them.

use serde_json::json;
use sqlexec::auth::PasswordStore;
use sqlexec::error::DbError;
use sqlexec::history::HistoryRecorder;
use sqlexec::models::ConnectRequest;
use sqlexec::session::Dispatcher;
use sqlexec::terminal::ScriptedTerminal;

/// Helper to setup a dispatcher with one populated table.
async fn setup_test_dispatcher() -> Dispatcher<ScriptedTerminal> {
    let mut dispatcher = Dispatcher::new(
        ScriptedTerminal::default(),
        HistoryRecorder::in_memory(100),
        PasswordStore::load(std::env::temp_dir().join("sqlexec_guard_test_unused.json")),
    );
    dispatcher
        .connect(&ConnectRequest::SQLite {
            path: ":memory:".to_string(),
        })
        .await
        .unwrap();
    dispatcher
        .execute_query("CREATE TABLE test_users (id INTEGER PRIMARY KEY, name TEXT);")
        .await
        .expect("Failed to create test table");
    dispatcher
        .execute_query("INSERT INTO test_users VALUES (1, 'a'), (2, 'b');")
        .await
        .expect("Failed to insert test rows");
    dispatcher
}

async fn row_count(d: &mut Dispatcher<ScriptedTerminal>) -> serde_json::Value {
    let outcome = d
        .execute_query("SELECT COUNT(*) FROM test_users;")
        .await
        .unwrap();
    outcome.as_row_set().unwrap().rows[0][0].clone()
}

// =========================================================================
// Declined operations
// =========================================================================

#[tokio::test]
async fn test_delete_all_declined_by_default_answer() {
    let mut d = setup_test_dispatcher().await;
    d.terminal_mut().push_line("");

    let err = d.execute_query("DELETE FROM test_users;").await.unwrap_err();
    assert!(matches!(err, DbError::SafetyVetoed { ref reason } if reason.contains("DELETE")));
    assert_eq!(row_count(&mut d).await, json!(2));
    assert!(d.terminal().output().contains("SECURITY WARNING"));
}

#[tokio::test]
async fn test_drop_table_declined() {
    let mut d = setup_test_dispatcher().await;
    d.terminal_mut().push_line("no");

    let err = d.execute_query("drop table test_users;").await.unwrap_err();
    assert!(matches!(err, DbError::SafetyVetoed { .. }));
    assert_eq!(row_count(&mut d).await, json!(2));
}

#[tokio::test]
async fn test_end_of_input_declines() {
    let mut d = setup_test_dispatcher().await;
    let history_before = d.history().len();

    assert!(d.execute_query("DELETE FROM test_users;").await.is_err());
    assert_eq!(d.history().len(), history_before);
}

// =========================================================================
// Confirmed operations
// =========================================================================

#[tokio::test]
async fn test_delete_all_confirmed() {
    let mut d = setup_test_dispatcher().await;
    d.terminal_mut().push_line("Y");

    d.execute_query("DELETE FROM test_users;").await.unwrap();
    assert_eq!(row_count(&mut d).await, json!(0));
}

#[tokio::test]
async fn test_delete_with_where_never_prompts() {
    let mut d = setup_test_dispatcher().await;

    d.execute_query("DELETE FROM test_users WHERE id = 1;")
        .await
        .unwrap();
    assert!(d.terminal().prompts().is_empty());
    assert_eq!(row_count(&mut d).await, json!(1));
}

#[tokio::test]
async fn test_both_confirmations_required() {
    let mut d = setup_test_dispatcher().await;
    d.execute_query("CREATE TABLE t2 (id INTEGER);").await.unwrap();
    // Matches both rules; the second confirmation is declined
    d.terminal_mut().push_line("yes");
    d.terminal_mut().push_line("n");

    let err = d
        .execute_query("DROP TABLE t2; -- after DELETE")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::SafetyVetoed { ref reason } if reason.contains("DROP TABLE")));
    assert_eq!(d.terminal().prompts().len(), 2);
}
