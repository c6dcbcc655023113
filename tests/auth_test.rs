//! Integration tests for the password gate and password changes.

use sqlexec::auth::{self, PasswordStore};
use sqlexec::history::HistoryRecorder;
use sqlexec::session::Dispatcher;
use sqlexec::terminal::ScriptedTerminal;

#[test]
fn test_first_run_then_login() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sql_cli_config.json");

    let mut store = PasswordStore::load(path.clone());
    let mut terminal = ScriptedTerminal::new(["opensesame", "opensesame"]);
    auth::authenticate(&mut store, &mut terminal).unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["setup_complete"], true);
    assert_eq!(
        saved["password_hash"],
        serde_json::json!(auth::hash_password("opensesame"))
    );

    let mut store = PasswordStore::load(path);
    let mut terminal = ScriptedTerminal::new(["opensesame"]);
    auth::authenticate(&mut store, &mut terminal).unwrap();
}

#[tokio::test]
async fn test_changepassword_command() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sql_cli_config.json");
    let mut store = PasswordStore::load(path.clone());
    store.set_password("opensesame").unwrap();

    let terminal = ScriptedTerminal::new(["opensesame", "newsecret", "newsecret"]);
    let mut d = Dispatcher::new(terminal, HistoryRecorder::in_memory(100), store);
    d.submit("changepassword").await;
    assert!(d.terminal().output().contains("Password Changed"));

    let reloaded = PasswordStore::load(path);
    assert!(reloaded.verify("newsecret"));
    assert!(!reloaded.verify("opensesame"));
}
