//! sqlexec - Main entry point.
//!
//! Authenticates the operator, optionally connects to the database given on
//! the command line, then runs the interactive session.

use sqlexec::auth::{self, PasswordStore};
use sqlexec::config::Config;
use sqlexec::history::HistoryRecorder;
use sqlexec::session::Dispatcher;
use sqlexec::terminal::RustylineTerminal;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr so they never interleave with query output.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let mut config = Config::parse_args();

    // Initialize logging
    init_tracing(&config);

    info!("Starting sqlexec v{}", env!("CARGO_PKG_VERSION"));

    let mut terminal = match RustylineTerminal::new() {
        Ok(terminal) => terminal,
        Err(e) => {
            error!(error = %e, "Terminal unavailable");
            eprintln!("Error: cannot open an interactive terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut passwords = PasswordStore::load(config.config_file.clone());
    if let Err(e) = auth::authenticate(&mut passwords, &mut terminal) {
        error!(error = %e, "Authentication failed");
        return ExitCode::FAILURE;
    }

    let history = HistoryRecorder::load(config.history_file.clone(), config.history_limit);
    info!(
        password_file = %passwords.path().display(),
        history_file = ?history.path(),
        history_entries = history.len(),
        "Session state loaded"
    );
    let mut dispatcher = Dispatcher::new(terminal, history, passwords);

    match config.take_connect_request() {
        Some(Ok(request)) => {
            // Failures are reported in the session; the operator can retry
            let _ = dispatcher.connect(&request).await;
        }
        Some(Err(e)) => {
            error!(error = %e, "Invalid --database value");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
        None => {}
    }

    dispatcher.run().await;

    info!("Session finished");
    ExitCode::SUCCESS
}
