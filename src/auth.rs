//! Operator authentication.
//!
//! A single local password protects the client. Its SHA-256 digest is kept in
//! a JSON file next to the working directory; the first run asks the operator
//! to choose one.

use crate::error::{DbError, DbResult};
use crate::session::format::StatusBlock;
use crate::terminal::Terminal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{info, warn};

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Failed attempts allowed before the session is refused.
pub const MAX_ATTEMPTS: u32 = 3;

const BANNER: &str = "\
╔══════════════════════════════════════════════════════════════╗
║                 SQL CLI - AUTHENTICATION                     ║
║                 Professional Database Tool                   ║
╚══════════════════════════════════════════════════════════════╝";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication cancelled by user")]
    Cancelled,

    #[error("Maximum authentication attempts reached")]
    LockedOut,

    #[error("No password set yet")]
    NotSetUp,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error(transparent)]
    Persistence(#[from] DbError),
}

/// On-disk password configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub setup_complete: bool,
}

/// File-backed password hash.
#[derive(Debug)]
pub struct PasswordStore {
    path: PathBuf,
    config: AuthConfig,
}

impl PasswordStore {
    /// Load the password file. Missing or corrupt files mean "not set up".
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring corrupt password file");
                AuthConfig::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AuthConfig::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read password file");
                AuthConfig::default()
            }
        };
        Self { path, config }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_setup(&self) -> bool {
        self.config.setup_complete && self.config.password_hash.is_some()
    }

    /// Check `password` against the stored digest.
    pub fn verify(&self, password: &str) -> bool {
        match &self.config.password_hash {
            Some(expected) => {
                constant_time_eq(hash_password(password).as_bytes(), expected.as_bytes())
            }
            None => false,
        }
    }

    /// Store a new password and persist it.
    pub fn set_password(&mut self, password: &str) -> DbResult<()> {
        validate_password(password)?;
        self.config.password_hash = Some(hash_password(password));
        self.config.setup_complete = true;
        self.save()?;
        info!("Password updated");
        Ok(())
    }

    fn save(&self) -> DbResult<()> {
        let json = serde_json::to_string_pretty(&self.config)
            .map_err(|e| DbError::persistence("password configuration", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| DbError::persistence("password configuration", e))
    }
}

/// Lowercase hex SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn validate_password(password: &str) -> DbResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DbError::invalid_input(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Gate the session behind the operator password.
///
/// Runs first-time setup when no password is stored yet.
pub fn authenticate(
    store: &mut PasswordStore,
    terminal: &mut dyn Terminal,
) -> Result<(), AuthError> {
    if !store.is_setup() {
        return setup_password(store, terminal);
    }

    terminal.write_line(BANNER);

    for attempt in 1..=MAX_ATTEMPTS {
        terminal.write_line(
            &StatusBlock::new("Authentication Required")
                .field("Attempt", format!("{} of {}", attempt, MAX_ATTEMPTS))
                .render(),
        );
        let Some(password) = terminal.read_secret("│  Enter password: ").into_line() else {
            terminal.write_line(&cancelled_block("Authentication Cancelled"));
            return Err(AuthError::Cancelled);
        };

        if store.verify(&password) {
            terminal.write_line(
                &StatusBlock::new("Authentication Success")
                    .field("Status", "Access granted")
                    .field("Welcome", "Authorized user")
                    .footer("Loading application")
                    .render(),
            );
            info!(attempt, "Authenticated");
            return Ok(());
        }

        let remaining = MAX_ATTEMPTS - attempt;
        warn!(attempt, remaining, "Authentication failed");
        let block = if remaining > 0 {
            StatusBlock::new("Authentication Failed")
                .field("Error", "Invalid password")
                .field("Attempts remaining", remaining)
                .footer("Please try again")
        } else {
            StatusBlock::new("Authentication Failed")
                .field("Error", "Too many failed attempts")
                .footer("Access denied")
        };
        terminal.write_line(&block.render());
    }

    terminal.write_line(
        &StatusBlock::new("Security Alert")
            .field("Status", "Maximum authentication attempts reached")
            .field("Action", "Application terminated for security")
            .footer("Exiting")
            .render(),
    );
    Err(AuthError::LockedOut)
}

/// First-run password setup.
fn setup_password(
    store: &mut PasswordStore,
    terminal: &mut dyn Terminal,
) -> Result<(), AuthError> {
    terminal.write_line(
        &StatusBlock::new("Security Setup")
            .field("Action", "Set administrator password")
            .field("Purpose", "Protect application access")
            .field("Requirement", format!("Minimum {} characters", MIN_PASSWORD_LEN))
            .footer("Please configure")
            .render(),
    );

    let Some(password) =
        read_new_password(terminal, "┌─ Enter new password: ", "┌─ Confirm password: ")
    else {
        terminal.write_line(&cancelled_block("Setup Cancelled"));
        return Err(AuthError::Cancelled);
    };

    if let Err(e) = store.set_password(&password) {
        terminal.write_line(
            &StatusBlock::new("Setup Error")
                .field("Error", "Failed to save configuration")
                .field("Action", "Please check file permissions")
                .footer("Setup failed")
                .render(),
        );
        return Err(e.into());
    }

    terminal.write_line(
        &StatusBlock::new("Setup Complete")
            .field("Status", "Password configured successfully")
            .field("Security", "Application is now protected")
            .footer("Setup finished")
            .render(),
    );
    Ok(())
}

/// Re-verify the current password, then store a new one.
pub fn change_password(
    store: &mut PasswordStore,
    terminal: &mut dyn Terminal,
) -> Result<(), AuthError> {
    if !store.is_setup() {
        terminal.write_line(
            &StatusBlock::new("Password Change")
                .field("Error", "No password set yet")
                .field("Action", "Run setup first")
                .footer("Setup required")
                .render(),
        );
        return Err(AuthError::NotSetUp);
    }

    terminal.write_line(
        &StatusBlock::new("Password Change")
            .field("Action", "Verify current password")
            .footer("Authentication required")
            .render(),
    );

    let Some(current) = terminal.read_secret("│  Enter current password: ").into_line() else {
        terminal.write_line(&cancelled_block("Password Change Cancelled"));
        return Err(AuthError::Cancelled);
    };
    if !store.verify(&current) {
        warn!("Password change rejected: current password incorrect");
        terminal.write_line(
            &StatusBlock::new("Password Change")
                .field("Error", "Current password is incorrect")
                .footer("Change cancelled")
                .render(),
        );
        return Err(AuthError::IncorrectPassword);
    }
    terminal.write_line("│  Status: Current password verified\n└─ Set new password");

    let Some(password) = read_new_password(
        terminal,
        "│  Enter new password: ",
        "│  Confirm new password: ",
    ) else {
        terminal.write_line(&cancelled_block("Password Change Cancelled"));
        return Err(AuthError::Cancelled);
    };

    if let Err(e) = store.set_password(&password) {
        terminal.write_line(
            &StatusBlock::new("Password Change")
                .field("Error", "Failed to save new password")
                .footer("Change failed")
                .render(),
        );
        return Err(e.into());
    }

    terminal.write_line(
        &StatusBlock::new("Password Changed")
            .field("Status", "Success")
            .field("Security", "Password updated")
            .footer("Change complete")
            .render(),
    );
    Ok(())
}

/// Prompt until a long-enough password is entered twice.
///
/// `None` when the operator interrupts or input ends.
fn read_new_password(
    terminal: &mut dyn Terminal,
    prompt: &str,
    confirm_prompt: &str,
) -> Option<String> {
    loop {
        let password = terminal.read_secret(prompt).into_line()?;
        if let Err(e) = validate_password(&password) {
            terminal.write_line(&format!("│  Error: {}\n└─ Please try again", error_message(&e)));
            continue;
        }

        let confirm = terminal.read_secret(confirm_prompt).into_line()?;
        if password != confirm {
            terminal.write_line("│  Error: Passwords do not match\n└─ Please try again");
            continue;
        }
        return Some(password);
    }
}

fn error_message(error: &DbError) -> String {
    match error {
        DbError::InvalidInput { message } => message.clone(),
        other => other.to_string(),
    }
}

fn cancelled_block(title: &str) -> String {
    StatusBlock::new(title)
        .field("Action", "Cancelled by user")
        .footer("Exiting")
        .render()
}
