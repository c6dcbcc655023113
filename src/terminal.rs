//! Operator input and output.
//!
//! Everything the session reads from or writes to the operator goes through
//! the [`Terminal`] trait. The interactive binary uses [`RustylineTerminal`];
//! tests drive sessions with [`ScriptedTerminal`].

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use tracing::warn;

/// One read from the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D or closed input
    Eof,
}

impl InputEvent {
    /// The line read, if any.
    pub fn into_line(self) -> Option<String> {
        match self {
            Self::Line(line) => Some(line),
            Self::Interrupted | Self::Eof => None,
        }
    }
}

pub trait Terminal {
    /// Read one line of input after showing `prompt`.
    fn read_line(&mut self, prompt: &str) -> InputEvent;

    /// Read one line without echoing it.
    fn read_secret(&mut self, prompt: &str) -> InputEvent;

    fn write_line(&mut self, text: &str);

    fn clear_screen(&mut self);

    /// Remember a submitted command for line-editing recall.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive terminal with line editing and hidden password input.
pub struct RustylineTerminal {
    editor: DefaultEditor,
}

impl RustylineTerminal {
    pub fn new() -> Result<Self, ReadlineError> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Terminal for RustylineTerminal {
    fn read_line(&mut self, prompt: &str) -> InputEvent {
        match self.editor.readline(prompt) {
            Ok(line) => InputEvent::Line(line),
            Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
            Err(ReadlineError::Eof) => InputEvent::Eof,
            Err(e) => {
                warn!(error = %e, "Error reading input");
                InputEvent::Eof
            }
        }
    }

    fn read_secret(&mut self, prompt: &str) -> InputEvent {
        match rpassword::prompt_password(prompt) {
            Ok(line) => InputEvent::Line(line),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => InputEvent::Interrupted,
            Err(e) => {
                warn!(error = %e, "Error reading password");
                InputEvent::Eof
            }
        }
    }

    fn write_line(&mut self, text: &str) {
        println!("{}", text);
    }

    fn clear_screen(&mut self) {
        if let Err(e) = self.editor.clear_screen() {
            warn!(error = %e, "Failed to clear screen");
        }
    }

    fn add_history(&mut self, line: &str) {
        self.editor.add_history_entry(line).ok();
    }
}

/// Terminal fed from a fixed script, capturing everything written.
///
/// Secrets are read from the same queue as lines. Once the script runs out
/// every read returns [`InputEvent::Eof`].
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    inputs: VecDeque<InputEvent>,
    prompts: Vec<String>,
    output: Vec<String>,
    clears: usize,
}

impl ScriptedTerminal {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: lines
                .into_iter()
                .map(|line| InputEvent::Line(line.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Queue another line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.inputs.push_back(InputEvent::Line(line.into()));
    }

    /// Queue a Ctrl-C.
    pub fn push_interrupt(&mut self) {
        self.inputs.push_back(InputEvent::Interrupted);
    }

    /// Every prompt shown so far, in order.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Everything written so far as one string.
    pub fn output(&self) -> String {
        self.output.join("\n")
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }

    fn next(&mut self, prompt: &str) -> InputEvent {
        self.prompts.push(prompt.to_string());
        self.inputs.pop_front().unwrap_or(InputEvent::Eof)
    }
}

impl Terminal for ScriptedTerminal {
    fn read_line(&mut self, prompt: &str) -> InputEvent {
        self.next(prompt)
    }

    fn read_secret(&mut self, prompt: &str) -> InputEvent {
        self.next(prompt)
    }

    fn write_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn clear_screen(&mut self) {
        self.clears += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_terminal_replays_and_ends() {
        let mut term = ScriptedTerminal::new(["one", "two"]);
        term.push_interrupt();

        assert_eq!(term.read_line("a> "), InputEvent::Line("one".into()));
        assert_eq!(term.read_secret("b> "), InputEvent::Line("two".into()));
        assert_eq!(term.read_line("c> "), InputEvent::Interrupted);
        assert_eq!(term.read_line("d> "), InputEvent::Eof);
        assert_eq!(term.prompts(), ["a> ", "b> ", "c> ", "d> "]);
    }

    #[test]
    fn test_scripted_terminal_captures_output() {
        let mut term = ScriptedTerminal::default();
        term.write_line("hello");
        term.write_line("world");
        term.clear_screen();
        assert_eq!(term.output(), "hello\nworld");
        assert_eq!(term.clear_count(), 1);
    }

    #[test]
    fn test_into_line() {
        assert_eq!(InputEvent::Line("x".into()).into_line(), Some("x".into()));
        assert_eq!(InputEvent::Eof.into_line(), None);
    }
}
