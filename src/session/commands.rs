//! Meta-command recognition.
//!
//! The first word selects the command case-insensitively; arguments keep
//! their case. Input whose first word is not a command keyword, or that
//! gives arguments to a command taking none, is SQL.

/// A session directive typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    Exit,
    ChangePassword,
    History,
    HistoryClear,
    Clear,
    Status,
    /// `\dt`
    ListTables,
    /// `\d <table>`
    DescribeTable(String),
    /// `connect <dialect> <params...>`, validated when run
    Connect(Vec<String>),
    Disconnect,
    /// `export <csv|txt> <filename>`, validated when run
    Export(Vec<String>),
    AutoCommit(bool),
    Commit,
    Rollback,
    /// A recognized keyword with unusable arguments
    Usage(&'static str),
}

impl MetaCommand {
    /// Recognize a meta-command, or `None` if the input is SQL.
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();
        let keyword = words.next()?.to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (keyword.as_str(), args.as_slice()) {
            ("help", []) => Self::Help,
            ("exit" | "quit", []) => Self::Exit,
            ("changepassword", []) => Self::ChangePassword,
            ("history", []) => Self::History,
            ("history", [sub]) if sub.eq_ignore_ascii_case("clear") => Self::HistoryClear,
            ("clear", []) => Self::Clear,
            ("status", []) => Self::Status,
            ("disconnect", []) => Self::Disconnect,
            ("commit", []) => Self::Commit,
            ("rollback", []) => Self::Rollback,
            ("\\dt", _) => Self::ListTables,
            ("\\d", [table]) => Self::DescribeTable(table.to_string()),
            ("\\d", _) => Self::Usage("Usage: \\d <table_name>"),
            ("connect", args) => Self::Connect(args.iter().map(|s| s.to_string()).collect()),
            ("export", args) => Self::Export(args.iter().map(|s| s.to_string()).collect()),
            ("autocommit", [mode]) if mode.eq_ignore_ascii_case("on") => Self::AutoCommit(true),
            ("autocommit", [mode]) if mode.eq_ignore_ascii_case("off") => {
                Self::AutoCommit(false)
            }
            ("autocommit", _) => Self::Usage("Usage: autocommit on|off"),
            _ => return None,
        };
        Some(command)
    }
}
