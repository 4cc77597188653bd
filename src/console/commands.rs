//! Module `commands`
//!
//! Defines the console commands understood by the binary, their parsing and
//! the result structures returned by their handlers.

/// Represents a console command parsed from one input line.
///
/// Path arguments use the mount manager's `prefix://path` form.
#[derive(Debug, PartialEq)]
pub enum Command {
    Quit,
    Help,
    Storages,
    Mounts,
    Resolve(String),     // Resolve a storage by name
    List(String),        // List a directory
    Cat(String),         // Print a file
    Put(String, String), // Write text to a file
    Rm(String),          // Delete a file
    Exists(String),
    Cp(String, String),
    Mv(String, String),
    Unknown(String),
}

/// Represents the outcome status of executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    Close,
}

/// Struct encapsulating the full result of a command execution.
#[derive(Debug)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: Some(message.into()),
        }
    }

    pub fn failure(reason: impl ToString) -> Self {
        let reason = reason.to_string();
        Self {
            message: Some(format!("ERR {}", reason)),
            status: CommandStatus::Failure(reason),
        }
    }
}

fn split_pair(arg: &str) -> Option<(String, String)> {
    let mut parts = arg.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let second = parts.next().unwrap_or("").trim();
    if first.is_empty() || second.is_empty() {
        None
    } else {
        Some((first.to_string(), second.to_string()))
    }
}

/// Parses a raw input line into the `Command` enum.
///
/// Validates required arguments and returns `Unknown` if a known command is
/// misused.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();

    match cmd.as_str() {
        "QUIT" | "Q" => Command::Quit,
        "HELP" => Command::Help,
        "STORAGES" => Command::Storages,
        "MOUNTS" => Command::Mounts,
        "RESOLVE" if !arg.is_empty() => Command::Resolve(arg.to_string()),
        "LS" if !arg.is_empty() => Command::List(arg.to_string()),
        "CAT" if !arg.is_empty() => Command::Cat(arg.to_string()),
        "RM" if !arg.is_empty() => Command::Rm(arg.to_string()),
        "EXISTS" if !arg.is_empty() => Command::Exists(arg.to_string()),
        "PUT" => match split_pair(arg) {
            Some((path, text)) => Command::Put(path, text),
            None => Command::Unknown(trimmed.to_string()),
        },
        "CP" => match split_pair(arg) {
            Some((from, to)) => Command::Cp(from, to),
            None => Command::Unknown(trimmed.to_string()),
        },
        "MV" => match split_pair(arg) {
            Some((from, to)) => Command::Mv(from, to),
            None => Command::Unknown(trimmed.to_string()),
        },
        _ => Command::Unknown(trimmed.to_string()),
    }
}
