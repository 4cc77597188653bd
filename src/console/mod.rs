//! Storage console
//!
//! Line-oriented commands over the bundle's mount manager, used by the binary.

pub mod commands;
pub mod handlers;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::handle_command;
