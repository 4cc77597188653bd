//! Command handlers module for the storage console.
//!
//! Each handler runs one command against the bundle and turns the outcome
//! into a `CommandResult`. Handlers block on storage I/O and are run off the
//! async runtime by the caller.

use log::{info, warn};

use crate::bundle::StorageBundle;
use crate::console::commands::{Command, CommandResult, CommandStatus};
use crate::registry::StorageEntry;

const HELP: &str = "\
STORAGES                 list registered storages
MOUNTS                   list mount prefixes
RESOLVE <name>           resolve a storage by name
LS <prefix://dir>        list a directory
CAT <prefix://file>      print a file
PUT <prefix://file> <text>
RM <prefix://file>
EXISTS <prefix://path>
CP <from> <to>
MV <from> <to>
QUIT";

/// Dispatches a parsed command to its handler.
pub fn handle_command(bundle: &StorageBundle, command: &Command) -> CommandResult {
    match command {
        Command::Quit => CommandResult {
            status: CommandStatus::Close,
            message: Some("Bye".into()),
        },
        Command::Help => CommandResult::success(HELP),
        Command::Storages => handle_cmd_storages(bundle),
        Command::Mounts => handle_cmd_mounts(bundle),
        Command::Resolve(name) => handle_cmd_resolve(bundle, name),
        Command::List(path) => match bundle.mount_manager().list(path) {
            Ok(entries) => CommandResult::success(entries.join("\n")),
            Err(e) => CommandResult::failure(e),
        },
        Command::Cat(path) => match bundle.mount_manager().read(path) {
            Ok(contents) => CommandResult::success(String::from_utf8_lossy(&contents)),
            Err(e) => CommandResult::failure(e),
        },
        Command::Put(path, text) => match bundle.mount_manager().write(path, text.as_bytes()) {
            Ok(()) => CommandResult::success(format!("Wrote {} bytes", text.len())),
            Err(e) => CommandResult::failure(e),
        },
        Command::Rm(path) => match bundle.mount_manager().delete(path) {
            Ok(()) => CommandResult::success("Deleted"),
            Err(e) => CommandResult::failure(e),
        },
        Command::Exists(path) => match bundle.mount_manager().exists(path) {
            Ok(exists) => CommandResult::success(exists.to_string()),
            Err(e) => CommandResult::failure(e),
        },
        Command::Cp(from, to) => match bundle.mount_manager().copy(from, to) {
            Ok(()) => CommandResult::success("Copied"),
            Err(e) => CommandResult::failure(e),
        },
        Command::Mv(from, to) => match bundle.mount_manager().move_file(from, to) {
            Ok(()) => CommandResult::success("Moved"),
            Err(e) => CommandResult::failure(e),
        },
        Command::Unknown(raw) => {
            warn!("Unknown console command: {}", raw);
            CommandResult::failure(format!("Unknown command: {} (try HELP)", raw))
        }
    }
}

fn handle_cmd_storages(bundle: &StorageBundle) -> CommandResult {
    let registry = bundle.registry();
    let lines: Vec<String> = registry
        .names()
        .into_iter()
        .filter_map(|name| {
            registry.entry(&name).map(|entry| match entry {
                StorageEntry::Concrete(cell) => format!(
                    "{} (concrete, {})",
                    name,
                    if cell.is_initialized() { "built" } else { "not built" }
                ),
                StorageEntry::Lazy(handle) => format!(
                    "{} (lazy -> {}, {})",
                    name,
                    handle.source_name(),
                    if handle.is_resolved() { "resolved" } else { "unresolved" }
                ),
            })
        })
        .collect();
    CommandResult::success(lines.join("\n"))
}

fn handle_cmd_mounts(bundle: &StorageBundle) -> CommandResult {
    let lines: Vec<String> = bundle
        .mount_manager()
        .mounts()
        .map(|(prefix, name)| format!("{}:// -> {}", prefix, name))
        .collect();
    CommandResult::success(lines.join("\n"))
}

fn handle_cmd_resolve(bundle: &StorageBundle, name: &str) -> CommandResult {
    match bundle.storage(name) {
        Ok(_) => {
            info!("Resolved storage '{}' from console", name);
            CommandResult::success(format!("Storage '{}' resolved", name))
        }
        Err(e) => CommandResult::failure(e),
    }
}
