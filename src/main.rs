//! Storage bundle - Entry Point
//!
//! Loads the storage configuration, wires every storage and serves console
//! commands read from stdin.

use log::{error, info};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use storage_bundle::console::{CommandStatus, handle_command, parse_command};
use storage_bundle::error::BundleError;
use storage_bundle::error::handlers::{error_to_exit_code, handle_error};
use storage_bundle::utils::setup_logging;
use storage_bundle::{BundleConfig, StorageBundle};

fn exit_with(err: BundleError) -> ! {
    handle_error(&err);
    std::process::exit(error_to_exit_code(&err));
}

#[tokio::main]
async fn main() {
    setup_logging();

    info!("Launching storage bundle...");

    let config = match std::env::args().nth(1) {
        Some(path) => BundleConfig::from_file(Path::new(&path)),
        None => BundleConfig::load(),
    };
    let config = config.unwrap_or_else(|e| exit_with(e.into()));

    let bundle = StorageBundle::from_config(&config).unwrap_or_else(|e| exit_with(e));
    // Fail fast on misconfigured storages instead of at first use
    if let Err(e) = bundle.warm_up() {
        exit_with(e);
    }
    let bundle = Arc::new(bundle);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = parse_command(&line);
        let worker_bundle = Arc::clone(&bundle);
        let result =
            match tokio::task::spawn_blocking(move || handle_command(&worker_bundle, &command))
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    error!("Command task failed: {}", e);
                    continue;
                }
            };

        if let Some(message) = result.message {
            if stdout
                .write_all(format!("{}\n", message).as_bytes())
                .await
                .is_err()
            {
                break;
            }
            let _ = stdout.flush().await;
        }
        if result.status == CommandStatus::Close {
            break;
        }
    }

    info!("Storage bundle stopped");
}
