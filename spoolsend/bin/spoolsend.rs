//! Send spooled mail in batches
//!
//! Meant to be run from a scheduler: each invocation drains the spool once
//! and exits.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use spoolsend::{Dispatcher, LockFileGuard, NoopGuard, RunGuard};
use spoolsend_common::logging;

const CONFIG_ENV: &str = "SPOOLSEND_CONFIG";

#[derive(Parser, Debug)]
#[command(name = "spoolsend")]
#[command(about = "Send spooled email through Amazon SES", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (RON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send every claimable message in the spool, then exit
    #[command(name = "batch-send", alias = "email:batch_send")]
    BatchSend {
        /// Run even if another batch holds the lock
        #[arg(long)]
        bypass_locking: bool,

        /// Lock file to use instead of the configured one
        #[arg(long)]
        lock_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let dispatcher = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::BatchSend {
            bypass_locking,
            lock_file,
        } => {
            let mut guard: Box<dyn RunGuard> = if bypass_locking {
                Box::new(NoopGuard)
            } else {
                Box::new(LockFileGuard::new(
                    lock_file.unwrap_or_else(|| dispatcher.guard.lock_file.clone()),
                ))
            };

            dispatcher.run(guard.as_mut()).await?;
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<Dispatcher> {
    let config_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let config_content = std::fs::read_to_string(&config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config from {}: {}",
            config_path.display(),
            e
        )
    })?;

    ron::from_str(&config_content).map_err(|e| {
        anyhow::anyhow!(
            "Failed to parse config from {}: {}",
            config_path.display(),
            e
        )
    })
}

/// Find the configuration file using the following precedence:
/// 1. `SPOOLSEND_CONFIG` environment variable
/// 2. ./spoolsend.config.ron (current working directory)
/// 3. /etc/spoolsend/spoolsend.config.ron (system-wide config)
fn find_config_file() -> anyhow::Result<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        anyhow::bail!("{CONFIG_ENV} points to non-existent file: {}", path.display());
    }

    let default_paths = [
        PathBuf::from("./spoolsend.config.ron"),
        PathBuf::from("/etc/spoolsend/spoolsend.config.ron"),
    ];

    for path in &default_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let paths_tried = default_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    anyhow::bail!(
        "No configuration file found. Tried:\n  - {CONFIG_ENV} environment variable\n{paths_tried}"
    )
}
