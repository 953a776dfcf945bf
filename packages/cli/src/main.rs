#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the asset sync tool.
//!
//! One action: `upload`, which syncs the configured local asset tree to
//! the remote bucket. Credentials come from the environment (see the
//! `asset_sync_store` docs); everything else comes from the TOML config
//! file.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use asset_sync_config::SyncConfig;
use asset_sync_engine::{SyncOptions, run_sync};
use asset_sync_store::S3Store;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "asset-sync", about = "Sync static assets to a CDN bucket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload changed assets to the remote bucket
    Upload {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "asset-sync.toml")]
        config: PathBuf,
        /// Print a `+`/`=` marker for every key considered
        #[arg(long)]
        verbose: bool,
        /// Compute and print decisions without uploading anything
        #[arg(long)]
        dryrun: bool,
        /// Upload every key even when it already exists remotely
        #[arg(long)]
        force_write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            config,
            verbose,
            dryrun,
            force_write,
        } => {
            let config = SyncConfig::from_path(&config)?;
            let store = S3Store::from_env(&config.bucket)?;
            let options = SyncOptions {
                verbose,
                dry_run: dryrun,
                force_write,
            };

            let cancel = Arc::new(AtomicBool::new(false));
            let ctrl_c_flag = Arc::clone(&cancel);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Cancellation requested, stopping after the current key...");
                    ctrl_c_flag.store(true, Ordering::Relaxed);
                }
            });

            let start = Instant::now();
            let stats = run_sync(&store, &config, &options, &cancel).await?;
            let elapsed = start.elapsed();
            log::info!("Upload complete: {stats} in {:.1}s", elapsed.as_secs_f64());
        }
    }

    Ok(())
}
