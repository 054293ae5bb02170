///
/// This module implements the CLI interface for catalog-sync: command parsing, wiring of the
/// real catalog client and object store, and the user-visible outcome of a run.
///
/// All pipeline logic lives in the [`catalog-sync-core`] crate; this module is CLI glue only.
///
/// ## How To Use
/// - For command-line users: `catalog-sync sync --config sync.yaml`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// The invocation response (`statusCode`, `body`, `headers`) is printed to stdout as JSON.
/// A failed run still prints its response, then returns an error so the process exits non-zero.
///
/// [`catalog-sync-core`]: ../../catalog-sync-core/
use std::path::PathBuf;

use anyhow::{Context, Result};
use catalog_sync_core::catalog::HttpCatalog;
use clap::{Parser, Subcommand};

use crate::load_config::load_config;
use crate::upload::build_publisher;

/// CLI for catalog-sync: mirror a public catalog into object storage.
#[derive(Parser)]
#[clap(
    name = "catalog-sync",
    version,
    about = "List a public catalog, fetch every record and publish them as newline-delimited JSON"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one synchronisation using the given config file
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Sync { config } => {
            let config = load_config(config)?;
            tracing::info!(command = "sync", "Starting synchronisation");

            let catalog = HttpCatalog::new(&config.sync.catalog)
                .context("Failed to construct catalog HTTP client")?;
            let publisher = build_publisher(&config.sync.destination.bucket, &config.backend)?;

            let report =
                catalog_sync_core::synchronise::run(&config.sync, &catalog, &publisher).await;
            let succeeded = report.is_success();
            let detail = report.detail.clone();

            let response = report.into_response();
            println!("{}", serde_json::to_string_pretty(&response)?);

            if succeeded {
                tracing::info!(command = "sync", "Synchronisation complete");
                Ok(())
            } else {
                tracing::error!(command = "sync", detail = %detail, "Synchronisation failed");
                Err(anyhow::Error::msg(detail))
            }
        }
    }
}
