//! # vmigrate
//!
//! Entry point: parse arguments, load configuration, initialize tracing and
//! dispatch the subcommand.
//!
//! Configuration is read from `--config` when given, then overridden by
//! `VMIGRATE_SCOPE` and `VMIGRATE_SYNC_INTERVAL_SECS`. Log verbosity follows
//! `RUST_LOG` (default `info`).

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vmigrate::cli::Cli;
use vmigrate::commands::execute_command;
use vmigrate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    let config = Config::load(cli.config.as_deref()).context(
        "Configuration failed to load. Check the --config file and VMIGRATE_* variables",
    )?;
    debug!(?config, "Configuration loaded");

    execute_command(cli.command, config).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
