//! CLI command handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vmigrate_core::normalize;
use vmigrate_inventory::{
    FileInventoryReader, InMemoryObjectStore, InventorySyncerBuilder, SyncLoop,
    TracingObjectStore,
};
use vmigrate_plan::{MigrationPlanSpec, validate};

use crate::cli::{Commands, NameCommands, PlanCommands};
use crate::config::Config;

/// Execute a CLI command.
pub async fn execute_command(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Name { command } => cmd_name(&command, &config),
        Commands::Plan {
            command: PlanCommands::Validate { file },
        } => cmd_plan_validate(&file),
        Commands::Sync {
            inventory,
            scope,
            once,
        } => cmd_sync(inventory, scope, once, config).await,
    }
}

/// Print a derived identifier.
fn cmd_name(command: &NameCommands, config: &Config) -> Result<()> {
    let deriver = config.deriver()?;
    let name = match command {
        NameCommands::Normalize { raw } => normalize(raw),
        NameCommands::Vm { raw } => deriver.vm_shadow_name(raw),
        NameCommands::Job { raw } => deriver.job_name(raw),
    }
    .context("Failed to derive name")?;

    println!("{name}");
    Ok(())
}

/// Validate a plan file; the validator's message is the error.
fn cmd_plan_validate(file: &Path) -> Result<()> {
    let plan: MigrationPlanSpec = vmigrate_core::load_document(file)
        .with_context(|| format!("Failed to load plan from {}", file.display()))?;

    validate(&plan)?;

    info!(
        vms = plan.virtual_machines.total_vm_count(),
        batches = plan.virtual_machines.len(),
        "Plan is valid"
    );
    println!("plan is valid");
    Ok(())
}

/// Reconcile an inventory file into a fresh in-memory store.
async fn cmd_sync(
    inventory: PathBuf,
    scopes: Vec<String>,
    once: bool,
    config: Config,
) -> Result<()> {
    let scopes = if scopes.is_empty() {
        config.scopes.clone()
    } else {
        scopes
    };
    if scopes.is_empty() {
        bail!("No scope given: pass --scope or set VMIGRATE_SCOPE");
    }

    let syncer = InventorySyncerBuilder::new()
        .with_reader(Arc::new(FileInventoryReader::new(inventory)))
        .with_store(Arc::new(TracingObjectStore::new(InMemoryObjectStore::new())))
        .with_naming(config.naming)
        .with_config(config.sync)
        .build()
        .context("Failed to build inventory syncer")?;

    if once {
        let cancel = CancellationToken::new();
        let mut failed = false;
        for scope in &scopes {
            match syncer.sync(scope, &cancel).await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report.actions)?);
                }
                Err(e) => {
                    error!(scope = %scope, error = %e, "Sync pass failed");
                    failed = true;
                }
            }
        }
        if failed {
            bail!("One or more scopes failed to sync");
        }
        return Ok(());
    }

    let sync_loop = Arc::new(SyncLoop::new(Arc::new(syncer), scopes));
    let shutdown = sync_loop.shutdown_token();
    let handle = tokio::spawn({
        let sync_loop = Arc::clone(&sync_loop);
        async move { sync_loop.run().await }
    });

    wait_for_shutdown().await;
    shutdown.cancel();

    let stats = handle.await.context("Sync loop task failed")?;
    info!(passes = stats.passes, failures = stats.failures, "Sync stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn wait_for_shutdown() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }
}
