//! Periodic driver running sync passes over a set of scopes.

use std::sync::Arc;

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Result;
use crate::syncer::InventorySyncer;
use crate::types::SyncReport;

/// Totals from a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Ticks that ran a pass over every scope.
    pub passes: u64,
    /// Scope passes that returned an error.
    pub failures: u64,
}

/// Runs [`InventorySyncer::sync`] for each scope on a fixed interval until
/// stopped. A failed scope is logged and retried on the next tick.
pub struct SyncLoop {
    syncer: Arc<InventorySyncer>,
    scopes: Vec<String>,
    shutdown: CancellationToken,
}

impl SyncLoop {
    pub fn new(syncer: Arc<InventorySyncer>, scopes: Vec<String>) -> Self {
        Self {
            syncer,
            scopes,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the loop and cancels in-flight passes.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run one pass over every scope concurrently.
    pub async fn run_once(&self) -> Vec<Result<SyncReport>> {
        join_all(
            self.scopes
                .iter()
                .map(|scope| self.syncer.sync(scope, &self.shutdown)),
        )
        .await
    }

    /// Tick until the shutdown token fires.
    pub async fn run(&self) -> LoopStats {
        let mut stats = LoopStats::default();
        let mut ticker = tokio::time::interval(self.syncer.config().interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(scopes = self.scopes.len(), interval = ?self.syncer.config().interval, "Sync loop started");

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for (scope, outcome) in self.scopes.iter().zip(self.run_once().await) {
                match outcome {
                    Ok(report) => info!(
                        scope = %scope,
                        actions = report.actions.len(),
                        converged = report.converged,
                        "Sync pass finished"
                    ),
                    Err(e) => {
                        stats.failures += 1;
                        error!(scope = %scope, error = %e, "Sync pass failed");
                    }
                }
            }
            stats.passes += 1;
        }

        info!(passes = stats.passes, failures = stats.failures, "Sync loop stopped");
        stats
    }
}
