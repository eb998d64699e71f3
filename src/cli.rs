//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// vmigrate - VM migration control plane core
#[derive(Parser, Debug)]
#[command(name = "vmigrate")]
#[command(version)]
#[command(about = "Derive object names, validate migration plans and sync inventory")]
pub struct Cli {
    /// Config file (TOML, or JSON/YAML by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive identifiers from raw names
    Name {
        #[command(subcommand)]
        command: NameCommands,
    },

    /// Migration plan operations
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },

    /// Reconcile an inventory file into an in-memory store
    Sync {
        /// Inventory file mapping scopes to clusters
        #[arg(short, long)]
        inventory: PathBuf,

        /// Credential scope to sync; repeatable. Defaults to the config's scopes
        #[arg(short, long)]
        scope: Vec<String>,

        /// Run a single pass and print its actions
        #[arg(long, default_value_t = false)]
        once: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum NameCommands {
    /// Normalize a raw name into an identifier
    Normalize { raw: String },

    /// Shadow object name for a VM
    Vm { raw: String },

    /// Conversion job name for a VM
    Job { raw: String },
}

#[derive(Subcommand, Debug)]
pub enum PlanCommands {
    /// Validate a plan file (YAML or JSON)
    Validate { file: PathBuf },
}
