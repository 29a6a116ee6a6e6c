//! Argument parsing, built with `clap`'s derive API the way the teacher's
//! `aerolithdb-cli` wires up subcommands — a top-level `Cli` holding global
//! options, a `Commands` enum for the dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "clusterman")]
#[command(about = "Autoscaling control plane for elastic compute pools")]
#[command(version)]
pub struct Cli {
    /// Path to the pool's YAML config file.
    #[arg(long, global = true, default_value = "clusterman.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set a pool's target capacity directly, bypassing the signal.
    Manage {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
        #[arg(long)]
        target_capacity: f64,
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a pool's current state: target/fulfilled capacity, pause
    /// status, per-group summary.
    Status {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
    },
    /// Pause the autoscaler for a pool until `--until` (a duration from
    /// now, or an RFC 3339 timestamp).
    Disable {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
        #[arg(long)]
        until: String,
    },
    /// Resume the autoscaler for a pool.
    Enable {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
    },
    /// Create a NodeMigration custom resource.
    Migrate {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long = "condition-trait")]
        condition_trait: String,
        #[arg(long = "condition-operator")]
        condition_operator: String,
        #[arg(long = "condition-target")]
        condition_target: String,
        #[arg(long = "label-selector")]
        label_selectors: Vec<String>,
    },
    /// Run a synthetic tick against an in-memory cluster, no cloud access
    /// required.
    Simulate {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
        #[arg(long, default_value_t = 10)]
        agent_count: u32,
        #[arg(long, default_value = "m5.large")]
        instance_type: String,
    },
    /// Print a synthetic pool config/cluster snapshot usable as `simulate`
    /// input, without touching any real cloud resources.
    GenerateData {
        #[arg(long, default_value_t = 10)]
        agent_count: u32,
        #[arg(long, default_value = "m5.large")]
        instance_type: String,
    },
    /// Run the autoscaler tick loop forever for one pool.
    RunAutoscaler {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
        #[arg(long)]
        app: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the three-queue draining client forever for one pool.
    RunDrainer {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
    },
    /// Run the uptime-triggered migration worker forever for one pool.
    RunMigrationWorker {
        #[arg(long)]
        cluster: String,
        #[arg(long)]
        pool: String,
        #[arg(long)]
        scheduler: String,
    },
}
