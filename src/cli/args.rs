//! CLI argument definitions using clap
//!
//! Commands:
//! - podlock become <LOCK_NAME>
//! - podlock status <LOCK_NAME> [--namespace <NS>]

use clap::{Parser, Subcommand};

/// podlock - leader-for-life election for Kubernetes pods
#[derive(Parser, Debug)]
#[command(name = "podlock")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Block until this pod holds the lock, then exit
    Become {
        /// Name of the lock ConfigMap
        lock_name: String,
    },

    /// Print the current holder of the lock as JSON
    Status {
        /// Name of the lock ConfigMap
        lock_name: String,

        /// Namespace to inspect (defaults to the pod's own namespace)
        #[arg(long)]
        namespace: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
