//! CLI module for podlock
//!
//! Provides command-line interface for:
//! - become: Run the election for this pod and exit once leader
//! - status: Show who holds a lock

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{become_leader, lock_status, run, run_command, status, HolderStatus, LockStatus};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_response;
