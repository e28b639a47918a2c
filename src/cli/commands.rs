//! CLI command implementations
//!
//! Commands are thin: `become` runs the election on a tokio runtime and
//! reports the outcome; `status` reads the lock and its holder once.

use serde::Serialize;
use serde_json::json;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::election::{become_leader_with_cancel, ElectionOutcome};
use crate::identity::IdentityConfig;
use crate::reclaim::HolderVerdict;
use crate::store::{KubeStore, OwnerRef, TokenStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Become { lock_name } => become_leader(&lock_name),
        Command::Status {
            lock_name,
            namespace,
        } => status(&lock_name, namespace),
    }
}

fn runtime() -> CliResult<Runtime> {
    Runtime::new().map_err(|e| CliError::io_error(format!("failed to start runtime: {}", e)))
}

/// Block until this pod leads `lock_name`.
///
/// Ctrl-C cancels the election.
pub fn become_leader(lock_name: &str) -> CliResult<()> {
    let outcome: ElectionOutcome = runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_signal.cancel();
            }
        });
        become_leader_with_cancel(lock_name, &cancel).await
    })?;

    write_response(json!({
        "lock": lock_name,
        "outcome": outcome.as_str(),
    }))
}

/// Print the current holder of `lock_name`.
pub fn status(lock_name: &str, namespace: Option<String>) -> CliResult<()> {
    let namespace = match namespace {
        Some(ns) => ns,
        None => IdentityConfig::default().read_namespace()?,
    };

    let report = runtime()?.block_on(fetch_status(namespace, lock_name))?;
    write_response(serde_json::to_value(report)?)
}

async fn fetch_status(namespace: String, lock_name: &str) -> CliResult<LockStatus> {
    let store = KubeStore::connect(namespace).await?;
    lock_status(&store, lock_name).await
}

/// Snapshot of a lock and its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockStatus {
    pub lock: String,
    pub namespace: String,
    pub held: bool,
    pub owners: Vec<OwnerRef>,
    pub holder: Option<HolderStatus>,
}

/// Liveness of the pod named by a well-formed lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderStatus {
    pub name: String,
    /// False once the pod is gone and the lock awaits garbage collection.
    pub present: bool,
    pub phase: Option<String>,
    pub reason: Option<String>,
    pub evicted: bool,
    pub terminating: bool,
}

/// Read the lock and, if it has a single pod owner, that pod.
pub async fn lock_status(store: &dyn TokenStore, lock_name: &str) -> CliResult<LockStatus> {
    let token = match store.get_token(lock_name).await {
        Ok(token) => token,
        Err(e) if e.is_not_found() => {
            return Ok(LockStatus {
                lock: lock_name.to_string(),
                namespace: store.namespace().to_string(),
                held: false,
                owners: Vec::new(),
                holder: None,
            })
        }
        Err(e) => return Err(e.into()),
    };

    let holder = match token.sole_owner().filter(|owner| owner.is_pod()) {
        Some(owner) => Some(match store.get_peer(&owner.name).await {
            Ok(peer) => {
                let verdict = HolderVerdict::of(&peer);
                HolderStatus {
                    name: peer.name,
                    present: true,
                    phase: Some(peer.phase.to_string()),
                    reason: peer.reason,
                    evicted: verdict == HolderVerdict::Evicted,
                    terminating: verdict == HolderVerdict::Terminating,
                }
            }
            Err(e) if e.is_not_found() => HolderStatus {
                name: owner.name.clone(),
                present: false,
                phase: None,
                reason: None,
                evicted: false,
                terminating: false,
            },
            Err(e) => return Err(e.into()),
        }),
        None => None,
    };

    Ok(LockStatus {
        lock: token.name,
        namespace: token.namespace,
        held: true,
        owners: token.owners,
        holder,
    })
}
