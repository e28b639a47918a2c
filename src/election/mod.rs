//! Leader election
//!
//! Leader-for-life election over a single lock resource:
//! - The pod that creates the lock leads until the pod is deleted
//! - The lock references its creator, so the orchestrator's garbage
//!   collector removes it when the leader pod goes away
//! - No heartbeats, no leases, no renewal
//!
//! # Usage
//!
//! ```ignore
//! match podlock::become_leader("my-operator-lock").await {
//!     Ok(outcome) => { /* lead */ }
//!     Err(e) => { eprintln!("{}", e); std::process::exit(1); }
//! }
//! ```

mod backoff;
mod engine;
mod errors;
mod state;

pub use backoff::{jitter, Backoff, BackoffPolicy};
pub use engine::{BackoffSleep, ElectionEngine};
pub use errors::{ElectionError, ElectionErrorKind, ElectionResult};
pub use state::{ElectionOutcome, ElectionState};

use crate::identity::{resolve_identity, IdentityConfig};
use crate::store::{KubeStore, StoreResult, TokenStore};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Become the leader for `lock_name`, waiting as long as it takes.
///
/// Returns once this pod holds the lock, either freshly created or kept
/// across a restart. Every error is fatal for the process.
pub async fn become_leader(lock_name: &str) -> ElectionResult<ElectionOutcome> {
    become_leader_with_cancel(lock_name, &CancellationToken::new()).await
}

/// Like [`become_leader`], but gives up with [`ElectionError::Cancelled`]
/// once `cancel` fires.
pub async fn become_leader_with_cancel(
    lock_name: &str,
    cancel: &CancellationToken,
) -> ElectionResult<ElectionOutcome> {
    become_leader_using(lock_name, &IdentityConfig::default(), cancel, connect_cluster).await
}

/// Full election sequence with the identity source and store supplied.
///
/// Local identity is read before `connect` is called; a misconfigured pod
/// fails without touching the API. A `connect` failure is reported as a
/// configuration error.
pub async fn become_leader_using<C, Fut>(
    lock_name: &str,
    config: &IdentityConfig,
    cancel: &CancellationToken,
    connect: C,
) -> ElectionResult<ElectionOutcome>
where
    C: FnOnce(String) -> Fut,
    Fut: Future<Output = StoreResult<Arc<dyn TokenStore>>>,
{
    let local = config.load()?;

    let store = connect(local.namespace.clone())
        .await
        .map_err(|e| ElectionError::configuration(e.to_string()))?;
    let identity = resolve_identity(store.as_ref(), local).await?;

    let mut engine = ElectionEngine::new(store, identity, lock_name);
    engine.run(cancel).await
}

async fn connect_cluster(namespace: String) -> StoreResult<Arc<dyn TokenStore>> {
    let store = KubeStore::connect(namespace).await?;
    Ok(Arc::new(store))
}
