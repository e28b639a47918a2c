//! Token store
//!
//! Thin facade over the orchestrator API for the two resources the election
//! touches: the lock (a ConfigMap) and peers (Pods).
//!
//! # Rules
//!
//! - Every operation is a single round trip
//! - No caching, no retries; retry policy belongs to the election engine
//! - Failures are classified as NotFound, AlreadyExists or Unknown
//!
//! `create_token` is the compare-and-swap primitive of the whole protocol:
//! the orchestrator rejects a second lock with the same name, so at most one
//! concurrent creator succeeds.

mod errors;
mod kubernetes;
mod memory;
mod types;

pub use errors::{StoreError, StoreResult};
pub use kubernetes::KubeStore;
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use types::{
    ElectionToken, OwnerRef, PeerPhase, PeerRecord, CORE_API_VERSION, EVICTED_REASON, POD_KIND,
};

use async_trait::async_trait;

/// Resource name used in errors about the lock.
pub const TOKEN_RESOURCE: &str = "configmap";

/// Resource name used in errors about peers.
pub const PEER_RESOURCE: &str = "pod";

/// Namespace-scoped access to the lock and the peers that may own it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Namespace all operations are scoped to.
    fn namespace(&self) -> &str;

    /// Fetch the lock by name.
    async fn get_token(&self, name: &str) -> StoreResult<ElectionToken>;

    /// Atomically create the lock with `owner` as its only owner reference.
    ///
    /// Fails with `AlreadyExists` if a lock with that name exists.
    async fn create_token(&self, name: &str, owner: &OwnerRef) -> StoreResult<()>;

    /// Fetch a peer by name.
    async fn get_peer(&self, name: &str) -> StoreResult<PeerRecord>;

    /// Delete a peer by name.
    async fn delete_peer(&self, name: &str) -> StoreResult<()>;
}
