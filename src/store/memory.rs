//! In-memory token store
//!
//! Behaves like the orchestrator for the purposes of the election:
//! - Lock creation is atomic: one creator per name wins, the rest conflict
//! - Deleting a peer garbage-collects every lock whose owners are all gone
//! - Every call is recorded so callers can assert on API traffic
//! - Failures can be injected per operation

use super::errors::{StoreError, StoreResult};
use super::types::{ElectionToken, OwnerRef, PeerPhase, PeerRecord, EVICTED_REASON};
use super::{TokenStore, PEER_RESOURCE, TOKEN_RESOURCE};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Token store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    GetToken,
    CreateToken,
    GetPeer,
    DeletePeer,
}

/// A recorded call against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub name: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    tokens: HashMap<String, ElectionToken>,
    peers: HashMap<String, PeerRecord>,
    calls: Vec<StoreCall>,
    failures: HashMap<StoreOp, StoreError>,
    one_shot: HashMap<StoreOp, VecDeque<StoreError>>,
}

impl MemoryState {
    /// Record the call and return the injected failure for `op`, if any.
    fn enter(&mut self, op: StoreOp, name: &str) -> StoreResult<()> {
        self.calls.push(StoreCall {
            op,
            name: name.to_string(),
        });
        if let Some(err) = self.one_shot.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Drop locks none of whose owners exist any more.
    fn collect_garbage(&mut self) {
        let live_uids: Vec<&str> = self.peers.values().map(|p| p.uid.as_str()).collect();
        self.tokens.retain(|_, token| {
            token.owners.is_empty()
                || token
                    .owners
                    .iter()
                    .any(|owner| live_uids.contains(&owner.uid.as_str()))
        });
    }
}

/// Shared in-memory store. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    namespace: String,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store scoped to `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Arc::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a peer as-is.
    pub fn add_peer(&self, peer: PeerRecord) {
        self.state().peers.insert(peer.name.clone(), peer);
    }

    /// Register a running peer with a fresh uid and return it.
    pub fn add_running_peer(&self, name: &str) -> PeerRecord {
        let peer = PeerRecord {
            name: name.to_string(),
            uid: Uuid::new_v4().to_string(),
            phase: PeerPhase::Running,
            reason: None,
            deletion_timestamp: None,
        };
        self.add_peer(peer.clone());
        peer
    }

    /// Mark a registered peer as evicted. Returns false if it is unknown.
    pub fn evict_peer(&self, name: &str) -> bool {
        match self.state().peers.get_mut(name) {
            Some(peer) => {
                peer.phase = PeerPhase::Failed;
                peer.reason = Some(EVICTED_REASON.to_string());
                true
            }
            None => false,
        }
    }

    /// Mark a registered peer as being deleted without removing it.
    pub fn mark_terminating(&self, name: &str) -> bool {
        match self.state().peers.get_mut(name) {
            Some(peer) => {
                peer.deletion_timestamp = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Remove a peer out of band (as if deleted by someone else) and run
    /// garbage collection. No call is recorded.
    pub fn remove_peer(&self, name: &str) -> Option<PeerRecord> {
        let mut state = self.state();
        let removed = state.peers.remove(name);
        state.collect_garbage();
        removed
    }

    /// Seed a lock directly, bypassing the uniqueness check.
    pub fn insert_token(&self, name: &str, owners: Vec<OwnerRef>) {
        let token = ElectionToken {
            name: name.to_string(),
            namespace: self.namespace.clone(),
            owners,
        };
        self.state().tokens.insert(name.to_string(), token);
    }

    /// Current lock, if any.
    pub fn token(&self, name: &str) -> Option<ElectionToken> {
        self.state().tokens.get(name).cloned()
    }

    /// Current peer, if any.
    pub fn peer(&self, name: &str) -> Option<PeerRecord> {
        self.state().peers.get(name).cloned()
    }

    /// Make every subsequent call of `op` fail with `error`.
    pub fn fail(&self, op: StoreOp, error: StoreError) {
        self.state().failures.insert(op, error);
    }

    /// Make the next call of `op` fail with `error`. Queued one-shot
    /// failures take precedence over a persistent one.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.state().one_shot.entry(op).or_default().push_back(error);
    }

    /// Stop failing calls of `op`.
    pub fn clear_failure(&self, op: StoreOp) {
        self.state().failures.remove(&op);
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls of `op`.
    pub fn count(&self, op: StoreOp) -> usize {
        self.state().calls.iter().filter(|c| c.op == op).count()
    }

    /// Names passed to `delete_peer`, in order.
    pub fn deleted_peers(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.op == StoreOp::DeletePeer)
            .map(|c| c.name.clone())
            .collect()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_token(&self, name: &str) -> StoreResult<ElectionToken> {
        let mut state = self.state();
        state.enter(StoreOp::GetToken, name)?;
        state
            .tokens
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(TOKEN_RESOURCE, name))
    }

    async fn create_token(&self, name: &str, owner: &OwnerRef) -> StoreResult<()> {
        let mut state = self.state();
        state.enter(StoreOp::CreateToken, name)?;
        if state.tokens.contains_key(name) {
            return Err(StoreError::already_exists(TOKEN_RESOURCE, name));
        }
        let token = ElectionToken {
            name: name.to_string(),
            namespace: self.namespace.clone(),
            owners: vec![owner.clone()],
        };
        state.tokens.insert(name.to_string(), token);
        Ok(())
    }

    async fn get_peer(&self, name: &str) -> StoreResult<PeerRecord> {
        let mut state = self.state();
        state.enter(StoreOp::GetPeer, name)?;
        state
            .peers
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(PEER_RESOURCE, name))
    }

    async fn delete_peer(&self, name: &str) -> StoreResult<()> {
        let mut state = self.state();
        state.enter(StoreOp::DeletePeer, name)?;
        if state.peers.remove(name).is_none() {
            return Err(StoreError::not_found(PEER_RESOURCE, name));
        }
        state.collect_garbage();
        Ok(())
    }
}
