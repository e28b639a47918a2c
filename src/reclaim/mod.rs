//! Eviction reclamation
//!
//! A lock lives exactly as long as the pod it references. An evicted pod is
//! terminal but is not deleted by the kubelet, so its lock would block the
//! election forever. When the holder of a conflicting lock is evicted and
//! not already being deleted, the reclaimer deletes it; the orchestrator's
//! garbage collector then removes the lock.
//!
//! Reclamation is best-effort. Only a failed holder lookup (other than
//! not-found) is reported to the caller; delete failures are logged.
//! A cancelled token stops reclamation before the holder lookup and before
//! the delete.

mod assess;

pub use assess::{HolderVerdict, LockAssessment, MalformedReason};

use crate::observability::{error_event, log_event_with_fields, warn_event, Event};
use crate::store::{ElectionToken, StoreResult, TokenStore};
use tokio_util::sync::CancellationToken;

/// What the reclaimer did about a conflicting lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReclaimOutcome {
    /// No lock to inspect.
    TokenGone,
    /// Lock shape is unexpected; nothing done.
    MalformedLock(MalformedReason),
    /// Holder pod no longer exists; the lock is about to be collected.
    AwaitingGarbageCollection { holder: String },
    /// Evicted holder deleted.
    EvictedHolderDeleted { holder: String },
    /// Evicted holder could not be deleted.
    EvictedHolderDeleteFailed { holder: String, error: String },
    /// Holder is already being deleted.
    HolderTerminating { holder: String },
    /// Holder is alive; it is the leader.
    HolderAlive { holder: String },
    /// Cancelled before acting on the holder.
    Interrupted { holder: String },
}

impl ReclaimOutcome {
    /// Whether a delete was issued against the holder.
    pub fn attempted_delete(&self) -> bool {
        matches!(
            self,
            Self::EvictedHolderDeleted { .. } | Self::EvictedHolderDeleteFailed { .. }
        )
    }
}

/// Inspect the holder of a conflicting lock and delete it if evicted.
pub async fn reclaim(
    store: &dyn TokenStore,
    conflicting: Option<&ElectionToken>,
) -> StoreResult<ReclaimOutcome> {
    reclaim_with_cancel(store, conflicting, &CancellationToken::new()).await
}

/// Like [`reclaim`], but issues no further API call once `cancel` fires.
pub async fn reclaim_with_cancel(
    store: &dyn TokenStore,
    conflicting: Option<&ElectionToken>,
    cancel: &CancellationToken,
) -> StoreResult<ReclaimOutcome> {
    let owner = match LockAssessment::of(conflicting) {
        LockAssessment::Gone => return Ok(ReclaimOutcome::TokenGone),
        LockAssessment::Malformed(reason) => {
            let owners = conflicting.map(|t| t.owners.len()).unwrap_or(0).to_string();
            let description = reason.description();
            warn_event(
                Event::MalformedLock,
                &[("owners", owners.as_str()), ("reason", description.as_str())],
            );
            return Ok(ReclaimOutcome::MalformedLock(reason));
        }
        LockAssessment::Holder(owner) => owner,
    };
    let holder = owner.name;

    if cancel.is_cancelled() {
        return Ok(ReclaimOutcome::Interrupted { holder });
    }
    let peer = match store.get_peer(&holder).await {
        Ok(peer) => peer,
        Err(e) if e.is_not_found() => {
            log_event_with_fields(
                Event::AwaitingGarbageCollection,
                &[("leader", holder.as_str())],
            );
            return Ok(ReclaimOutcome::AwaitingGarbageCollection { holder });
        }
        Err(e) => return Err(e),
    };

    match HolderVerdict::of(&peer) {
        HolderVerdict::Evicted => {
            if cancel.is_cancelled() {
                return Ok(ReclaimOutcome::Interrupted { holder });
            }
            log_event_with_fields(Event::LeaderEvicted, &[("leader", holder.as_str())]);
            match store.delete_peer(&holder).await {
                Ok(()) => {
                    log_event_with_fields(
                        Event::EvictedLeaderDeleted,
                        &[("leader", holder.as_str())],
                    );
                    Ok(ReclaimOutcome::EvictedHolderDeleted { holder })
                }
                Err(e) => {
                    let error = e.to_string();
                    error_event(
                        Event::EvictedLeaderDeleteFailed,
                        &[("error", error.as_str()), ("leader", holder.as_str())],
                    );
                    Ok(ReclaimOutcome::EvictedHolderDeleteFailed { holder, error })
                }
            }
        }
        HolderVerdict::Terminating => {
            log_event_with_fields(
                Event::NotLeader,
                &[("leader", holder.as_str()), ("leader_state", "terminating")],
            );
            Ok(ReclaimOutcome::HolderTerminating { holder })
        }
        HolderVerdict::Alive => {
            log_event_with_fields(
                Event::NotLeader,
                &[("leader", holder.as_str()), ("leader_phase", peer.phase.as_str())],
            );
            Ok(ReclaimOutcome::HolderAlive { holder })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, OwnerRef, StoreError, StoreOp};

    fn seeded(owners: Vec<OwnerRef>) -> (MemoryStore, ElectionToken) {
        let store = MemoryStore::new("default");
        store.insert_token("lock", owners);
        let token = store.token("lock").unwrap();
        (store, token)
    }

    #[tokio::test]
    async fn test_gone_lock_does_nothing() {
        let store = MemoryStore::new("default");
        let outcome = reclaim(&store, None).await.unwrap();
        assert_eq!(outcome, ReclaimOutcome::TokenGone);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_locks_never_delete() {
        let (store, token) = seeded(vec![]);
        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert_eq!(
            outcome,
            ReclaimOutcome::MalformedLock(MalformedReason::OwnerCount(0))
        );

        let a = store.add_running_peer("a");
        let b = store.add_running_peer("b");
        store.evict_peer("a");
        store.evict_peer("b");
        let (_, two) = seeded(vec![
            OwnerRef::pod(&a.name, &a.uid),
            OwnerRef::pod(&b.name, &b.uid),
        ]);
        let outcome = reclaim(&store, Some(&two)).await.unwrap();
        assert!(!outcome.attempted_delete());
        assert_eq!(store.count(StoreOp::DeletePeer), 0);
        assert_eq!(store.count(StoreOp::GetPeer), 0);
    }

    #[tokio::test]
    async fn test_missing_holder_awaits_gc() {
        let (store, token) = seeded(vec![OwnerRef::pod("gone", "1")]);
        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert_eq!(
            outcome,
            ReclaimOutcome::AwaitingGarbageCollection {
                holder: "gone".into()
            }
        );
    }

    #[tokio::test]
    async fn test_evicted_holder_is_deleted_once() {
        let store = MemoryStore::new("default");
        let leader = store.add_running_peer("leader");
        store.evict_peer("leader");
        store.insert_token("lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        let token = store.token("lock").unwrap();

        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert_eq!(
            outcome,
            ReclaimOutcome::EvictedHolderDeleted {
                holder: "leader".into()
            }
        );
        assert_eq!(store.deleted_peers(), vec!["leader".to_string()]);
        assert!(store.token("lock").is_none());
    }

    #[tokio::test]
    async fn test_terminating_evicted_holder_is_left_alone() {
        let store = MemoryStore::new("default");
        let leader = store.add_running_peer("leader");
        store.evict_peer("leader");
        store.mark_terminating("leader");
        store.insert_token("lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        let token = store.token("lock").unwrap();

        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert!(matches!(outcome, ReclaimOutcome::HolderTerminating { .. }));
        assert_eq!(store.count(StoreOp::DeletePeer), 0);
    }

    #[tokio::test]
    async fn test_running_holder_is_left_alone() {
        let store = MemoryStore::new("default");
        let leader = store.add_running_peer("leader");
        store.insert_token("lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        let token = store.token("lock").unwrap();

        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert!(matches!(outcome, ReclaimOutcome::HolderAlive { .. }));
        assert_eq!(store.count(StoreOp::DeletePeer), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_is_swallowed() {
        let store = MemoryStore::new("default");
        let leader = store.add_running_peer("leader");
        store.evict_peer("leader");
        store.insert_token("lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        store.fail(StoreOp::DeletePeer, StoreError::unknown("forbidden"));
        let token = store.token("lock").unwrap();

        let outcome = reclaim(&store, Some(&token)).await.unwrap();
        assert!(matches!(
            outcome,
            ReclaimOutcome::EvictedHolderDeleteFailed { .. }
        ));
        assert!(outcome.attempted_delete());
        assert!(store.token("lock").is_some());
    }

    #[tokio::test]
    async fn test_cancelled_before_lookup_issues_no_calls() {
        let store = MemoryStore::new("default");
        let leader = store.add_running_peer("leader");
        store.evict_peer("leader");
        store.insert_token("lock", vec![OwnerRef::pod(&leader.name, &leader.uid)]);
        let token = store.token("lock").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = reclaim_with_cancel(&store, Some(&token), &cancel)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReclaimOutcome::Interrupted {
                holder: "leader".into()
            }
        );
        assert!(!outcome.attempted_delete());
        assert!(store.calls().is_empty());
        assert!(store.peer("leader").is_some());
    }

    #[tokio::test]
    async fn test_holder_lookup_failure_propagates() {
        let (store, token) = seeded(vec![OwnerRef::pod("leader", "1")]);
        store.fail(StoreOp::GetPeer, StoreError::unknown("connection reset"));

        let err = reclaim(&store, Some(&token)).await.unwrap_err();
        assert_eq!(err, StoreError::unknown("connection reset"));
    }
}
