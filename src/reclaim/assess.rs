//! Side-effect free assessment of a conflicting lock and its holder
//!
//! Assessment logic is deterministic and explainable; acting on it is the
//! reclaimer's job.

use crate::store::{ElectionToken, OwnerRef, PeerRecord};

/// Why a lock cannot be acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Lock must have exactly one owner reference.
    OwnerCount(usize),
    /// Lock owner reference must be a pod.
    OwnerKind(String),
}

impl MalformedReason {
    pub fn description(&self) -> String {
        match self {
            Self::OwnerCount(count) => format!(
                "leader lock must have exactly one owner reference, found {}",
                count
            ),
            Self::OwnerKind(kind) => {
                format!("leader lock owner reference must be a Pod, found {}", kind)
            }
        }
    }
}

/// What the conflicting lock tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAssessment {
    /// Lock disappeared between the conflict and the fetch.
    Gone,
    /// Lock shape is unexpected; nothing to do but wait.
    Malformed(MalformedReason),
    /// Lock is held by the referenced pod.
    Holder(OwnerRef),
}

impl LockAssessment {
    pub fn of(token: Option<&ElectionToken>) -> Self {
        let Some(token) = token else {
            return Self::Gone;
        };
        let Some(owner) = token.sole_owner() else {
            return Self::Malformed(MalformedReason::OwnerCount(token.owners.len()));
        };
        if !owner.is_pod() {
            return Self::Malformed(MalformedReason::OwnerKind(owner.kind.clone()));
        }
        Self::Holder(owner.clone())
    }
}

/// Liveness of the lock holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderVerdict {
    /// Evicted and not yet being deleted: will never release the lock alone.
    Evicted,
    /// Already being deleted; garbage collection will follow.
    Terminating,
    /// Anything else, including failed-but-not-evicted pods.
    Alive,
}

impl HolderVerdict {
    pub fn of(peer: &PeerRecord) -> Self {
        if peer.is_terminating() {
            Self::Terminating
        } else if peer.is_evicted() {
            Self::Evicted
        } else {
            Self::Alive
        }
    }
}
