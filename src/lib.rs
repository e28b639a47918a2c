//! podlock - leader-for-life election for Kubernetes pods
//!
//! One pod per lock name leads; the rest wait. The lock is a ConfigMap
//! whose owner reference points at the leader pod, so the orchestrator's
//! garbage collector releases it when the leader is deleted. Evicted
//! leaders are deleted by waiting peers to unblock collection.

pub mod cli;
pub mod election;
pub mod identity;
pub mod observability;
pub mod reclaim;
pub mod store;

pub use election::{
    become_leader, become_leader_with_cancel, ElectionError, ElectionOutcome, ElectionResult,
};
