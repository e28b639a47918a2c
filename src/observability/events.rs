//! Observable election events
//!
//! Every log line the crate emits names one of these events. Names are
//! stable so they can be matched on by log pipelines.

use std::fmt;

/// Observable events in the election lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Election attempt begins
    ElectionStart,
    /// Own identity resolved from namespace, env and API
    IdentityResolved,
    /// Election aborted on a fatal error (FATAL)
    ElectionFailed,
    /// Election aborted by the caller
    ElectionCancelled,

    // Lock inspection
    /// No lock exists yet
    NoExistingLock,
    /// A lock exists, owned by the named pod
    ExistingLockFound,
    /// Existing lock is ours; we were restarted
    ResumedLeadership,
    /// Lock was created by us
    BecameLeader,
    /// Create lost the race to another pod
    LockConflict,

    // Reclamation
    /// Lock owner references are not a single pod
    MalformedLock,
    /// Lock owner is gone; waiting for garbage collection
    AwaitingGarbageCollection,
    /// Lock owner was evicted and is being deleted
    LeaderEvicted,
    /// Evicted lock owner deleted
    EvictedLeaderDeleted,
    /// Evicted lock owner could not be deleted
    EvictedLeaderDeleteFailed,
    /// Lock owner is alive; waiting
    NotLeader,

    // Backoff
    /// Sleeping before the next attempt
    BackoffSleep,
}

impl Event {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ElectionStart => "ELECTION_START",
            Event::IdentityResolved => "IDENTITY_RESOLVED",
            Event::ElectionFailed => "ELECTION_FAILED",
            Event::ElectionCancelled => "ELECTION_CANCELLED",
            Event::NoExistingLock => "NO_EXISTING_LOCK",
            Event::ExistingLockFound => "EXISTING_LOCK_FOUND",
            Event::ResumedLeadership => "RESUMED_LEADERSHIP",
            Event::BecameLeader => "BECAME_LEADER",
            Event::LockConflict => "LOCK_CONFLICT",
            Event::MalformedLock => "MALFORMED_LOCK",
            Event::AwaitingGarbageCollection => "AWAITING_GARBAGE_COLLECTION",
            Event::LeaderEvicted => "LEADER_EVICTED",
            Event::EvictedLeaderDeleted => "EVICTED_LEADER_DELETED",
            Event::EvictedLeaderDeleteFailed => "EVICTED_LEADER_DELETE_FAILED",
            Event::NotLeader => "NOT_LEADER",
            Event::BackoffSleep => "BACKOFF_SLEEP",
        }
    }

    /// Returns true if this event ends the process's election attempt
    /// unsuccessfully.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::ElectionFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
