//! Lock and peer records as seen through the token store
//!
//! These are read-only projections of orchestrator objects. The token is a
//! ConfigMap whose only meaningful content is its owner reference; the peer
//! is a Pod reduced to the fields the election protocol inspects.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Owner kind the election protocol accepts on a lock.
pub const POD_KIND: &str = "Pod";

/// API version of the core group, used on owner references to pods.
pub const CORE_API_VERSION: &str = "v1";

/// Reason the kubelet reports on pods evicted under resource pressure.
pub const EVICTED_REASON: &str = "Evicted";

/// Back-reference from a lock to the resource that owns it.
///
/// The orchestrator garbage collector deletes the lock once the owner is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

impl OwnerRef {
    /// Owner reference pointing at a pod.
    pub fn pod(name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            api_version: CORE_API_VERSION.to_string(),
            kind: POD_KIND.to_string(),
            name: name.into(),
            uid: uid.into(),
        }
    }

    /// Whether the referenced owner is a pod.
    pub fn is_pod(&self) -> bool {
        self.kind == POD_KIND
    }
}

/// The lock resource whose existence and owner represent leadership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionToken {
    pub name: String,
    pub namespace: String,
    pub owners: Vec<OwnerRef>,
}

impl ElectionToken {
    /// Whether any owner reference names the given pod.
    pub fn is_owned_by(&self, pod_name: &str) -> bool {
        self.owners.iter().any(|owner| owner.name == pod_name)
    }

    /// The single owner of a well-formed lock.
    ///
    /// Returns `None` when the lock has zero or several owner references.
    pub fn sole_owner(&self) -> Option<&OwnerRef> {
        match self.owners.as_slice() {
            [owner] => Some(owner),
            _ => None,
        }
    }
}

/// Pod lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PeerPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
    /// A phase string this crate does not know about.
    Other(String),
}

impl PeerPhase {
    /// Parse the phase string reported in pod status.
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for PeerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A peer pod as observed at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    pub name: String,
    pub uid: String,
    pub phase: PeerPhase,
    /// Termination reason from pod status, if any.
    pub reason: Option<String>,
    /// Set once the orchestrator has started deleting the pod.
    pub deletion_timestamp: Option<DateTime<Utc>>,
}

impl PeerRecord {
    /// Failed with the eviction reason. Evicted pods never restart.
    pub fn is_evicted(&self) -> bool {
        self.phase == PeerPhase::Failed && self.reason.as_deref() == Some(EVICTED_REASON)
    }

    /// Deletion already in progress.
    pub fn is_terminating(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}
