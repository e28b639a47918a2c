//! Identity resolution
//!
//! Determines which pod this process is: namespace and name from the local
//! environment, uid from the API server. The result is an explicit value
//! handed to the election engine, resolved once per process.

mod config;

pub use config::{IdentityConfig, LocalIdentity, NAMESPACE_PATH, POD_NAME_ENV};

use crate::election::{ElectionError, ElectionResult};
use crate::observability::{log_event_with_fields, Event};
use crate::store::{OwnerRef, TokenStore};

/// This process's pod, as known to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

impl PeerIdentity {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
        }
    }

    /// Owner reference to attach to a lock this pod creates.
    pub fn owner_ref(&self) -> OwnerRef {
        OwnerRef::pod(&self.name, &self.uid)
    }
}

/// Look up this pod to complete its identity.
///
/// A missing pod is a configuration error: the pod running this code must
/// exist. Any other lookup failure is an API error.
pub async fn resolve_identity(
    store: &dyn TokenStore,
    local: LocalIdentity,
) -> ElectionResult<PeerIdentity> {
    let peer = store.get_peer(&local.pod_name).await.map_err(|e| {
        if e.is_not_found() {
            ElectionError::configuration(format!(
                "own pod {:?} not found in namespace {:?}",
                local.pod_name, local.namespace
            ))
        } else {
            ElectionError::from(e)
        }
    })?;

    let identity = PeerIdentity {
        namespace: local.namespace,
        name: peer.name,
        uid: peer.uid,
    };
    log_event_with_fields(
        Event::IdentityResolved,
        &[
            ("namespace", identity.namespace.as_str()),
            ("pod", identity.name.as_str()),
            ("uid", identity.uid.as_str()),
        ],
    );
    Ok(identity)
}
