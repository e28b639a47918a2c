//! Kubernetes-backed token store
//!
//! The lock is a core/v1 ConfigMap carrying a single owner reference to the
//! pod that created it; peers are core/v1 Pods. HTTP 404 maps to NotFound,
//! HTTP 409 to AlreadyExists, everything else to Unknown.

use super::errors::{StoreError, StoreResult};
use super::types::{ElectionToken, OwnerRef, PeerPhase, PeerRecord};
use super::{TokenStore, PEER_RESOURCE, TOKEN_RESOURCE};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;

/// Token store talking to the cluster API server.
#[derive(Clone)]
pub struct KubeStore {
    namespace: String,
    config_maps: Api<ConfigMap>,
    pods: Api<Pod>,
}

impl KubeStore {
    /// Create a store scoped to `namespace` using an existing client.
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            config_maps: Api::namespaced(client.clone(), &namespace),
            pods: Api::namespaced(client, &namespace),
            namespace,
        }
    }

    /// Build a client from the in-cluster environment (or kubeconfig) and
    /// scope it to `namespace`.
    pub async fn connect(namespace: impl Into<String>) -> StoreResult<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| StoreError::unknown(format!("failed to build cluster client: {}", e)))?;
        Ok(Self::new(client, namespace))
    }
}

#[async_trait]
impl TokenStore for KubeStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn get_token(&self, name: &str) -> StoreResult<ElectionToken> {
        let config_map = self
            .config_maps
            .get(name)
            .await
            .map_err(|e| classify(e, TOKEN_RESOURCE, name))?;
        Ok(token_from_config_map(config_map, &self.namespace))
    }

    async fn create_token(&self, name: &str, owner: &OwnerRef) -> StoreResult<()> {
        let config_map = lock_config_map(name, &self.namespace, owner);
        self.config_maps
            .create(&PostParams::default(), &config_map)
            .await
            .map_err(|e| classify(e, TOKEN_RESOURCE, name))?;
        Ok(())
    }

    async fn get_peer(&self, name: &str) -> StoreResult<PeerRecord> {
        let pod = self
            .pods
            .get(name)
            .await
            .map_err(|e| classify(e, PEER_RESOURCE, name))?;
        Ok(peer_from_pod(pod))
    }

    async fn delete_peer(&self, name: &str) -> StoreResult<()> {
        self.pods
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| classify(e, PEER_RESOURCE, name))?;
        Ok(())
    }
}

fn classify(err: kube::Error, resource: &'static str, name: &str) -> StoreError {
    match err {
        kube::Error::Api(response) if response.code == 404 => StoreError::not_found(resource, name),
        kube::Error::Api(response) if response.code == 409 => {
            StoreError::already_exists(resource, name)
        }
        other => StoreError::unknown(other.to_string()),
    }
}

fn lock_config_map(name: &str, namespace: &str, owner: &OwnerRef) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            owner_references: Some(vec![OwnerReference {
                api_version: owner.api_version.clone(),
                kind: owner.kind.clone(),
                name: owner.name.clone(),
                uid: owner.uid.clone(),
                ..Default::default()
            }]),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn token_from_config_map(config_map: ConfigMap, namespace: &str) -> ElectionToken {
    let metadata = config_map.metadata;
    ElectionToken {
        name: metadata.name.unwrap_or_default(),
        namespace: metadata.namespace.unwrap_or_else(|| namespace.to_string()),
        owners: metadata
            .owner_references
            .unwrap_or_default()
            .into_iter()
            .map(|owner| OwnerRef {
                api_version: owner.api_version,
                kind: owner.kind,
                name: owner.name,
                uid: owner.uid,
            })
            .collect(),
    }
}

fn peer_from_pod(pod: Pod) -> PeerRecord {
    let status = pod.status.unwrap_or_default();
    PeerRecord {
        name: pod.metadata.name.unwrap_or_default(),
        uid: pod.metadata.uid.unwrap_or_default(),
        phase: status
            .phase
            .as_deref()
            .map(PeerPhase::parse)
            .unwrap_or(PeerPhase::Unknown),
        reason: status.reason,
        deletion_timestamp: pod.metadata.deletion_timestamp.map(|t| t.0),
    }
}
