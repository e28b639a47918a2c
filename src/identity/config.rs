//! Where the process finds its own identity
//!
//! Configured by the deployment, immutable for the life of the process:
//! - Namespace: service account namespace file, trimmed
//! - Pod name: injected through the downward API as an env var
//!
//! Both are read locally before any cluster client exists.

use crate::election::{ElectionError, ElectionResult};
use std::io;
use std::path::{Path, PathBuf};
use std::{env, fs};

/// Service account file holding the pod's namespace.
pub const NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Env var carrying the pod's own name.
pub const POD_NAME_ENV: &str = "POD_NAME";

/// Identity source configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub namespace_path: PathBuf,
    pub pod_name_env: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            namespace_path: PathBuf::from(NAMESPACE_PATH),
            pod_name_env: POD_NAME_ENV.to_string(),
        }
    }
}

/// Identity known without talking to the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub namespace: String,
    pub pod_name: String,
}

impl IdentityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace_path(mut self, path: impl AsRef<Path>) -> Self {
        self.namespace_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_pod_name_env(mut self, var: impl Into<String>) -> Self {
        self.pod_name_env = var.into();
        self
    }

    /// Read the deployment namespace.
    pub fn read_namespace(&self) -> ElectionResult<String> {
        let raw = fs::read_to_string(&self.namespace_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ElectionError::configuration("namespace not found for current environment")
            }
            _ => ElectionError::configuration(format!(
                "failed to read namespace from {}: {}",
                self.namespace_path.display(),
                e
            )),
        })?;

        let namespace = raw.trim();
        if namespace.is_empty() {
            return Err(ElectionError::configuration(format!(
                "namespace file {} is empty",
                self.namespace_path.display()
            )));
        }
        Ok(namespace.to_string())
    }

    /// Read this pod's name from the environment.
    pub fn read_pod_name(&self) -> ElectionResult<String> {
        match env::var(&self.pod_name_env) {
            Ok(name) if !name.is_empty() => Ok(name),
            _ => Err(ElectionError::configuration(format!(
                "required env {} not set, please configure downward API",
                self.pod_name_env
            ))),
        }
    }

    /// Read pod name, then namespace.
    pub fn load(&self) -> ElectionResult<LocalIdentity> {
        let pod_name = self.read_pod_name()?;
        let namespace = self.read_namespace()?;
        Ok(LocalIdentity {
            namespace,
            pod_name,
        })
    }
}
