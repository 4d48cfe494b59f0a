//! Change-detection state
//!
//! Records the last payload each handler successfully processed for a
//! resource, so unchanged resources do not re-run their handlers.

mod file_store;

pub use file_store::FileStore;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use sha2::{Digest, Sha256};

use crate::Result;

/// Identity of a watched resource
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceIdentity {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a typed Kubernetes object
    pub fn of<K>(obj: &K) -> Self
    where
        K: Resource<DynamicType = ()>,
    {
        Self::new(
            K::api_version(&()),
            K::kind(&()),
            obj.namespace().unwrap_or_default(),
            obj.name_any(),
        )
    }

    /// Stable storage key for this resource and handler
    ///
    /// The resource part is hashed so arbitrary names map to a fixed-length,
    /// filesystem-safe key; the handler id is appended verbatim.
    pub fn record_key(&self, handler_id: &str) -> RecordKey {
        let resource = format!(
            "{}/{}/{}/{}",
            self.api_version, self.kind, self.namespace, self.name
        );
        let digest = Sha256::digest(resource.as_bytes());
        RecordKey(format!("{:x}_{}", digest, handler_id))
    }
}

/// Content-addressed key of a single change-detection record
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key-value store of last-handled payloads
///
/// Only `store` reports failures. A record that cannot be read is absent,
/// and purging is best effort.
#[async_trait]
pub trait DiffStore: Send + Sync {
    /// Persist `payload`, replacing any previous record for `key`
    async fn store(&self, key: &RecordKey, payload: &serde_json::Value) -> Result<()>;

    /// Last stored payload, or `None` when absent or unreadable
    async fn fetch(&self, key: &RecordKey) -> Option<serde_json::Value>;

    /// Remove the record for `key` if there is one
    async fn purge(&self, key: &RecordKey);
}
