//! Reference to the PersistentVolumeClaim that owns derived objects

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::ResourceExt;
use std::collections::BTreeMap;

const MANAGED_BY: &str = "volsync-restic-operator";

/// Name, namespace and uid of a claim
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRef {
    pub name: String,
    pub namespace: String,
    /// Unknown for claims that were never persisted (tests, dry runs)
    pub uid: Option<String>,
}

impl ClaimRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
        }
    }

    pub fn from_claim(pvc: &PersistentVolumeClaim) -> Self {
        Self {
            name: pvc.name_any(),
            namespace: pvc.namespace().unwrap_or_default(),
            uid: pvc.uid(),
        }
    }

    /// Name of the per-claim restic Secret
    pub fn secret_name(&self) -> String {
        format!("{}-restic", self.name)
    }

    /// Owner references tying a derived object's lifetime to the claim
    pub fn owner_references(&self) -> Option<Vec<OwnerReference>> {
        self.uid.as_ref().map(|uid| {
            vec![OwnerReference {
                api_version: "v1".to_string(),
                kind: "PersistentVolumeClaim".to_string(),
                name: self.name.clone(),
                uid: uid.clone(),
                controller: Some(true),
                block_owner_deletion: None,
            }]
        })
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("app.kubernetes.io/name".to_string(), "volsync-restic".to_string());
        labels.insert("app.kubernetes.io/instance".to_string(), self.name.clone());
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            MANAGED_BY.to_string(),
        );
        labels
    }
}
