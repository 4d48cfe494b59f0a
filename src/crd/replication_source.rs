//! VolSync ReplicationSource resource
//!
//! Only the subset of the upstream `volsync.backube/v1alpha1` schema that
//! this operator writes is modelled here.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ReplicationSource specification
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "volsync.backube",
    version = "v1alpha1",
    kind = "ReplicationSource",
    plural = "replicationsources",
    singular = "replicationsource",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSourceSpec {
    /// Name of the PersistentVolumeClaim to back up
    #[serde(rename = "sourcePVC")]
    pub source_pvc: String,

    /// When replication runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<ReplicationSourceTriggerSpec>,

    /// Restic mover configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restic: Option<ReplicationSourceResticSpec>,
}

/// Replication trigger
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSourceTriggerSpec {
    /// Cron-formatted schedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

/// Restic mover settings
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSourceResticSpec {
    /// Name of the Secret holding the restic repository configuration
    pub repository: String,

    /// How the point-in-time image of the source volume is taken
    pub copy_method: String,

    /// Days between `restic prune` runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prune_interval_days: Option<i32>,

    /// Snapshot retention
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retain: Option<ResticRetainPolicy>,
}

/// Restic `forget` retention policy
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResticRetainPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yearly: Option<i32>,
}
