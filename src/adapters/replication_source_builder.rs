//! VolSync ReplicationSource builder

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::adapters::claim::ClaimRef;
use crate::config::ReplicationDefaults;
use crate::crd::{
    ReplicationSource, ReplicationSourceResticSpec, ReplicationSourceSpec,
    ReplicationSourceTriggerSpec, ResticRetainPolicy,
};

/// Build the ReplicationSource protecting a claim
///
/// The source is named after the claim and reads its repository settings
/// from the claim's restic Secret.
pub fn build_replication_source(
    claim: &ClaimRef,
    defaults: &ReplicationDefaults,
) -> ReplicationSource {
    let retain = &defaults.retain;

    ReplicationSource {
        metadata: ObjectMeta {
            name: Some(claim.name.clone()),
            namespace: Some(claim.namespace.clone()),
            labels: Some(claim.labels()),
            owner_references: claim.owner_references(),
            ..Default::default()
        },
        spec: ReplicationSourceSpec {
            source_pvc: claim.name.clone(),
            trigger: Some(ReplicationSourceTriggerSpec {
                schedule: Some(defaults.schedule.clone()),
            }),
            restic: Some(ReplicationSourceResticSpec {
                repository: claim.secret_name(),
                copy_method: defaults.copy_method.clone(),
                prune_interval_days: Some(defaults.prune_interval_days),
                retain: Some(ResticRetainPolicy {
                    hourly: Some(retain.hourly),
                    daily: Some(retain.daily),
                    weekly: Some(retain.weekly),
                    monthly: Some(retain.monthly),
                    yearly: Some(retain.yearly),
                }),
            }),
        },
    }
}
