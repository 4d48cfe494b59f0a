//! Per-claim restic Secret builder

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::adapters::claim::ClaimRef;
use crate::adapters::credentials::ResticCredentials;

/// Build the restic Secret for a claim
pub fn build_secret(claim: &ClaimRef, credentials: &ResticCredentials) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(claim.secret_name()),
            namespace: Some(claim.namespace.clone()),
            labels: Some(claim.labels()),
            owner_references: claim.owner_references(),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(credentials.to_data()),
        ..Default::default()
    }
}
