//! Integration tests for the Secret and ReplicationSource builders

use std::collections::BTreeMap;
use volsync_restic_operator::adapters::claim::ClaimRef;
use volsync_restic_operator::adapters::credentials::{ResticCredentials, RESTIC_REPOSITORY};
use volsync_restic_operator::adapters::replication_source_builder::build_replication_source;
use volsync_restic_operator::adapters::secret_builder::build_secret;
use volsync_restic_operator::config::{OperatorConfig, ReplicationDefaults};

// ============================================================================
// Test Helpers
// ============================================================================

fn credentials() -> ResticCredentials {
    let fields: BTreeMap<String, String> = [
        ("RESTIC_PASSWORD", "pass"),
        ("RESTIC_REPOSITORY", "s3://bucket/default/data-pvc"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
        ("AWS_SECRET_ACCESS_KEY", "secret"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    ResticCredentials::from_fields(&fields).unwrap()
}

fn owned_claim() -> ClaimRef {
    ClaimRef {
        uid: Some("1234-abcd".to_string()),
        ..ClaimRef::new("default", "data-pvc")
    }
}

// ============================================================================
// Secret Builder Tests
// ============================================================================

#[test]
fn secret_is_named_after_claim_in_claim_namespace() {
    let secret = build_secret(&owned_claim(), &credentials());

    assert_eq!(secret.metadata.name.as_deref(), Some("data-pvc-restic"));
    assert_eq!(secret.metadata.namespace.as_deref(), Some("default"));
    assert_eq!(secret.type_.as_deref(), Some("Opaque"));
}

#[test]
fn secret_carries_all_four_fields() {
    let secret = build_secret(&owned_claim(), &credentials());
    let data = secret.data.unwrap();

    assert_eq!(data.len(), 4);
    assert_eq!(data[RESTIC_REPOSITORY].0, b"s3://bucket/default/data-pvc".to_vec());
    assert_eq!(data["RESTIC_PASSWORD"].0, b"pass".to_vec());
}

#[test]
fn secret_serializes_base64_on_the_wire() {
    let secret = build_secret(&owned_claim(), &credentials());
    let value = serde_json::to_value(&secret).unwrap();

    assert_eq!(value["apiVersion"], "v1");
    assert_eq!(value["kind"], "Secret");
    assert_eq!(value["data"]["RESTIC_PASSWORD"], "cGFzcw==");
}

#[test]
fn secret_is_owned_by_claim() {
    let secret = build_secret(&owned_claim(), &credentials());
    let owners = secret.metadata.owner_references.unwrap();

    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "PersistentVolumeClaim");
    assert_eq!(owners[0].name, "data-pvc");
    assert_eq!(owners[0].uid, "1234-abcd");
    assert_eq!(owners[0].controller, Some(true));
}

#[test]
fn claim_without_uid_has_no_owner() {
    let secret = build_secret(&ClaimRef::new("default", "data-pvc"), &credentials());
    assert!(secret.metadata.owner_references.is_none());
}

#[test]
fn building_twice_is_identical() {
    assert_eq!(
        build_secret(&owned_claim(), &credentials()),
        build_secret(&owned_claim(), &credentials())
    );
}

// ============================================================================
// ReplicationSource Builder Tests
// ============================================================================

#[test]
fn replication_source_points_at_claim_and_secret() {
    let source = build_replication_source(&owned_claim(), &ReplicationDefaults::default());

    assert_eq!(source.metadata.name.as_deref(), Some("data-pvc"));
    assert_eq!(source.metadata.namespace.as_deref(), Some("default"));
    assert_eq!(source.spec.source_pvc, "data-pvc");

    let restic = source.spec.restic.as_ref().unwrap();
    assert_eq!(restic.repository, "data-pvc-restic");
    assert_eq!(restic.copy_method, "Snapshot");
    assert_eq!(restic.prune_interval_days, Some(14));
}

#[test]
fn replication_source_uses_configured_schedule_and_retention() {
    let config = OperatorConfig::from_yaml(
        "replication:\n  schedule: \"15 3 * * *\"\n  copyMethod: Clone\n  retain:\n    daily: 7\n",
    )
    .unwrap();
    let source = build_replication_source(&owned_claim(), &config.replication);

    assert_eq!(
        source.spec.trigger.as_ref().unwrap().schedule.as_deref(),
        Some("15 3 * * *")
    );
    let restic = source.spec.restic.unwrap();
    assert_eq!(restic.copy_method, "Clone");
    let retain = restic.retain.unwrap();
    assert_eq!(retain.daily, Some(7));
    assert_eq!(retain.hourly, Some(6));
}

#[test]
fn replication_source_wire_format() {
    let source = build_replication_source(&owned_claim(), &ReplicationDefaults::default());
    let value = serde_json::to_value(&source).unwrap();

    assert_eq!(value["apiVersion"], "volsync.backube/v1alpha1");
    assert_eq!(value["kind"], "ReplicationSource");
    assert_eq!(value["spec"]["sourcePVC"], "data-pvc");
    assert_eq!(value["spec"]["restic"]["repository"], "data-pvc-restic");
    assert_eq!(value["spec"]["restic"]["copyMethod"], "Snapshot");
    assert_eq!(value["spec"]["trigger"]["schedule"], "0 * * * *");
}
