//! Integration tests for deriving per-claim restic credentials
//!
//! These tests feed Secrets through the same base64 wire decoding the
//! Kubernetes client uses and check the derived fields.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::BTreeMap;
use volsync_restic_operator::adapters::credentials::{
    transform, ResticCredentials, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, RESTIC_PASSWORD,
    RESTIC_REPOSITORY,
};
use volsync_restic_operator::Error;

// ============================================================================
// Test Helpers
// ============================================================================

/// Source Secret as the API server would return it
fn source_secret_data() -> BTreeMap<String, ByteString> {
    let secret: Secret = serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": "volsync-restic-secrets" },
        "data": {
            "RESTIC_PASSWORD": "cGFzcw==",
            "RESTIC_REPOSITORY": "czM6Ly9idWNrZXQ=",
            "AWS_ACCESS_KEY_ID": "QUtJQQ==",
            "AWS_SECRET_ACCESS_KEY": "c2VjcmV0"
        }
    }))
    .unwrap();
    secret.data.unwrap()
}

fn bytes(value: &str) -> ByteString {
    ByteString(value.as_bytes().to_vec())
}

// ============================================================================
// Transform Tests
// ============================================================================

#[test]
fn repository_is_scoped_to_claim() {
    let fields = transform(&source_secret_data(), "default", "data-pvc").unwrap();
    assert_eq!(fields[RESTIC_REPOSITORY], "s3://bucket/default/data-pvc");
}

#[test]
fn other_fields_pass_through_decoded() {
    let fields = transform(&source_secret_data(), "default", "data-pvc").unwrap();
    assert_eq!(fields[RESTIC_PASSWORD], "pass");
    assert_eq!(fields[AWS_ACCESS_KEY_ID], "AKIA");
    assert_eq!(fields[AWS_SECRET_ACCESS_KEY], "secret");
    assert_eq!(fields.len(), 4);
}

#[test]
fn extra_fields_are_preserved() {
    let mut data = source_secret_data();
    data.insert("RESTIC_CACHE_DIR".to_string(), bytes("/cache"));

    let fields = transform(&data, "apps", "db").unwrap();
    assert_eq!(fields["RESTIC_CACHE_DIR"], "/cache");
    assert_eq!(fields[RESTIC_REPOSITORY], "s3://bucket/apps/db");
}

#[test]
fn transform_of_original_is_repeatable() {
    let data = source_secret_data();
    let first = transform(&data, "default", "data-pvc").unwrap();
    let second = transform(&data, "default", "data-pvc").unwrap();
    assert_eq!(first, second);
}

#[test]
fn repository_suffix_matches_for_many_claims() {
    let data = source_secret_data();
    let claims = [
        ("default", "data-pvc"),
        ("kube-system", "etcd"),
        ("team-a", "postgres-0"),
        ("x", "y"),
    ];

    for (namespace, name) in claims {
        let fields = transform(&data, namespace, name).unwrap();
        assert_eq!(
            fields[RESTIC_REPOSITORY],
            format!("s3://bucket/{}/{}", namespace, name)
        );
        assert_eq!(fields[RESTIC_PASSWORD], "pass");
    }
}

#[test]
fn invalid_utf8_is_decoding_error() {
    let mut data = source_secret_data();
    data.insert(RESTIC_PASSWORD.to_string(), ByteString(vec![0xff, 0xfe, 0x00]));

    match transform(&data, "default", "data-pvc") {
        Err(Error::DecodingError(msg)) => assert!(msg.contains(RESTIC_PASSWORD)),
        other => panic!("expected decoding error, got {:?}", other),
    }
}

#[test]
fn empty_secret_transforms_to_empty_map() {
    let fields = transform(&BTreeMap::new(), "default", "data-pvc").unwrap();
    assert!(fields.is_empty());
}

// ============================================================================
// Required Field Tests
// ============================================================================

#[test]
fn credentials_pick_required_fields() {
    let fields = transform(&source_secret_data(), "default", "data-pvc").unwrap();
    let credentials = ResticCredentials::from_fields(&fields).unwrap();

    assert_eq!(credentials.restic_password, "pass");
    assert_eq!(credentials.restic_repository, "s3://bucket/default/data-pvc");
    assert_eq!(credentials.aws_access_key_id, "AKIA");
    assert_eq!(credentials.aws_secret_access_key, "secret");
}

#[test]
fn missing_required_field_is_secret_error() {
    let mut fields = transform(&source_secret_data(), "default", "data-pvc").unwrap();
    fields.remove(AWS_SECRET_ACCESS_KEY);

    let err = ResticCredentials::from_fields(&fields).unwrap_err();
    assert!(matches!(err, Error::SecretError(_)));
    assert!(err.to_string().contains(AWS_SECRET_ACCESS_KEY));
}

#[test]
fn credentials_debug_redacts_secrets() {
    let fields = transform(&source_secret_data(), "default", "data-pvc").unwrap();
    let credentials = ResticCredentials::from_fields(&fields).unwrap();
    let printed = format!("{:?}", credentials);

    assert!(!printed.contains("pass\""));
    assert!(!printed.contains("AKIA"));
    assert!(!printed.contains("\"secret\""));
    assert!(printed.contains("s3://bucket/default/data-pvc"));
}
