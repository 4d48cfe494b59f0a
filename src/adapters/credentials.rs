//! Derivation of per-claim restic credentials from the source Secret

use k8s_openapi::ByteString;
use std::collections::BTreeMap;

use crate::{Error, Result};

pub const RESTIC_PASSWORD: &str = "RESTIC_PASSWORD";
pub const RESTIC_REPOSITORY: &str = "RESTIC_REPOSITORY";
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Decode every field of `data` and scope the repository to one claim
///
/// `RESTIC_REPOSITORY` becomes `<repository>/<claim_namespace>/<claim_name>`;
/// every other field is passed through decoded. Always call this with the
/// source Secret's data; feeding it its own output would nest the path again.
pub fn transform(
    data: &BTreeMap<String, ByteString>,
    claim_namespace: &str,
    claim_name: &str,
) -> Result<BTreeMap<String, String>> {
    data.iter()
        .map(|(key, value)| {
            let decoded = decode(key, value)?;
            let decoded = if key == RESTIC_REPOSITORY {
                format!("{}/{}/{}", decoded, claim_namespace, claim_name)
            } else {
                decoded
            };
            Ok((key.clone(), decoded))
        })
        .collect()
}

fn decode(key: &str, value: &ByteString) -> Result<String> {
    String::from_utf8(value.0.clone())
        .map_err(|e| Error::DecodingError(format!("Field '{}' is not valid UTF-8: {}", key, e)))
}

/// The four fields a restic ReplicationSource needs
#[derive(Clone, PartialEq, Eq)]
pub struct ResticCredentials {
    pub restic_password: String,
    pub restic_repository: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
}

impl ResticCredentials {
    /// Pick the required fields out of decoded Secret data
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let field = |key: &str| {
            fields
                .get(key)
                .cloned()
                .ok_or_else(|| Error::SecretError(format!("Key '{}' not found in secret", key)))
        };

        Ok(Self {
            restic_password: field(RESTIC_PASSWORD)?,
            restic_repository: field(RESTIC_REPOSITORY)?,
            aws_access_key_id: field(AWS_ACCESS_KEY_ID)?,
            aws_secret_access_key: field(AWS_SECRET_ACCESS_KEY)?,
        })
    }

    /// Secret data keyed by the environment variable names restic expects
    pub fn to_data(&self) -> BTreeMap<String, ByteString> {
        [
            (RESTIC_PASSWORD, &self.restic_password),
            (RESTIC_REPOSITORY, &self.restic_repository),
            (AWS_ACCESS_KEY_ID, &self.aws_access_key_id),
            (AWS_SECRET_ACCESS_KEY, &self.aws_secret_access_key),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), ByteString(value.as_bytes().to_vec())))
        .collect()
    }
}

// Keeps secret material out of logs and panic messages
impl std::fmt::Debug for ResticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResticCredentials")
            .field("restic_repository", &self.restic_repository)
            .field("restic_password", &"<redacted>")
            .field("aws_access_key_id", &"<redacted>")
            .field("aws_secret_access_key", &"<redacted>")
            .finish()
    }
}
