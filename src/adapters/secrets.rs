//! Kubernetes secret fetching

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

#[cfg(test)]
use mockall::automock;

/// Read access to Secrets
///
/// Errors are returned as raw `kube::Error` so callers can tell a missing
/// Secret apart from a failing API server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// Fetch a secret by name from the given namespace
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, kube::Error>;
}

/// [`SecretReader`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretReader {
    client: Client,
}

impl KubeSecretReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for KubeSecretReader {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, kube::Error> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        secrets.get(name).await
    }
}

/// True when the error is the API server reporting the object does not exist
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}
