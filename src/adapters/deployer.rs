//! Rendering and applying the objects derived from a claim

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use tracing::debug;

use crate::adapters::claim::ClaimRef;
use crate::adapters::credentials::ResticCredentials;
use crate::adapters::{replication_source_builder, secret_builder};
use crate::config::ReplicationDefaults;
use crate::crd::ReplicationSource;
use crate::{Error, Result};

#[cfg(test)]
use mockall::automock;

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "volsync-restic-operator";

/// A template together with its substitution parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Template {
    /// Per-claim restic credentials
    Secret(ResticCredentials),
    /// ReplicationSource for the claim; needs nothing beyond its identity
    ReplicationSource,
}

impl Template {
    pub fn template_name(&self) -> &'static str {
        match self {
            Template::Secret(_) => "secret.yaml",
            Template::ReplicationSource => "replicationsource.yaml",
        }
    }
}

/// Renders a template for a claim and upserts the result
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Create or update the object `template` describes for `claim`
    ///
    /// Re-deploying identical content must succeed.
    async fn deploy(&self, template: &Template, claim: &ClaimRef) -> Result<()>;
}

/// [`Deployer`] applying typed objects with server-side apply
#[derive(Clone)]
pub struct KubeDeployer {
    client: Client,
    replication: ReplicationDefaults,
}

impl KubeDeployer {
    pub fn new(client: Client, replication: ReplicationDefaults) -> Self {
        Self {
            client,
            replication,
        }
    }
}

#[async_trait]
impl Deployer for KubeDeployer {
    async fn deploy(&self, template: &Template, claim: &ClaimRef) -> Result<()> {
        let patch_params = PatchParams::apply(FIELD_MANAGER).force();

        match template {
            Template::Secret(credentials) => {
                let secret = secret_builder::build_secret(claim, credentials);
                let name = claim.secret_name();
                let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &claim.namespace);
                secrets
                    .patch(&name, &patch_params, &Patch::Apply(&secret))
                    .await
                    .map_err(|e| {
                        Error::KubeError(format!("Failed to create/update Secret {}: {}", name, e))
                    })?;
                debug!("Applied Secret {}/{}", claim.namespace, name);
            }
            Template::ReplicationSource => {
                let source =
                    replication_source_builder::build_replication_source(claim, &self.replication);
                let sources: Api<ReplicationSource> =
                    Api::namespaced(self.client.clone(), &claim.namespace);
                sources
                    .patch(&claim.name, &patch_params, &Patch::Apply(&source))
                    .await
                    .map_err(|e| {
                        Error::KubeError(format!(
                            "Failed to create/update ReplicationSource {}: {}",
                            claim.name, e
                        ))
                    })?;
                debug!("Applied ReplicationSource {}/{}", claim.namespace, claim.name);
            }
        }

        Ok(())
    }
}
