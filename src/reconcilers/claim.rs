//! Handler deploying the restic Secret and ReplicationSource for a claim

use std::sync::Arc;
use tracing::{error, info};

use crate::adapters::claim::ClaimRef;
use crate::adapters::credentials::{self, ResticCredentials};
use crate::adapters::deployer::{Deployer, Template};
use crate::adapters::secrets::{is_not_found, SecretReader};
use crate::namespace::NamespaceResolver;
use crate::reconcilers::Outcome;

/// Creates or updates the VolSync objects for a claim
///
/// The handler is idempotent: running it again for the same claim and
/// source Secret re-applies identical objects.
pub struct ClaimReconciler {
    secrets: Arc<dyn SecretReader>,
    deployer: Arc<dyn Deployer>,
    namespaces: Arc<NamespaceResolver>,
    source_secret_name: String,
}

impl ClaimReconciler {
    pub fn new(
        secrets: Arc<dyn SecretReader>,
        deployer: Arc<dyn Deployer>,
        namespaces: Arc<NamespaceResolver>,
        source_secret_name: impl Into<String>,
    ) -> Self {
        Self {
            secrets,
            deployer,
            namespaces,
            source_secret_name: source_secret_name.into(),
        }
    }

    /// Run the handler for one claim
    pub async fn handle(&self, claim: &ClaimRef) -> Outcome {
        info!("PVC {} changed in namespace {}", claim.name, claim.namespace);

        // The source Secret lives next to the operator, not next to the claim
        let source_namespace = match self.namespaces.resolve() {
            Ok(namespace) => namespace,
            Err(e) => return Outcome::fatal(e.to_string()),
        };

        let source = match self
            .secrets
            .get_secret(&source_namespace, &self.source_secret_name)
            .await
        {
            Ok(secret) => secret,
            Err(e) if is_not_found(&e) => {
                error!(
                    "Source secret {} not found in namespace {}",
                    self.source_secret_name, source_namespace
                );
                return Outcome::fatal(format!(
                    "Source secret {} does not exist",
                    self.source_secret_name
                ));
            }
            Err(e) => return Outcome::retry(format!("Failed to fetch source secret: {}", e)),
        };

        let data = source.data.unwrap_or_default();
        let credentials = match credentials::transform(&data, &claim.namespace, &claim.name)
            .and_then(|fields| ResticCredentials::from_fields(&fields))
        {
            Ok(credentials) => credentials,
            Err(e) => {
                return Outcome::fatal(format!(
                    "Source secret {} is unusable: {}",
                    self.source_secret_name, e
                ))
            }
        };

        if let Err(e) = self
            .deployer
            .deploy(&Template::Secret(credentials), claim)
            .await
        {
            return Outcome::retry(format!(
                "Failed to create Secret for PVC {}: {}",
                claim.name, e
            ));
        }

        if let Err(e) = self
            .deployer
            .deploy(&Template::ReplicationSource, claim)
            .await
        {
            return Outcome::retry(format!(
                "Failed to create ReplicationSource for PVC {}: {}",
                claim.name, e
            ));
        }

        info!("All volsync resources for PVC {} have been deployed", claim.name);
        Outcome::Success
    }
}
