//! Resolution of the namespace the operator itself runs in
//!
//! The source credentials live in the operator's namespace, not in the
//! namespace of the claim being reconciled. Sources are tried in order and
//! the first one that yields a namespace wins.

use kube::config::Kubeconfig;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

use crate::{Error, Result};

/// Namespace file mounted into every pod with a service account token
pub const SERVICE_ACCOUNT_NAMESPACE_PATH: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Outcome of asking a single source for the namespace
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The source knows the namespace
    Found(String),
    /// The source does not apply in this environment
    NotApplicable(String),
}

/// A single strategy for discovering the operator namespace
pub trait NamespaceSource: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Try to determine the namespace
    fn resolve(&self) -> Resolution;
}

/// Reads the namespace mounted alongside the in-cluster service account
#[derive(Clone, Debug)]
pub struct ServiceAccountNamespace {
    path: PathBuf,
}

impl ServiceAccountNamespace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ServiceAccountNamespace {
    fn default() -> Self {
        Self::new(SERVICE_ACCOUNT_NAMESPACE_PATH)
    }
}

impl NamespaceSource for ServiceAccountNamespace {
    fn name(&self) -> &'static str {
        "service-account"
    }

    fn resolve(&self) -> Resolution {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let namespace = contents.trim();
                if namespace.is_empty() {
                    Resolution::NotApplicable(format!("{} is empty", self.path.display()))
                } else {
                    Resolution::Found(namespace.to_string())
                }
            }
            Err(e) => Resolution::NotApplicable(format!("{}: {}", self.path.display(), e)),
        }
    }
}

/// Reads the namespace of the current kubeconfig context
#[derive(Clone, Debug, Default)]
pub struct KubeconfigNamespace {
    /// Explicit kubeconfig path; `None` uses `$KUBECONFIG` or `~/.kube/config`
    path: Option<PathBuf>,
}

impl KubeconfigNamespace {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl NamespaceSource for KubeconfigNamespace {
    fn name(&self) -> &'static str {
        "kubeconfig"
    }

    fn resolve(&self) -> Resolution {
        let loaded = match &self.path {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        };
        match loaded {
            Ok(config) => namespace_from_kubeconfig(&config),
            Err(e) => Resolution::NotApplicable(format!("failed to load kubeconfig: {}", e)),
        }
    }
}

/// Select the namespace of the context named by `current-context`
pub fn namespace_from_kubeconfig(config: &Kubeconfig) -> Resolution {
    let Some(current) = config.current_context.as_deref() else {
        return Resolution::NotApplicable("kubeconfig has no current-context".to_string());
    };

    let namespace = config
        .contexts
        .iter()
        .find(|named| named.name == current)
        .and_then(|named| named.context.as_ref())
        .and_then(|context| context.namespace.clone())
        .filter(|ns| !ns.is_empty());

    match namespace {
        Some(ns) => Resolution::Found(ns),
        None => Resolution::NotApplicable(format!(
            "context '{}' does not set a namespace",
            current
        )),
    }
}

/// Ordered list of namespace sources with a process-wide cache
pub struct NamespaceResolver {
    sources: Vec<Box<dyn NamespaceSource>>,
    resolved: OnceLock<String>,
}

impl NamespaceResolver {
    pub fn new(sources: Vec<Box<dyn NamespaceSource>>) -> Self {
        Self {
            sources,
            resolved: OnceLock::new(),
        }
    }

    /// In-cluster service account first, then the local kubeconfig
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(ServiceAccountNamespace::default()),
            Box::new(KubeconfigNamespace::default()),
        ])
    }

    /// Return the operator namespace, consulting sources until one answers
    pub fn resolve(&self) -> Result<String> {
        if let Some(namespace) = self.resolved.get() {
            return Ok(namespace.clone());
        }

        let mut skipped = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.resolve() {
                Resolution::Found(namespace) => {
                    debug!(source = source.name(), %namespace, "Resolved operator namespace");
                    let _ = self.resolved.set(namespace.clone());
                    return Ok(namespace);
                }
                Resolution::NotApplicable(reason) => {
                    debug!(source = source.name(), %reason, "Namespace source not applicable");
                    skipped.push(format!("{}: {}", source.name(), reason));
                }
            }
        }

        Err(Error::ConfigError(format!(
            "Unable to determine operator namespace ({})",
            skipped.join("; ")
        )))
    }
}
