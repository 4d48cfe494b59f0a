//! Controller implementations for watching and reconciling resources

pub mod claim_controller;
pub mod router;

use kube::Client;
use std::sync::Arc;

use crate::reconcilers::claim::ClaimReconciler;
use crate::state::DiffStore;

/// Shared context for controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Last-handled state per claim and handler
    pub store: Arc<dyn DiffStore>,
    /// Handler for annotated claims
    pub reconciler: ClaimReconciler,
}

impl Context {
    /// Create a new context
    pub fn new(client: Client, store: Arc<dyn DiffStore>, reconciler: ClaimReconciler) -> Arc<Self> {
        Arc::new(Self {
            client,
            store,
            reconciler,
        })
    }
}
