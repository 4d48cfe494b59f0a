//! Controller for annotated PersistentVolumeClaims

use futures::StreamExt;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    Api, Client, ResourceExt,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::claim::ClaimRef;
use crate::controllers::router::{self, EventKind, Route, ROUTES};
use crate::controllers::Context;
use crate::metrics::prometheus::{
    HANDLER_OUTCOMES, RECONCILE_DURATION, RECONCILIATIONS, RECONCILIATION_ERRORS, SKIPPED_EVENTS,
};
use crate::reconcilers::Outcome;
use crate::state::{DiffStore, FileStore, RecordKey, ResourceIdentity};
use crate::Error;

const KIND: &str = "PersistentVolumeClaim";

/// Run the claim controller
pub async fn run(ctx: Arc<Context>) {
    let claims: Api<PersistentVolumeClaim> = Api::all(ctx.client.clone());

    info!("Starting PersistentVolumeClaim controller");

    Controller::new(claims, Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok(o) => debug!("Reconciled {:?}", o),
                Err(e) => error!("Reconcile failed: {:?}", e),
            }
        })
        .await;

    info!("PersistentVolumeClaim controller stopped");
}

/// What to do with an observed claim
#[derive(Debug)]
pub enum Plan {
    /// Run the handler registered for this route
    Invoke(&'static Route),
    /// Already handled with identical content
    Skip,
    /// No route applies; forget any recorded state
    Purge,
}

/// Annotation prefixes written by Kubernetes components rather than users
const SYSTEM_ANNOTATION_PREFIXES: &[&str] = &[
    "kubectl.kubernetes.io/",
    "pv.kubernetes.io/",
    "volume.kubernetes.io/",
    "volume.beta.kubernetes.io/",
    "control-plane.alpha.kubernetes.io/",
];

/// The part of a claim whose changes re-trigger the handler
///
/// Binding bookkeeping (system annotations, `spec.volumeName`) is left out
/// so a claim being bound does not count as a change.
pub fn essence(pvc: &PersistentVolumeClaim) -> serde_json::Value {
    let annotations: BTreeMap<&String, &String> = pvc
        .annotations()
        .iter()
        .filter(|(key, _)| {
            !SYSTEM_ANNOTATION_PREFIXES
                .iter()
                .any(|prefix| key.starts_with(prefix))
        })
        .collect();

    let mut spec = pvc.spec.clone();
    if let Some(spec) = spec.as_mut() {
        spec.volume_name = None;
    }

    serde_json::json!({
        "annotations": annotations,
        "spec": spec,
    })
}

/// Key of the record marking a permanent failure of `handler_id`
pub fn failed_key(identity: &ResourceIdentity, handler_id: &str) -> RecordKey {
    identity.record_key(&format!("{}_failed", handler_id))
}

/// Every record key a live claim may own
pub fn record_keys(identity: &ResourceIdentity) -> Vec<RecordKey> {
    ROUTES
        .iter()
        .flat_map(|route| {
            [
                identity.record_key(route.handler_id),
                failed_key(identity, route.handler_id),
            ]
        })
        .collect()
}

/// Decide whether a claim needs its handler run
///
/// A claim without a create record is new; otherwise it is an update, and
/// an update identical to the last handled essence is skipped. A route
/// that failed permanently stays skipped until the essence changes.
pub async fn plan(
    store: &dyn DiffStore,
    identity: &ResourceIdentity,
    annotations: &BTreeMap<String, String>,
    essence: &serde_json::Value,
    deleting: bool,
) -> Plan {
    if deleting || !ROUTES.iter().any(|route| (route.predicate)(annotations)) {
        return Plan::Purge;
    }

    let created = store
        .fetch(&identity.record_key(router::handler_id(EventKind::Create)))
        .await;
    let kind = match created {
        None => EventKind::Create,
        Some(_) => EventKind::Update,
    };

    let Some(route) = router::route(kind, annotations) else {
        return Plan::Purge;
    };

    if kind == EventKind::Update {
        let last = match store.fetch(&identity.record_key(route.handler_id)).await {
            Some(updated) => Some(updated),
            None => created,
        };
        if last.as_ref() == Some(essence) {
            return Plan::Skip;
        }
    }

    let failed = store.fetch(&failed_key(identity, route.handler_id)).await;
    if failed.as_ref() == Some(essence) {
        return Plan::Skip;
    }

    Plan::Invoke(route)
}

/// Remove every handler's records for a resource
pub async fn purge(store: &dyn DiffStore, identity: &ResourceIdentity) {
    for key in record_keys(identity) {
        store.purge(&key).await;
    }
}

/// Record the result of a handler run and turn it into a controller action
///
/// Success stores the essence as handled. A permanent failure stores it as
/// failed, so only a real change to the claim runs the handler again.
pub async fn apply_outcome(
    store: &dyn DiffStore,
    identity: &ResourceIdentity,
    route: &Route,
    essence: &serde_json::Value,
    outcome: Outcome,
) -> Result<Action, Error> {
    match outcome {
        Outcome::Success => {
            store
                .store(&identity.record_key(route.handler_id), essence)
                .await?;
            store.purge(&failed_key(identity, route.handler_id)).await;
            info!(
                "Handler {} succeeded for {}/{}",
                route.handler_id, identity.namespace, identity.name
            );
            Ok(Action::await_change())
        }
        Outcome::RetryAfter { delay, reason } => {
            warn!(
                "Handler {} for {}/{} will retry in {}s: {}",
                route.handler_id,
                identity.namespace,
                identity.name,
                delay.as_secs(),
                reason
            );
            Ok(Action::requeue(delay))
        }
        Outcome::Fatal(reason) => {
            error!(
                "Handler {} failed permanently for {}/{}: {}",
                route.handler_id, identity.namespace, identity.name, reason
            );
            if let Err(e) = store
                .store(&failed_key(identity, route.handler_id), essence)
                .await
            {
                warn!("Failed to record permanent failure: {}", e);
            }
            Ok(Action::await_change())
        }
    }
}

/// Drop records of claims that were deleted while the operator was down
pub async fn sweep_stale_records(client: &Client, store: &FileStore) -> Result<usize, Error> {
    let claims: Api<PersistentVolumeClaim> = Api::all(client.clone());
    let live = claims
        .list(&ListParams::default())
        .await
        .map_err(|e| Error::KubeError(format!("Failed to list PersistentVolumeClaims: {}", e)))?;

    let keys: HashSet<RecordKey> = live
        .items
        .iter()
        .flat_map(|pvc| record_keys(&ResourceIdentity::of(pvc)))
        .collect();

    store.retain(&keys).await
}

/// Reconcile a PersistentVolumeClaim
#[instrument(skip(pvc, ctx), fields(name = %pvc.name_any(), namespace = pvc.namespace().unwrap_or_default()))]
async fn reconcile(pvc: Arc<PersistentVolumeClaim>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = std::time::Instant::now();
    let claim = ClaimRef::from_claim(&pvc);
    let identity = ResourceIdentity::of(pvc.as_ref());
    let essence = essence(&pvc);
    let deleting = pvc.metadata.deletion_timestamp.is_some();

    RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let route = match plan(
        ctx.store.as_ref(),
        &identity,
        pvc.annotations(),
        &essence,
        deleting,
    )
    .await
    {
        Plan::Invoke(route) => route,
        Plan::Skip => {
            SKIPPED_EVENTS.with_label_values(&[KIND]).inc();
            debug!("PVC {}/{} unchanged since last run", claim.namespace, claim.name);
            return Ok(Action::await_change());
        }
        Plan::Purge => {
            purge(ctx.store.as_ref(), &identity).await;
            return Ok(Action::await_change());
        }
    };

    let outcome = ctx.reconciler.handle(&claim).await;

    let duration = start.elapsed().as_secs_f64();
    RECONCILE_DURATION.with_label_values(&[KIND]).observe(duration);
    HANDLER_OUTCOMES
        .with_label_values(&[route.handler_id, outcome.label()])
        .inc();
    debug!(
        "Handler {} for {}/{} ran in {:.2}s",
        route.handler_id, claim.namespace, claim.name, duration
    );

    apply_outcome(ctx.store.as_ref(), &identity, route, &essence, outcome).await
}

/// Error policy for the controller
fn error_policy(pvc: Arc<PersistentVolumeClaim>, err: &Error, _ctx: Arc<Context>) -> Action {
    let ns = pvc.namespace().unwrap_or_default();
    let name = pvc.name_any();

    RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
    error!("Reconciliation error for {}/{}: {:?}", ns, name, err);

    requeue_for(err)
}

/// Requeue delay for a controller-level error
pub fn requeue_for(err: &Error) -> Action {
    match err {
        Error::StorageError(_) | Error::KubeError(_) => Action::requeue(Duration::from_secs(30)),
        _ => Action::requeue(Duration::from_secs(300)),
    }
}
