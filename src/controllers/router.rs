//! Routing of claim events to handlers
//!
//! Each route pairs an event kind with a predicate over the claim's
//! annotations. The handler id of the matching route also keys the
//! change-detection record written after the handler succeeds.

use std::collections::BTreeMap;

/// Annotation that opts a claim into restic backups
pub const RESTIC_ENABLED_ANNOTATION: &str = "volsync.backube/restic.enabled";

/// Handler id for newly observed claims
pub const ON_CREATE: &str = "on_create_pvc";
/// Handler id for changes to claims that were already handled
pub const ON_UPDATE: &str = "on_update_pvc";

/// Kind of change observed for a claim
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Create,
    Update,
}

/// One entry of the routing table
pub struct Route {
    pub kind: EventKind,
    pub handler_id: &'static str,
    pub predicate: fn(&BTreeMap<String, String>) -> bool,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("kind", &self.kind)
            .field("handler_id", &self.handler_id)
            .finish_non_exhaustive()
    }
}

/// Create and update share the same handler procedure
pub static ROUTES: &[Route] = &[
    Route {
        kind: EventKind::Create,
        handler_id: ON_CREATE,
        predicate: restic_enabled,
    },
    Route {
        kind: EventKind::Update,
        handler_id: ON_UPDATE,
        predicate: restic_enabled,
    },
];

/// True when the claim carries `volsync.backube/restic.enabled: "true"`
pub fn restic_enabled(annotations: &BTreeMap<String, String>) -> bool {
    annotations
        .get(RESTIC_ENABLED_ANNOTATION)
        .is_some_and(|value| value == "true")
}

/// First route matching the event kind and annotations
pub fn route(kind: EventKind, annotations: &BTreeMap<String, String>) -> Option<&'static Route> {
    ROUTES
        .iter()
        .find(|route| route.kind == kind && (route.predicate)(annotations))
}

/// Handler id of the route for `kind`, regardless of predicates
pub fn handler_id(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Create => ON_CREATE,
        EventKind::Update => ON_UPDATE,
    }
}
