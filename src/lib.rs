//! VolSync restic Kubernetes Operator
//!
//! Watches PersistentVolumeClaims annotated with
//! `volsync.backube/restic.enabled: "true"` and deploys a per-claim restic
//! Secret and VolSync ReplicationSource for each of them.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod namespace;
pub mod reconcilers;
pub mod state;

pub use error::{Error, Result};
