//! Prometheus metrics for the VolSync restic operator
//!
//! This module exposes metrics for monitoring operator health and performance.

pub mod prometheus;

pub use self::prometheus::*;
