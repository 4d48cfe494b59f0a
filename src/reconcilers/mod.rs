//! Reconciliation logic for annotated PersistentVolumeClaims

pub mod claim;

use std::time::Duration;

/// Delay before a temporarily failed handler runs again
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Result of one handler invocation, interpreted by the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Everything was deployed
    Success,
    /// A transient failure; run again after `delay`
    RetryAfter { delay: Duration, reason: String },
    /// Retrying cannot help until something outside the operator changes
    Fatal(String),
}

impl Outcome {
    /// Transient failure with the standard retry delay
    pub fn retry(reason: impl Into<String>) -> Self {
        Outcome::RetryAfter {
            delay: RETRY_DELAY,
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Outcome::Fatal(reason.into())
    }

    /// Metric label for this outcome
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::RetryAfter { .. } => "retry",
            Outcome::Fatal(_) => "fatal",
        }
    }
}
