//! Error types for the class reconciler.

use crate::store::ClassKey;
use std::time::Duration;
use thiserror::Error;

/// Reconcile errors.
///
/// None of these are retried inside the operator; the controller's error
/// policy requeues the class.
#[derive(Debug, Error)]
pub enum Error {
    /// Class disappeared before its status could be written.
    #[error("machine class not found: {0}")]
    NotFound(ClassKey),

    /// Another writer updated the class since it was read.
    #[error("version conflict writing status of {0}")]
    VersionConflict(ClassKey),

    /// Class was read without a resource version to guard the write.
    #[error("machine class {0} has no resource version")]
    MissingVersion(ClassKey),

    /// Kubernetes API error.
    #[error("Kubernetes error: {0}")]
    Kube(#[source] kube::Error),

    /// Store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store call did not finish before its deadline.
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Version conflicts are cheap to retry: the next attempt reads fresh state.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::VersionConflict(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::VersionConflict(_) => "conflict",
            Error::MissingVersion(_) => "missing_version",
            Error::Kube(_) => "kube",
            Error::Unavailable(_) => "unavailable",
            Error::Timeout(_) => "timeout",
            Error::Serialization(_) => "serialization",
        }
    }
}

/// Result type for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;
