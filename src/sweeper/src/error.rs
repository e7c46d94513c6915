use thiserror::Error;

use crate::metrics::MetricsError;
use crate::storage::StorageError;

/// Operational failures that end a cleanup pass.
///
/// Each of these triggers the failure notification. Per-object delete
/// failures are not in here; they are collected as warnings instead.
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Retention of {retention_days} days reaches before the earliest representable time")]
    CutoffUnderflow { retention_days: u32 },

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
