//! Bucketsweep cleanup job
//!
//! Removes objects older than a retention window from a single bucket,
//! optionally narrowed by key suffix and key prefix. A pass can run in dry-run
//! mode, reports what it removed, notifies an alert destination when it fails
//! and publishes deletion counters when it succeeds.

pub mod config;
pub mod error;
pub mod filter;
pub mod job;
pub mod metrics;
pub mod notify;
pub mod report;
pub mod storage;

// Re-export commonly used types
pub use config::{CleanupConfig, ConfigError, JobSettings};
pub use error::CleanupError;
pub use filter::{CutoffInstant, ObjectFilter};
pub use job::{CleanupJob, CleanupOutcome};
pub use metrics::{MetricsError, MetricsPublisher, OtelMetricsPublisher, SweepStats};
pub use notify::{Notifier, NotifyError, WebhookNotifier};
pub use report::{CleanupResult, DeletionWarning};
pub use storage::{
    ObjectStorage, ObjectStoreConnector, ObjectStoreStorage, StorageConnector, StorageError,
    StorageObjectRef,
};
