//! Cleanup orchestration.
//!
//! One invocation walks through: load config, compute the cutoff, connect to
//! the bucket, stream the listing through the filter, delete (or pretend to)
//! each eligible object, publish metrics, and render the report. Invalid
//! configuration stops the invocation before any collaborator is touched.
//! Any later error ends in the failure state, which sends exactly one
//! notification.

use chrono::{DateTime, Utc};
use figment::Figment;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::{CleanupConfig, ConfigError};
use crate::error::CleanupError;
use crate::filter::{CutoffInstant, ObjectFilter};
use crate::metrics::MetricsPublisher;
use crate::notify::{FAILURE_SUBJECT, Notifier};
use crate::report::{CleanupResult, DeletionWarning};
use crate::storage::{StorageConnector, StorageError};

pub const ERROR_PREFIX: &str = "Error processing request: ";
pub const FAILURE_BODY_PREFIX: &str = "Error during cleanup process: ";

/// Process exit code for an invocation stopped by invalid configuration.
pub const INVALID_CONFIG_EXIT_CODE: u8 = 2;

/// Terminal state of one invocation.
///
/// `Display` renders the text handed back to the caller.
#[derive(Debug)]
pub enum CleanupOutcome {
    Completed(CleanupResult),
    InvalidConfig(ConfigError),
    Failed(String),
}

impl CleanupOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// 0 when completed, 2 for invalid configuration, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Completed(_) => 0,
            Self::InvalidConfig(_) => INVALID_CONFIG_EXIT_CODE,
            Self::Failed(_) => 1,
        }
    }

    pub fn result(&self) -> Option<&CleanupResult> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(result) => write!(f, "{result}"),
            Self::InvalidConfig(e) => write!(f, "{e}"),
            Self::Failed(message) => write!(f, "{ERROR_PREFIX}{message}"),
        }
    }
}

/// Drives a cleanup pass against its storage, notification and metrics
/// collaborators.
pub struct CleanupJob {
    connector: Arc<dyn StorageConnector>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<dyn MetricsPublisher>,
    alert_destination: Option<String>,
}

impl CleanupJob {
    pub fn new(
        connector: Arc<dyn StorageConnector>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<dyn MetricsPublisher>,
    ) -> Self {
        Self {
            connector,
            notifier,
            metrics,
            alert_destination: None,
        }
    }

    /// Where the failure notification goes. Without one, failures are only
    /// logged.
    pub fn with_alert_destination(mut self, destination: Option<String>) -> Self {
        self.alert_destination = destination.filter(|d| !d.is_empty());
        self
    }

    /// Run one invocation with the configuration held by `figment`.
    pub async fn run(&self, figment: &Figment) -> CleanupOutcome {
        self.run_at(figment, Utc::now()).await
    }

    /// Run one invocation as if it started at `now`.
    pub async fn run_at(&self, figment: &Figment, now: DateTime<Utc>) -> CleanupOutcome {
        info!("Starting daily cleanup process");

        let config = match CleanupConfig::from_figment(figment) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Rejected cleanup configuration");
                return CleanupOutcome::InvalidConfig(e);
            }
        };

        info!(
            bucket = %config.bucket_name,
            retention_days = config.retention_days,
            dry_run = config.dry_run,
            file_types = ?config.file_type_suffixes,
            prefixes = ?config.key_prefixes,
            "Loaded cleanup configuration"
        );

        match self.execute(&config, now).await {
            Ok(result) => {
                info!(
                    bucket = %result.bucket(),
                    count = result.count(),
                    total_bytes = result.total_bytes(),
                    delete_failures = result.warnings().len(),
                    dry_run = result.dry_run(),
                    "Cleanup completed successfully"
                );
                CleanupOutcome::Completed(result)
            }
            Err(e) => {
                let message = e.to_string();
                error!(bucket = %config.bucket_name, error = %message, "Error during cleanup process");
                self.notify_failure(&message).await;
                CleanupOutcome::Failed(message)
            }
        }
    }

    /// The cleanup pass proper, for an already validated config.
    ///
    /// Deletes are issued one at a time in listing order. A failed delete is
    /// recorded as a warning and the object still counts as processed.
    pub async fn execute(
        &self,
        config: &CleanupConfig,
        now: DateTime<Utc>,
    ) -> Result<CleanupResult, CleanupError> {
        let cutoff = CutoffInstant::compute(now, config.retention_days)?;
        let filter = ObjectFilter::new(config, cutoff);
        let storage = self.connector.connect(&config.bucket_name)?;

        info!(
            bucket = %config.bucket_name,
            cutoff = %cutoff,
            dry_run = config.dry_run,
            "Scanning bucket for expired objects"
        );

        let mut result = CleanupResult::new(config.bucket_name.as_str(), config.dry_run);
        let mut listed = 0usize;
        let mut objects = storage.list_objects();

        while let Some(object) = objects.next().await {
            let object = object?;
            listed += 1;

            if !filter.is_eligible(&object) {
                debug!(
                    key = %object.key,
                    last_modified = %object.last_modified,
                    "Skipping object"
                );
                continue;
            }

            if config.dry_run {
                info!(
                    key = %object.key,
                    size_bytes = object.size_bytes,
                    last_modified = %object.last_modified,
                    "[DRY-RUN] Would delete object"
                );
            } else {
                match storage.delete_object(&object.key).await {
                    Ok(()) => {
                        info!(
                            key = %object.key,
                            size_bytes = object.size_bytes,
                            "Deleted object"
                        );
                    }
                    Err(e) => {
                        warn!(key = %object.key, error = %e, "Failed to delete object");
                        result.record_warning(DeletionWarning {
                            key: object.key.clone(),
                            message: delete_failure_message(e),
                        });
                    }
                }
            }

            result.record_eligible(&object.key, object.last_modified, object.size_bytes);
        }

        info!(
            bucket = %config.bucket_name,
            listed,
            eligible = result.count(),
            total_bytes = result.total_bytes(),
            "Finished scanning bucket"
        );

        if result.count() > 0 && !config.dry_run {
            self.metrics
                .publish_metrics(&config.bucket_name, result.count(), result.total_bytes())
                .await?;
        }

        Ok(result)
    }

    async fn notify_failure(&self, message: &str) {
        let Some(destination) = self.alert_destination.as_deref() else {
            error!("No alert destination configured, failure notification not sent");
            return;
        };

        let body = format!("{FAILURE_BODY_PREFIX}{message}");
        if let Err(e) = self
            .notifier
            .send_notification(destination, FAILURE_SUBJECT, &body)
            .await
        {
            error!(destination = %destination, error = %e, "Failed to send failure notification");
        }
    }
}

fn delete_failure_message(error: StorageError) -> String {
    match error {
        StorageError::Delete { source, .. } => source.to_string(),
        other => other.to_string(),
    }
}
