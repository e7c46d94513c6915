//! Deletion metrics.
//!
//! [`MetricsPublisher`] is the per-run collaborator that reports what a
//! successful, non-dry-run pass removed. [`SweepStats`] keeps cumulative
//! in-process counters across scheduled runs for the summary log line.

use async_trait::async_trait;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Meter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;

use crate::report::CleanupResult;

#[derive(Error, Debug)]
#[error("Failed to publish metrics for bucket {bucket}: {message}")]
pub struct MetricsError {
    pub bucket: String,
    pub message: String,
}

/// Publishes the outcome of one cleanup pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsPublisher: Send + Sync {
    async fn publish_metrics(
        &self,
        bucket: &str,
        deleted_count: u64,
        total_bytes: u64,
    ) -> Result<(), MetricsError>;
}

/// Records deletions on OpenTelemetry counters tagged with the bucket.
#[derive(Clone)]
pub struct OtelMetricsPublisher {
    objects_deleted: Counter<u64>,
    bytes_deleted: Counter<u64>,
}

impl OtelMetricsPublisher {
    pub fn new(meter: &Meter) -> Self {
        let objects_deleted = meter
            .u64_counter("bucketsweep.objects_deleted")
            .with_description("Objects deleted by the cleanup job")
            .with_unit("{object}")
            .build();
        let bytes_deleted = meter
            .u64_counter("bucketsweep.bytes_deleted")
            .with_description("Bytes freed by the cleanup job")
            .with_unit("By")
            .build();

        Self {
            objects_deleted,
            bytes_deleted,
        }
    }
}

#[async_trait]
impl MetricsPublisher for OtelMetricsPublisher {
    async fn publish_metrics(
        &self,
        bucket: &str,
        deleted_count: u64,
        total_bytes: u64,
    ) -> Result<(), MetricsError> {
        let attributes = [KeyValue::new("bucket", bucket.to_string())];
        self.objects_deleted.add(deleted_count, &attributes);
        self.bytes_deleted.add(total_bytes, &attributes);

        tracing::debug!(
            bucket = %bucket,
            deleted_count,
            total_bytes,
            "Published deletion metrics"
        );
        Ok(())
    }
}

/// Thread-safe cumulative counters over every run of this process.
#[derive(Debug, Clone, Default)]
pub struct SweepStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    runs_completed: AtomicUsize,
    runs_failed: AtomicUsize,
    runs_rejected: AtomicUsize,
    objects_processed: AtomicU64,
    bytes_processed: AtomicU64,
    delete_failures: AtomicUsize,
}

impl SweepStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pass that ran to the end, dry run or not
    pub fn record_completed(&self, result: &CleanupResult) {
        self.inner.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.inner
            .objects_processed
            .fetch_add(result.count(), Ordering::Relaxed);
        self.inner
            .bytes_processed
            .fetch_add(result.total_bytes(), Ordering::Relaxed);
        self.inner
            .delete_failures
            .fetch_add(result.warnings().len(), Ordering::Relaxed);
    }

    /// Record a pass that ended in the failure state
    pub fn record_failed(&self) {
        self.inner.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an invocation stopped by invalid configuration
    pub fn record_rejected(&self) {
        self.inner.runs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn runs_completed(&self) -> usize {
        self.inner.runs_completed.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> usize {
        self.inner.runs_failed.load(Ordering::Relaxed)
    }

    pub fn runs_rejected(&self) -> usize {
        self.inner.runs_rejected.load(Ordering::Relaxed)
    }

    pub fn objects_processed(&self) -> u64 {
        self.inner.objects_processed.load(Ordering::Relaxed)
    }

    pub fn bytes_processed(&self) -> u64 {
        self.inner.bytes_processed.load(Ordering::Relaxed)
    }

    pub fn delete_failures(&self) -> usize {
        self.inner.delete_failures.load(Ordering::Relaxed)
    }

    pub fn log_summary(&self) {
        tracing::info!(
            runs_completed = self.runs_completed(),
            runs_failed = self.runs_failed(),
            runs_rejected = self.runs_rejected(),
            objects_processed = self.objects_processed(),
            bytes_processed = self.bytes_processed(),
            delete_failures = self.delete_failures(),
            "Cleanup run summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::DeletionWarning;
    use chrono::Utc;
    use opentelemetry::metrics::MeterProvider;
    use opentelemetry_sdk::metrics::SdkMeterProvider;

    #[tokio::test]
    async fn test_otel_publisher_accepts_counts() {
        let provider = SdkMeterProvider::builder().build();
        let publisher = OtelMetricsPublisher::new(&provider.meter("test"));

        publisher.publish_metrics("my-bucket", 3, 4096).await.unwrap();
        let _ = provider.shutdown();
    }

    #[test]
    fn test_stats_start_at_zero() {
        let stats = SweepStats::new();
        assert_eq!(stats.runs_completed(), 0);
        assert_eq!(stats.runs_failed(), 0);
        assert_eq!(stats.runs_rejected(), 0);
        assert_eq!(stats.objects_processed(), 0);
        assert_eq!(stats.bytes_processed(), 0);
    }

    #[test]
    fn test_stats_accumulate_across_runs() {
        let stats = SweepStats::new();
        let clone = stats.clone();

        let mut first = CleanupResult::new("my-bucket", false);
        first.record_eligible("a.txt", Utc::now(), 100);
        first.record_eligible("b.txt", Utc::now(), 50);
        first.record_warning(DeletionWarning {
            key: "b.txt".to_string(),
            message: "denied".to_string(),
        });
        stats.record_completed(&first);

        let mut second = CleanupResult::new("my-bucket", true);
        second.record_eligible("c.txt", Utc::now(), 25);
        clone.record_completed(&second);

        stats.record_failed();
        stats.record_rejected();

        assert_eq!(stats.runs_completed(), 2);
        assert_eq!(stats.runs_failed(), 1);
        assert_eq!(stats.runs_rejected(), 1);
        assert_eq!(stats.objects_processed(), 3);
        assert_eq!(stats.bytes_processed(), 175);
        assert_eq!(stats.delete_failures(), 1);
    }
}
