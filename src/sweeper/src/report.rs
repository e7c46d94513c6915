//! Accumulated result of a cleanup pass and its text report.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

pub const DELETED_TAG: &str = "[DELETED]";
pub const WOULD_DELETE_TAG: &str = "[WOULD DELETE]";
pub const DRY_RUN_TAG: &str = "[DRY RUN]";
pub const DELETE_FAILED_TAG: &str = "[DELETE FAILED]";

/// A delete request for an eligible object that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionWarning {
    pub key: String,
    pub message: String,
}

/// Counters and per-object lines collected during one pass.
///
/// Counts are of eligible objects processed, so a failed delete still
/// counts and additionally shows up in [`CleanupResult::warnings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupResult {
    bucket: String,
    dry_run: bool,
    count: u64,
    total_bytes: u64,
    report_lines: Vec<String>,
    warnings: Vec<DeletionWarning>,
}

impl CleanupResult {
    pub fn new(bucket: impl Into<String>, dry_run: bool) -> Self {
        Self {
            bucket: bucket.into(),
            dry_run,
            count: 0,
            total_bytes: 0,
            report_lines: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add one eligible object to the counters and the report.
    pub fn record_eligible(&mut self, key: &str, last_modified: DateTime<Utc>, size_bytes: u64) {
        let tag = if self.dry_run {
            WOULD_DELETE_TAG
        } else {
            DELETED_TAG
        };
        self.report_lines.push(format!(
            "{tag} {key} (last modified: {})",
            last_modified.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        ));
        self.count += 1;
        self.total_bytes += size_bytes;
    }

    pub fn record_warning(&mut self, warning: DeletionWarning) {
        self.warnings.push(warning);
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of objects deleted, or that would be in a dry run.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn warnings(&self) -> &[DeletionWarning] {
        &self.warnings
    }

    pub fn summary_line(&self) -> String {
        if self.dry_run {
            format!(
                "{DRY_RUN_TAG} {} files would be deleted (total size: {} bytes)",
                self.count, self.total_bytes
            )
        } else {
            format!(
                "{} files deleted (total size: {} bytes)",
                self.count, self.total_bytes
            )
        }
    }

    /// The full multi-line report returned to the caller.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CleanupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "{DRY_RUN_TAG} ")?;
        }
        writeln!(f, "Objects to be deleted from bucket {}:", self.bucket)?;
        for line in &self.report_lines {
            writeln!(f, "{line}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "{DELETE_FAILED_TAG} {}: {}", warning.key, warning.message)?;
        }
        writeln!(f, "{}", self.summary_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 22, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_empty_report() {
        let result = CleanupResult::new("my-bucket", false);

        assert_eq!(
            result.render(),
            "Objects to be deleted from bucket my-bucket:\n\
             0 files deleted (total size: 0 bytes)\n"
        );
    }

    #[test]
    fn test_deleted_lines_and_summary() {
        let mut result = CleanupResult::new("my-bucket", false);
        result.record_eligible("a.txt", timestamp(), 100);
        result.record_eligible("logs/b.log", timestamp(), 23);

        assert_eq!(result.count(), 2);
        assert_eq!(result.total_bytes(), 123);
        assert_eq!(
            result.render(),
            "Objects to be deleted from bucket my-bucket:\n\
             [DELETED] a.txt (last modified: 2024-04-22T08:30:00Z)\n\
             [DELETED] logs/b.log (last modified: 2024-04-22T08:30:00Z)\n\
             2 files deleted (total size: 123 bytes)\n"
        );
    }

    #[test]
    fn test_dry_run_tags() {
        let mut result = CleanupResult::new("my-bucket", true);
        result.record_eligible("a.txt", timestamp(), 100);

        let report = result.render();
        assert!(report.starts_with("[DRY RUN] Objects to be deleted from bucket my-bucket:\n"));
        assert!(report.contains("[WOULD DELETE] a.txt (last modified: 2024-04-22T08:30:00Z)\n"));
        assert!(report.ends_with("[DRY RUN] 1 files would be deleted (total size: 100 bytes)\n"));
        assert!(!report.contains(DELETED_TAG));
    }

    #[test]
    fn test_warnings_follow_object_lines() {
        let mut result = CleanupResult::new("my-bucket", false);
        result.record_eligible("a.txt", timestamp(), 10);
        result.record_warning(DeletionWarning {
            key: "a.txt".to_string(),
            message: "access denied".to_string(),
        });

        let report = result.render();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "[DELETED] a.txt (last modified: 2024-04-22T08:30:00Z)");
        assert_eq!(lines[2], "[DELETE FAILED] a.txt: access denied");
        assert_eq!(lines[3], "1 files deleted (total size: 10 bytes)");
    }

    #[test]
    fn test_summary_count_matches_tagged_lines() {
        for dry_run in [false, true] {
            let mut result = CleanupResult::new("my-bucket", dry_run);
            for (i, size) in [5_u64, 7, 11, 13].into_iter().enumerate() {
                result.record_eligible(&format!("k{i}"), timestamp(), size);
            }

            let report = result.render();
            let tagged = report
                .lines()
                .filter(|l| l.starts_with(DELETED_TAG) || l.starts_with(WOULD_DELETE_TAG))
                .count() as u64;
            assert_eq!(tagged, result.count());
            assert_eq!(result.total_bytes(), 36);
        }
    }

    #[test]
    fn test_subsecond_timestamps_are_kept() {
        let mut result = CleanupResult::new("my-bucket", false);
        let ts = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        result.record_eligible("a.txt", ts, 1);

        assert!(
            result
                .render()
                .contains("[DELETED] a.txt (last modified: 2023-11-14T22:13:20.123Z)\n")
        );
    }
}
