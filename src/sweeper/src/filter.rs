//! Eligibility predicates for a cleanup pass.
//!
//! An object is eligible when it is older than the run's cutoff instant,
//! its key ends with one of the configured suffixes and starts with one of
//! the configured prefixes. Empty suffix or prefix sets match everything.

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;
use std::fmt;

use crate::config::CleanupConfig;
use crate::error::CleanupError;
use crate::storage::StorageObjectRef;

/// Instant before which an object counts as expired.
///
/// Computed once per run so every object in the listing is judged against
/// the same point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CutoffInstant(DateTime<Utc>);

impl CutoffInstant {
    /// `now` minus `retention_days` whole days.
    pub fn compute(now: DateTime<Utc>, retention_days: u32) -> Result<Self, CleanupError> {
        now.checked_sub_signed(Duration::days(i64::from(retention_days)))
            .map(Self)
            .ok_or(CleanupError::CutoffUnderflow { retention_days })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for CutoffInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// True iff the object was last modified strictly before the cutoff.
pub fn is_expired(object: &StorageObjectRef, cutoff: CutoffInstant) -> bool {
    object.last_modified < cutoff.0
}

/// Case-insensitive suffix match; an empty set matches every key.
///
/// Suffixes are expected in lowercase, as the config loader produces them.
pub fn matches_file_type(key: &str, suffixes: &BTreeSet<String>) -> bool {
    if suffixes.is_empty() {
        return true;
    }
    let key = key.to_lowercase();
    suffixes
        .iter()
        .any(|suffix| key.ends_with(suffix.to_lowercase().as_str()))
}

/// Case-sensitive prefix match; an empty set matches every key.
pub fn matches_prefix(key: &str, prefixes: &BTreeSet<String>) -> bool {
    prefixes.is_empty() || prefixes.iter().any(|prefix| key.starts_with(prefix.as_str()))
}

/// All three predicates bound to one run's cutoff and filter sets.
#[derive(Debug, Clone)]
pub struct ObjectFilter<'a> {
    cutoff: CutoffInstant,
    file_type_suffixes: &'a BTreeSet<String>,
    key_prefixes: &'a BTreeSet<String>,
}

impl<'a> ObjectFilter<'a> {
    pub fn new(config: &'a CleanupConfig, cutoff: CutoffInstant) -> Self {
        Self {
            cutoff,
            file_type_suffixes: &config.file_type_suffixes,
            key_prefixes: &config.key_prefixes,
        }
    }

    pub fn is_eligible(&self, object: &StorageObjectRef) -> bool {
        is_expired(object, self.cutoff)
            && matches_file_type(&object.key, self.file_type_suffixes)
            && matches_prefix(&object.key, self.key_prefixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_file_types, parse_prefixes};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn object(key: &str, age_days: i64) -> StorageObjectRef {
        StorageObjectRef {
            key: key.to_string(),
            last_modified: now() - Duration::days(age_days),
            size_bytes: 100,
        }
    }

    fn config(file_types: &str, prefixes: &str) -> CleanupConfig {
        CleanupConfig {
            bucket_name: "my-bucket".to_string(),
            retention_days: 30,
            dry_run: false,
            file_type_suffixes: parse_file_types(Some(file_types)),
            key_prefixes: parse_prefixes(Some(prefixes)),
        }
    }

    #[test]
    fn test_cutoff_is_whole_days_before_now() {
        let cutoff = CutoffInstant::compute(now(), 30).unwrap();
        assert_eq!(
            cutoff.timestamp(),
            Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_cutoff_underflow_is_an_error() {
        let result = CutoffInstant::compute(DateTime::<Utc>::MIN_UTC, 1);
        assert!(matches!(
            result,
            Err(CleanupError::CutoffUnderflow { retention_days: 1 })
        ));
    }

    #[test]
    fn test_is_expired_is_strict() {
        let cutoff = CutoffInstant::compute(now(), 30).unwrap();

        assert!(is_expired(&object("old.txt", 31), cutoff));
        assert!(!is_expired(&object("exact.txt", 30), cutoff));
        assert!(!is_expired(&object("new.txt", 2), cutoff));
    }

    #[test]
    fn test_expiry_is_monotonic_in_retention_days() {
        let objects: Vec<_> = (0..100).map(|age| object("k", age)).collect();
        let expired_count = |days| {
            let cutoff = CutoffInstant::compute(now(), days).unwrap();
            objects.iter().filter(|o| is_expired(o, cutoff)).count()
        };

        for days in 1..99 {
            assert!(expired_count(days) >= expired_count(days + 1));
        }
    }

    #[test]
    fn test_matches_file_type_is_case_insensitive() {
        let suffixes = parse_file_types(Some(".LOG,.gz"));

        assert!(matches_file_type("app/server.log", &suffixes));
        assert!(matches_file_type("APP/SERVER.LOG", &suffixes));
        assert!(matches_file_type("backup.tar.GZ", &suffixes));
        assert!(!matches_file_type("notes.txt", &suffixes));
        assert!(!matches_file_type("log", &suffixes));
    }

    #[test]
    fn test_matches_file_type_lowercases_unnormalized_suffixes() {
        let suffixes = BTreeSet::from([".LOG".to_string()]);
        assert!(matches_file_type("server.log", &suffixes));
    }

    #[test]
    fn test_empty_sets_match_everything() {
        let empty = BTreeSet::new();
        assert!(matches_file_type("anything.bin", &empty));
        assert!(matches_prefix("any/key", &empty));
        assert!(matches_prefix("", &empty));
    }

    #[test]
    fn test_matches_prefix_uses_normalized_separator() {
        let with = parse_prefixes(Some("logs/"));
        let without = parse_prefixes(Some("logs"));
        assert_eq!(with, without);

        assert!(matches_prefix("logs/2024/app.log", &without));
        assert!(!matches_prefix("logs-archive/app.log", &without));
        assert!(!matches_prefix("Logs/app.log", &without));
        assert!(!matches_prefix("other/logs/app.log", &without));
    }

    #[test]
    fn test_eligibility_requires_all_predicates() {
        let config = config(".log", "logs");
        let cutoff = CutoffInstant::compute(now(), config.retention_days).unwrap();
        let filter = ObjectFilter::new(&config, cutoff);

        assert!(filter.is_eligible(&object("logs/app.log", 40)));
        assert!(!filter.is_eligible(&object("logs/app.log", 2)));
        assert!(!filter.is_eligible(&object("logs/app.txt", 40)));
        assert!(!filter.is_eligible(&object("data/app.log", 40)));
    }

    #[test]
    fn test_eligibility_without_filters_is_age_only() {
        let config = config("", "");
        let cutoff = CutoffInstant::compute(now(), config.retention_days).unwrap();
        let filter = ObjectFilter::new(&config, cutoff);

        assert!(filter.is_eligible(&object("a.txt", 40)));
        assert!(!filter.is_eligible(&object("b.log", 2)));
    }
}
