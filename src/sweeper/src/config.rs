//! Cleanup configuration read from the process environment.
//!
//! Each variable reaches figment as its exact text, keyed in lowercase, so
//! values like `007` or `1.50` are never reinterpreted as numbers. Every
//! field is extracted as text and then validated by hand into a
//! [`CleanupConfig`].

use figment::Figment;
use figment::providers::Serialized;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Environment variables that make up the cleanup configuration.
pub const CONFIG_KEYS: [&str; 5] = ["BUCKET_NAME", "DAYS", "DRY_RUN", "FILE_TYPES", "PREFIXES"];

/// Environment variables holding ambient job settings.
pub const SETTINGS_KEYS: [&str; 3] = ["ALERT_WEBHOOK_URL", "STORAGE_DSN", "OTLP_ENDPOINT"];

/// Separator that every key prefix is normalized to end with.
pub const PREFIX_SEPARATOR: char = '/';

static BUCKET_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9.-]{3,63}$").expect("valid bucket name pattern"));

/// Validated, immutable configuration for one cleanup invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CleanupConfig {
    /// Bucket to sweep.
    ///
    /// Env: BUCKET_NAME
    pub bucket_name: String,

    /// Objects last modified more than this many days ago are expired.
    ///
    /// Env: DAYS
    pub retention_days: u32,

    /// Report eligible objects without deleting them or publishing metrics.
    ///
    /// Env: DRY_RUN
    pub dry_run: bool,

    /// Lowercased key suffixes; empty matches every key.
    ///
    /// Env: FILE_TYPES
    pub file_type_suffixes: BTreeSet<String>,

    /// Key prefixes ending with `/`; empty matches every key.
    ///
    /// Env: PREFIXES
    pub key_prefixes: BTreeSet<String>,
}

/// Errors that abort an invocation before any storage call is made.
///
/// The messages are the exact strings returned to the caller.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable BUCKET_NAME is not set.")]
    MissingBucketName,

    #[error("Invalid BUCKET_NAME. Ensure it follows S3 bucket naming conventions.")]
    InvalidBucketName(String),

    #[error("Environment variable DAYS is not set.")]
    MissingRetentionDays,

    #[error("Environment variable DAYS must be a valid integer.")]
    NonNumericRetentionDays(String),

    #[error("Environment variable DAYS must be a positive integer.")]
    NonPositiveRetentionDays(i32),

    #[error("Failed to read configuration: {0}")]
    Source(#[from] Box<figment::Error>),
}

/// Raw environment values before validation.
#[derive(Debug, Default, Deserialize)]
struct RawCleanupConfig {
    bucket_name: Option<String>,
    days: Option<String>,
    dry_run: Option<String>,
    file_types: Option<String>,
    prefixes: Option<String>,
}

impl CleanupConfig {
    /// Figment reading the cleanup variables from the process environment.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(environment_text(&CONFIG_KEYS)))
    }

    /// Load and validate the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Validate the configuration held by `figment`.
    ///
    /// Keys are expected in lowercase (`bucket_name`, `days`, ...) with
    /// string values, as [`CleanupConfig::figment`] provides them.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawCleanupConfig = figment.extract().map_err(Box::new)?;
        Self::validate(raw)
    }

    fn validate(raw: RawCleanupConfig) -> Result<Self, ConfigError> {
        let bucket_name = raw
            .bucket_name
            .filter(|name| !name.is_empty())
            .ok_or(ConfigError::MissingBucketName)?;
        if !BUCKET_NAME_PATTERN.is_match(&bucket_name) {
            return Err(ConfigError::InvalidBucketName(bucket_name));
        }

        let days = raw
            .days
            .filter(|days| !days.is_empty())
            .ok_or(ConfigError::MissingRetentionDays)?;
        let days: i32 = days
            .parse()
            .map_err(|_| ConfigError::NonNumericRetentionDays(days.clone()))?;
        let retention_days =
            u32::try_from(days).map_err(|_| ConfigError::NonPositiveRetentionDays(days))?;
        if retention_days == 0 {
            return Err(ConfigError::NonPositiveRetentionDays(days));
        }

        let dry_run = raw
            .dry_run
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));

        Ok(Self {
            bucket_name,
            retention_days,
            dry_run,
            file_type_suffixes: parse_file_types(raw.file_types.as_deref()),
            key_prefixes: parse_prefixes(raw.prefixes.as_deref()),
        })
    }
}

/// Split a comma-separated suffix list into a lowercase set.
pub fn parse_file_types(value: Option<&str>) -> BTreeSet<String> {
    split_list(value).map(|suffix| suffix.to_lowercase()).collect()
}

/// Split a comma-separated prefix list, making every prefix end with `/`.
pub fn parse_prefixes(value: Option<&str>) -> BTreeSet<String> {
    split_list(value)
        .map(|prefix| {
            if prefix.ends_with(PREFIX_SEPARATOR) {
                prefix.to_string()
            } else {
                format!("{prefix}{PREFIX_SEPARATOR}")
            }
        })
        .collect()
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Exact text of the given environment variables, keyed in lowercase.
/// Unset and non-UTF-8 variables are left out.
fn environment_text(keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .filter_map(|key| {
            std::env::var(key)
                .ok()
                .map(|value| (key.to_lowercase(), value))
        })
        .collect()
}

/// Ambient settings for the collaborators around the cleanup pass.
///
/// None of these are validated up front; a bad value surfaces when the
/// collaborator that uses it is built or called.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct JobSettings {
    /// Webhook that receives the failure notification.
    ///
    /// Env: ALERT_WEBHOOK_URL
    #[serde(default)]
    pub alert_webhook_url: Option<String>,

    /// Storage backend override, see `common::storage::create_bucket_store`.
    ///
    /// Env: STORAGE_DSN
    #[serde(default)]
    pub storage_dsn: Option<String>,

    /// OTLP/gRPC endpoint for deletion metrics.
    ///
    /// Env: OTLP_ENDPOINT
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl JobSettings {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(environment_text(&SETTINGS_KEYS)))
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment().extract().map_err(Box::new)
    }
}
