use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::announcement::picker::{PickerConfig, DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_BYTES};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for the workflows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Upper bound on a single gateway call (join, list, post)
    pub request_timeout: Duration,
    pub picker: PickerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            picker: PickerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads `CLASSHUB_*` environment variables; missing or unparseable
    /// values fall back to the defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self {
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "CLASSHUB_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )),
            picker: PickerConfig {
                max_file_bytes: parse_or(&lookup, "CLASSHUB_UPLOAD_MAX_BYTES", DEFAULT_MAX_FILE_BYTES),
                max_files: parse_or(&lookup, "CLASSHUB_UPLOAD_MAX_FILES", DEFAULT_MAX_FILES),
                close_on_complete: parse_or(&lookup, "CLASSHUB_PICKER_AUTO_CLOSE", false),
                ..PickerConfig::default()
            },
        };

        debug!(
            request_timeout_secs = config.request_timeout.as_secs(),
            max_file_bytes = config.picker.max_file_bytes,
            max_files = config.picker.max_files,
            close_on_complete = config.picker.close_on_complete,
            "Loaded configuration"
        );
        config
    }
}

fn parse_or<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
