//! Studio configuration.

use crate::images::{DEFAULT_IMAGE_URL_PREFIX, DEFAULT_MAX_IMAGE_BYTES};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "STORY_DATA_DIR";
/// Environment variable holding the upload limit in bytes.
pub const ENV_MAX_IMAGE_BYTES: &str = "STORY_MAX_IMAGE_BYTES";
/// Environment variable switching logs to JSON.
pub const ENV_LOG_JSON: &str = "STORY_LOG_JSON";

/// Configuration for a [`Studio`](crate::studio::Studio).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    /// Root directory for the file-backed stores.
    pub data_dir: PathBuf,

    /// Largest accepted image upload, in bytes.
    pub max_image_bytes: usize,

    /// Public route prefix for stored images.
    pub image_url_prefix: String,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./story-data"),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            image_url_prefix: DEFAULT_IMAGE_URL_PREFIX.to_string(),
            log_json: false,
        }
    }
}

impl StudioConfig {
    /// Create a config rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read the config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unparseable values keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(ENV_MAX_IMAGE_BYTES) {
            match raw.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => config.max_image_bytes = bytes,
                _ => warn!(
                    key = ENV_MAX_IMAGE_BYTES,
                    value = %raw,
                    default = config.max_image_bytes,
                    "Ignoring invalid image size limit"
                ),
            }
        }

        if let Some(raw) = lookup(ENV_LOG_JSON) {
            match parse_flag(&raw) {
                Some(flag) => config.log_json = flag,
                None => warn!(key = ENV_LOG_JSON, value = %raw, "Ignoring invalid flag"),
            }
        }

        config
    }

    /// Set the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the upload limit.
    pub fn with_max_image_bytes(mut self, bytes: usize) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    /// Set the public image route prefix.
    pub fn with_image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_url_prefix = prefix.into();
        self
    }

    /// Switch JSON logging on or off.
    pub fn with_log_json(mut self, enabled: bool) -> Self {
        self.log_json = enabled;
        self
    }

    pub fn stories_dir(&self) -> PathBuf {
        self.data_dir.join("stories")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
