use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use fanbox_core::MetadataFormat;
use fanbox_engine::{Clock, EngineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SETTINGS_FILE: &str = "fanbox_dl.ron";

/// Contents of the optional RON settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: PathBuf,
    pub session_id: Option<String>,
    pub ignore_free: bool,
    pub limit: Option<u32>,
    pub metadata_format: MetadataFormat,
    pub rate_limit_ms: u64,
    pub file_delay_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            session_id: None,
            ignore_free: false,
            limit: None,
            metadata_format: MetadataFormat::Json,
            rate_limit_ms: 100,
            file_delay_ms: 100,
            retry_count: 1,
            retry_delay_ms: 1000,
            request_timeout_secs: 60,
        }
    }
}

/// Values given on the command line; they win over the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub session_id: Option<String>,
    pub ignore_free: bool,
    pub limit: Option<u32>,
    pub metadata_format: Option<MetadataFormat>,
}

impl Settings {
    /// Reads `path`. A missing file yields defaults silently, a broken one with a warning.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Self::default();
            }
            Err(err) => {
                engine_warn!("Failed to read settings from {:?}: {}", path, err);
                return Self::default();
            }
        };

        match ron::from_str(&content) {
            Ok(settings) => {
                engine_info!("Loaded settings from {:?}", path);
                settings
            }
            Err(err) => {
                engine_warn!("Failed to parse settings from {:?}: {}", path, err);
                Self::default()
            }
        }
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if overrides.session_id.is_some() {
            self.session_id = overrides.session_id;
        }
        self.ignore_free |= overrides.ignore_free;
        if overrides.limit.is_some() {
            self.limit = overrides.limit;
        }
        if let Some(format) = overrides.metadata_format {
            self.metadata_format = format;
        }
    }

    pub fn engine_config(&self, archived_utc: Clock) -> EngineConfig {
        let mut config = EngineConfig::default_with_output(self.output_dir.clone());
        config.fetch.session_id = self.session_id.clone();
        config.fetch.request_timeout = Duration::from_secs(self.request_timeout_secs);
        config.collect.ignore_free = self.ignore_free;
        config.collect.limit = self.limit;
        config.collect.metadata_format = self.metadata_format;
        config.collect.rate_limit = Duration::from_millis(self.rate_limit_ms);
        config.archive.file_delay = Duration::from_millis(self.file_delay_ms);
        config.archive.retry = RetryPolicy {
            retries: self.retry_count,
            delay: Duration::from_millis(self.retry_delay_ms),
        };
        config.archived_utc = archived_utc;
        config
    }
}
