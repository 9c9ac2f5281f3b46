//! Hunt configuration types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::HuntError;
use crate::record::FS_STAT_KIND;

/// Configuration for a hunt run.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct HuntConfig {
    /// Classifier program, looked up on `PATH` unless it contains a separator.
    #[builder(default = "default_classifier()")]
    #[serde(default = "default_classifier")]
    pub classifier: String,

    /// Arguments passed to the classifier before the path.
    #[builder(default)]
    #[serde(default)]
    pub classifier_args: Vec<String>,

    /// Record kinds routed through the pipeline.
    #[builder(default = "default_accepted_kinds()")]
    #[serde(default = "default_accepted_kinds")]
    pub accepted_kinds: Vec<String>,

    /// Number of concurrent workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Per-invocation classifier timeout in milliseconds.
    #[builder(default = "default_timeout_ms()")]
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Time in-flight classifications may keep running after cancellation.
    #[builder(default = "default_grace_period_ms()")]
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Capacity of the record and aggregation channels.
    #[builder(default = "default_channel_capacity()")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Known user home directories, keyed by user name.
    #[builder(default)]
    #[serde(default)]
    pub user_homes: BTreeMap<String, PathBuf>,

    /// Recognise `/home/<user>`, `/Users/<user>` and `/root` layouts.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub conventional_homes: bool,
}

fn default_classifier() -> String {
    "tchuntng".to_string()
}

fn default_accepted_kinds() -> Vec<String> {
    vec![FS_STAT_KIND.to_string()]
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_grace_period_ms() -> u64 {
    2_000
}

fn default_channel_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl HuntConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref classifier) = self.classifier {
            if classifier.trim().is_empty() {
                return Err("Classifier program cannot be empty".to_string());
            }
        }
        if let Some(ref kinds) = self.accepted_kinds {
            if kinds.is_empty() {
                return Err("At least one accepted record kind is required".to_string());
            }
        }
        if self.timeout_ms == Some(0) {
            return Err("Classifier timeout must be positive".to_string());
        }
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be positive".to_string());
        }
        Ok(())
    }
}

impl HuntConfig {
    /// Create a new hunt config builder.
    pub fn builder() -> HuntConfigBuilder {
        HuntConfigBuilder::default()
    }

    /// Create a config using the given classifier and defaults otherwise.
    pub fn new(classifier: impl Into<String>) -> Self {
        Self {
            classifier: classifier.into(),
            classifier_args: Vec::new(),
            accepted_kinds: default_accepted_kinds(),
            workers: 0,
            timeout_ms: default_timeout_ms(),
            grace_period_ms: default_grace_period_ms(),
            channel_capacity: default_channel_capacity(),
            user_homes: BTreeMap::new(),
            conventional_homes: true,
        }
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cipherhunt")
            .join("config.toml")
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, HuntError> {
        let config: Self = toml::from_str(text).map_err(|e| HuntError::ConfigParse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, HuntError> {
        let text = std::fs::read_to_string(path).map_err(|source| HuntError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Load the config file at `path`, or at the default location when `None`.
    ///
    /// A missing default file yields the default config; a missing explicit
    /// file is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, HuntError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path();
                if path.is_file() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Check invariants the builder enforces, for configs built otherwise.
    pub fn validate(&self) -> Result<(), HuntError> {
        if self.classifier.trim().is_empty() {
            return Err(HuntError::invalid_config("Classifier program cannot be empty"));
        }
        if self.accepted_kinds.is_empty() {
            return Err(HuntError::invalid_config(
                "At least one accepted record kind is required",
            ));
        }
        if self.timeout_ms == 0 {
            return Err(HuntError::invalid_config("Classifier timeout must be positive"));
        }
        if self.channel_capacity == 0 {
            return Err(HuntError::invalid_config("Channel capacity must be positive"));
        }
        Ok(())
    }

    /// Check if records of `kind` are routed through the pipeline.
    pub fn accepts_kind(&self, kind: &str) -> bool {
        self.accepted_kinds.iter().any(|k| k == kind)
    }

    /// Resolved worker count.
    pub fn effective_workers(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            n => n,
        }
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Grace period after cancellation.
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self::new(default_classifier())
    }
}
