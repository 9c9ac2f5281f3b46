//! The rendered report artifact.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name reports are published under.
pub const REPORT_NAME: &str = "cipherhunt";

/// Final aggregated output of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Name of the producing analysis.
    pub plugin_name: String,

    /// Human-readable body, one section per owner.
    pub text: String,

    /// Owner name to sorted classified paths.
    pub owner_to_paths: BTreeMap<String, Vec<String>>,

    /// When the report was rendered.
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub(crate) fn new(text: String, owner_to_paths: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            plugin_name: REPORT_NAME.to_string(),
            text,
            owner_to_paths,
            generated_at: Utc::now(),
        }
    }

    /// Check if no paths were classified.
    pub fn is_empty(&self) -> bool {
        self.owner_to_paths.is_empty()
    }

    /// Number of owners listed.
    pub fn owner_count(&self) -> usize {
        self.owner_to_paths.len()
    }

    /// Total number of listed paths.
    pub fn path_count(&self) -> usize {
        self.owner_to_paths.values().map(Vec::len).sum()
    }

    /// Paths listed for `owner`.
    pub fn paths_for(&self, owner: &str) -> &[String] {
        self.owner_to_paths
            .get(owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
