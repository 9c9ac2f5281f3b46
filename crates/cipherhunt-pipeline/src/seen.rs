//! Per-run path deduplication.

use compact_str::CompactString;
use dashmap::DashSet;

/// Tracks paths already routed through the pipeline in this run.
///
/// A path is handed to the classifier at most once per run. The check and
/// the mark are a single concurrent insert, so two workers racing on the
/// same new path cannot both win.
#[derive(Debug, Default)]
pub struct SeenPaths {
    seen: DashSet<CompactString>,
}

impl SeenPaths {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Mark a path as seen. Returns `true` if this is the first time.
    ///
    /// Any string is a valid key, including the empty string.
    pub fn should_process(&self, path: &str) -> bool {
        self.seen.insert(CompactString::new(path))
    }

    /// Check if a path has been seen (without marking it).
    pub fn has_seen(&self, path: &str) -> bool {
        self.seen.contains(path)
    }

    /// Get the number of distinct paths seen.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if no paths have been seen.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
