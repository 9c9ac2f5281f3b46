//! Run statistics and progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Counters describing what a run did with its records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuntStats {
    /// Records pulled from the input stream.
    pub records_received: u64,
    /// Records dropped because their kind is not accepted.
    pub ignored_kind: u64,
    /// Records dropped because they carry no usable path.
    pub ignored_no_path: u64,
    /// Records whose path was already processed this run.
    pub duplicates: u64,
    /// Paths the classifier flagged.
    pub classified: u64,
    /// Paths the classifier did not flag.
    pub not_classified: u64,
    /// Paths whose classification failed.
    pub invocation_failures: u64,
    /// Processed paths without a resolvable owner.
    pub unresolved_owners: u64,
}

impl HuntStats {
    /// Distinct paths handed to the classifier.
    pub fn paths_processed(&self) -> u64 {
        self.classified + self.not_classified + self.invocation_failures
    }

    /// Records that never reached the classifier.
    pub fn records_skipped(&self) -> u64 {
        self.ignored_kind + self.ignored_no_path + self.duplicates
    }
}

/// Progress information during a run.
#[derive(Debug, Clone)]
pub struct HuntProgress {
    /// Counters at the time of the snapshot.
    pub stats: HuntStats,
    /// Path most recently classified.
    pub current_path: Option<String>,
    /// Time elapsed since the run started.
    pub elapsed: Duration,
}

impl HuntProgress {
    /// Calculate classification rate in paths per second.
    pub fn paths_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.stats.paths_processed() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Shared counters updated by workers.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    pub records_received: AtomicU64,
    pub ignored_kind: AtomicU64,
    pub ignored_no_path: AtomicU64,
    pub duplicates: AtomicU64,
    pub classified: AtomicU64,
    pub not_classified: AtomicU64,
    pub invocation_failures: AtomicU64,
    pub unresolved_owners: AtomicU64,
    /// Paths finished, used to throttle progress updates.
    pub finished: AtomicU64,
}

impl StatsCounter {
    pub fn bump(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn snapshot(&self) -> HuntStats {
        HuntStats {
            records_received: self.records_received.load(Ordering::Relaxed),
            ignored_kind: self.ignored_kind.load(Ordering::Relaxed),
            ignored_no_path: self.ignored_no_path.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            classified: self.classified.load(Ordering::Relaxed),
            not_classified: self.not_classified.load(Ordering::Relaxed),
            invocation_failures: self.invocation_failures.load(Ordering::Relaxed),
            unresolved_owners: self.unresolved_owners.load(Ordering::Relaxed),
        }
    }
}
