//! The driving loop: a bounded worker pool feeding a single aggregation task.
//!
//! ```text
//! records (mpsc) ──► worker 0 ─┐
//!                ──► worker 1 ─┼─► (owner, path) (mpsc) ──► aggregation task ──► Report
//!                ──► worker N ─┘
//! ```
//!
//! Each worker filters by kind, dedups, resolves the owner and classifies.
//! Only the aggregation task touches the [`Aggregator`], and the report is
//! rendered after every worker has been joined and the channel drained.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use cipherhunt_core::{
    HuntConfig, HuntError, HuntWarning, InvocationError, Owner, OwnerResolver, Record,
};
use cipherhunt_report::{Aggregator, Report};

use crate::classifier::Classifier;
use crate::progress::{HuntProgress, HuntStats, StatsCounter};
use crate::seen::SeenPaths;

/// Publish a progress snapshot every this many finished paths.
const PROGRESS_INTERVAL: u64 = 100;

/// Result of a completed (or cancelled) run.
#[derive(Debug)]
pub struct HuntOutcome {
    /// The rendered report.
    pub report: Report,
    /// Final counters.
    pub stats: HuntStats,
    /// Non-fatal problems, sorted by path.
    pub warnings: Vec<HuntWarning>,
    /// Whether cancellation was requested before the workers finished.
    pub cancelled: bool,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

/// Runs records through dedup, classification and aggregation.
pub struct Hunter {
    config: HuntConfig,
    classifier: Arc<dyn Classifier>,
    resolver: Arc<dyn OwnerResolver>,
    progress_tx: broadcast::Sender<HuntProgress>,
}

impl Hunter {
    /// Create a hunter. The config is validated here.
    pub fn new(
        config: HuntConfig,
        classifier: Arc<dyn Classifier>,
        resolver: Arc<dyn OwnerResolver>,
    ) -> Result<Self, HuntError> {
        config.validate()?;
        let (progress_tx, _) = broadcast::channel(100);
        Ok(Self {
            config,
            classifier,
            resolver,
            progress_tx,
        })
    }

    /// Subscribe to run progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<HuntProgress> {
        self.progress_tx.subscribe()
    }

    /// The config this hunter runs with.
    pub fn config(&self) -> &HuntConfig {
        &self.config
    }

    /// Run over an in-memory sequence of records.
    pub async fn run_records<I>(
        &self,
        records: I,
        cancel: CancellationToken,
    ) -> Result<HuntOutcome, HuntError>
    where
        I: IntoIterator<Item = Record> + Send + 'static,
        I::IntoIter: Send,
    {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let feeder = tokio::spawn(async move {
            for record in records {
                if tx.send(record).await.is_err() {
                    break;
                }
            }
        });

        let outcome = self.run(rx, cancel).await;
        feeder.abort();
        outcome
    }

    /// Run until `records` is exhausted or `cancel` fires.
    pub async fn run(
        &self,
        records: mpsc::Receiver<Record>,
        cancel: CancellationToken,
    ) -> Result<HuntOutcome, HuntError> {
        let start = Instant::now();
        let workers = self.config.effective_workers();

        tracing::info!(
            target: "hunt",
            classifier = self.classifier.name(),
            workers,
            timeout_ms = self.config.timeout_ms,
            "starting hunt"
        );

        let shared = Arc::new(WorkerShared {
            accepted_kinds: self.config.accepted_kinds.clone(),
            timeout: self.config.timeout(),
            grace_period: self.config.grace_period(),
            classifier: Arc::clone(&self.classifier),
            resolver: Arc::clone(&self.resolver),
            seen: SeenPaths::new(),
            stats: StatsCounter::default(),
            progress_tx: self.progress_tx.clone(),
            start,
        });
        let records = Arc::new(Mutex::new(records));

        let (entry_tx, mut entry_rx) = mpsc::channel::<(Owner, String)>(self.config.channel_capacity);
        let aggregation = tokio::spawn(async move {
            let mut aggregator = Aggregator::new();
            while let Some((owner, path)) = entry_rx.recv().await {
                aggregator.record(owner, path);
            }
            aggregator
        });

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            pool.spawn(worker_loop(
                Arc::clone(&shared),
                Arc::clone(&records),
                entry_tx.clone(),
                cancel.clone(),
            ));
        }
        drop(entry_tx);

        let mut warnings = Vec::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(worker_warnings) => warnings.extend(worker_warnings),
                Err(e) => {
                    // Dropping in-flight classifications kills their processes.
                    pool.abort_all();
                    aggregation.abort();
                    tracing::error!(target: "hunt", error = %e, "worker failed, aborting hunt");
                    return Err(HuntError::Task {
                        message: e.to_string(),
                    });
                }
            }
        }

        let aggregator = aggregation.await.map_err(|e| HuntError::Task {
            message: e.to_string(),
        })?;

        let cancelled = cancel.is_cancelled();

        let report = aggregator.render();
        let stats = shared.stats.snapshot();
        let duration = start.elapsed();
        warnings.sort_by(|a, b| a.path.cmp(&b.path));

        let _ = self.progress_tx.send(HuntProgress {
            stats: stats.clone(),
            current_path: None,
            elapsed: duration,
        });

        tracing::info!(
            target: "hunt",
            classified = stats.classified,
            processed = stats.paths_processed(),
            failures = stats.invocation_failures,
            cancelled,
            elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "hunt finished"
        );

        Ok(HuntOutcome {
            report,
            stats,
            warnings,
            cancelled,
            duration,
        })
    }
}

/// State shared by all workers of one run.
struct WorkerShared {
    accepted_kinds: Vec<String>,
    timeout: Duration,
    grace_period: Duration,
    classifier: Arc<dyn Classifier>,
    resolver: Arc<dyn OwnerResolver>,
    seen: SeenPaths,
    stats: StatsCounter,
    progress_tx: broadcast::Sender<HuntProgress>,
    start: Instant,
}

impl WorkerShared {
    /// Route one record. Returns the entry to aggregate if it was classified.
    async fn process(
        &self,
        record: Record,
        cancel: &CancellationToken,
        warnings: &mut Vec<HuntWarning>,
    ) -> Option<(Owner, String)> {
        StatsCounter::bump(&self.stats.records_received);

        if !self.accepted_kinds.iter().any(|k| k.as_str() == record.kind.as_str()) {
            StatsCounter::bump(&self.stats.ignored_kind);
            return None;
        }

        let Some(path) = record.usable_path() else {
            StatsCounter::bump(&self.stats.ignored_no_path);
            return None;
        };

        if !self.seen.should_process(path) {
            StatsCounter::bump(&self.stats.duplicates);
            return None;
        }

        let owner = Owner::from_resolved(self.resolver.resolve_owner(path));
        if owner.is_not_found() {
            StatsCounter::bump(&self.stats.unresolved_owners);
        }

        let entry = match self.classify(path, cancel).await {
            Ok(true) => {
                StatsCounter::bump(&self.stats.classified);
                tracing::debug!(target: "hunt", path, owner = %owner, "classified");
                Some((owner, path.to_string()))
            }
            Ok(false) => {
                StatsCounter::bump(&self.stats.not_classified);
                None
            }
            Err(e) => {
                StatsCounter::bump(&self.stats.invocation_failures);
                tracing::warn!(target: "hunt", path, error = %e, "classification failed, treating as not classified");
                warnings.push(HuntWarning::from_invocation(path, &e));
                None
            }
        };

        let finished = StatsCounter::bump(&self.stats.finished);
        if finished % PROGRESS_INTERVAL == 0 {
            let _ = self.progress_tx.send(HuntProgress {
                stats: self.stats.snapshot(),
                current_path: Some(path.to_string()),
                elapsed: self.start.elapsed(),
            });
        }

        entry
    }

    /// Classify within the per-invocation timeout, abandoning the attempt
    /// once cancellation plus the grace period has elapsed. Dropping the
    /// classifier future kills its process.
    async fn classify(&self, path: &str, cancel: &CancellationToken) -> Result<bool, InvocationError> {
        let grace = self.grace_period;
        let attempt = async {
            tokio::time::timeout(self.timeout, self.classifier.classify(path))
                .await
                .unwrap_or_else(|_| Err(InvocationError::timed_out(path, self.timeout)))
        };
        tokio::select! {
            outcome = attempt => outcome,
            _ = async {
                cancel.cancelled().await;
                tokio::time::sleep(grace).await;
            } => Err(InvocationError::Cancelled { path: path.to_string() }),
        }
    }
}

/// Pull records until the input ends or the run is cancelled.
async fn worker_loop(
    shared: Arc<WorkerShared>,
    records: Arc<Mutex<mpsc::Receiver<Record>>>,
    entries: mpsc::Sender<(Owner, String)>,
    cancel: CancellationToken,
) -> Vec<HuntWarning> {
    let mut warnings = Vec::new();

    loop {
        let record = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            record = next_record(&records) => match record {
                Some(record) => record,
                None => break,
            },
        };

        if let Some(entry) = shared.process(record, &cancel, &mut warnings).await {
            if entries.send(entry).await.is_err() {
                break;
            }
        }
    }

    warnings
}

/// The queue lock is held only while waiting for the next record.
async fn next_record(records: &Mutex<mpsc::Receiver<Record>>) -> Option<Record> {
    records.lock().await.recv().await
}
