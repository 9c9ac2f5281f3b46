//! Run pipeline for cipherhunt.
//!
//! This crate wires the three stages of a hunt together:
//!
//! - **Dedup** via [`SeenPaths`], a concurrent set so each path reaches the
//!   classifier at most once per run
//! - **Classification** via the [`Classifier`] trait, with
//!   [`ProcessClassifier`] running an external program per path
//! - **Aggregation** in a single task owning the report index
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cipherhunt_core::{HomeDirResolver, HuntConfig, Record};
//! use cipherhunt_pipeline::{Hunter, ProcessClassifier};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), cipherhunt_core::HuntError> {
//! let config = HuntConfig::default();
//! let classifier = ProcessClassifier::from_config(&config)?;
//! let hunter = Hunter::new(config, Arc::new(classifier), Arc::new(HomeDirResolver::default()))?;
//!
//! let records = vec![Record::fs_stat("/home/alice/vault.tc")];
//! let outcome = hunter.run_records(records, CancellationToken::new()).await?;
//! print!("{}", outcome.report.text);
//! # Ok(())
//! # }
//! ```

mod classifier;
mod hunt;
mod progress;
mod seen;
mod source;

pub use classifier::{BoxFuture, Classifier, ProcessClassifier};
pub use hunt::{HuntOutcome, Hunter};
pub use progress::{HuntProgress, HuntStats};
pub use seen::SeenPaths;
pub use source::{open_input, read_jsonl, spawn_jsonl_reader, InputReader, SourceSummary};

// Re-export core types for convenience
pub use cipherhunt_core::{
    HuntConfig, HuntError, HuntWarning, InvocationError, Owner, OwnerResolver, Record,
    WarningKind,
};
pub use cipherhunt_report::Report;
