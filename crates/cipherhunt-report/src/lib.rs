//! Per-owner aggregation and report rendering for cipherhunt.
//!
//! Classified paths are collected into an [`Aggregator`] keyed by owner.
//! Once the record stream is exhausted the aggregator is consumed by
//! [`Aggregator::render`], producing a [`Report`] whose text body is
//! byte-for-byte deterministic for a given set of entries:
//!
//! ```rust
//! use cipherhunt_report::Aggregator;
//! use cipherhunt_core::Owner;
//!
//! let mut aggregator = Aggregator::new();
//! aggregator.record(Owner::from("alice"), "/home/alice/vault.tc");
//! aggregator.record(Owner::not_found(), "/tmp/blob.bin");
//!
//! let report = aggregator.render();
//! assert_eq!(
//!     report.text,
//!     " == USER: Not found ==\n  /tmp/blob.bin\n\n == USER: alice ==\n  /home/alice/vault.tc\n\n"
//! );
//! ```

mod aggregate;
mod report;

pub use aggregate::Aggregator;
pub use report::{Report, REPORT_NAME};

// Re-export core types
pub use cipherhunt_core::Owner;
