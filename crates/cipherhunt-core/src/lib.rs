//! Core types and traits for cipherhunt.
//!
//! This crate provides the data model shared by the rest of the workspace:
//! input records, owner identities and the resolver seam, the error
//! taxonomy, and run configuration.

mod config;
mod error;
mod owner;
mod record;

pub use config::{HuntConfig, HuntConfigBuilder};
pub use error::{HuntError, HuntWarning, InvocationError, WarningKind};
pub use owner::{HomeDirResolver, NoopResolver, Owner, OwnerResolver, StaticOwnerResolver};
pub use record::{Record, FS_STAT_KIND};
