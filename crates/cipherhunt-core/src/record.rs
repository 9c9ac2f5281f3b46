//! Input records.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Kind tag of filesystem stat records.
pub const FS_STAT_KIND: &str = "fs:stat";

/// One unit of the input event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Tag identifying the record shape.
    pub kind: CompactString,

    /// Filesystem path the record refers to, if any.
    #[serde(default, alias = "filename", skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Record {
    /// Create a record with a path.
    pub fn new(kind: impl Into<CompactString>, path: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            path: Some(path.into()),
        }
    }

    /// Create a record without a path.
    pub fn without_path(kind: impl Into<CompactString>) -> Self {
        Self {
            kind: kind.into(),
            path: None,
        }
    }

    /// Create a filesystem stat record.
    pub fn fs_stat(path: impl Into<String>) -> Self {
        Self::new(FS_STAT_KIND, path)
    }

    /// The path, if present and non-empty.
    pub fn usable_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}
