//! Error types for hunt runs.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a single classifier invocation.
///
/// None of these are fatal to a run: the driving loop logs them and treats
/// the path as not classified.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The classifier process could not be started.
    #[error("Failed to start classifier {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the classifier process failed.
    #[error("Failed to wait on classifier for {path}: {source}")]
    Wait {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The classifier exited without a status code (killed by a signal).
    #[error("Classifier terminated abnormally for {path}")]
    Terminated { path: String },

    /// The classifier did not finish within its time budget.
    #[error("Classifier timed out after {timeout_ms}ms for {path}")]
    Timeout { path: String, timeout_ms: u64 },

    /// The run was cancelled while the classifier was in flight.
    #[error("Classification cancelled for {path}")]
    Cancelled { path: String },

    /// Error reported by a non-process classifier.
    #[error("{message}")]
    Other { message: String },
}

impl InvocationError {
    /// Timeout for `path` after `timeout` elapsed.
    pub fn timed_out(path: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            path: path.into(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Check if this failure was caused by the time budget running out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors that abort a hunt before or during a run.
#[derive(Debug, Error)]
pub enum HuntError {
    /// The classifier program could not be located at startup.
    #[error("Classifier not found: {program} ({message})")]
    ClassifierNotFound { program: String, message: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// The record source failed.
    #[error("Failed to read records: {source}")]
    Input {
        #[source]
        source: std::io::Error,
    },

    /// A pipeline task panicked or was aborted.
    #[error("Pipeline task failed: {message}")]
    Task { message: String },
}

impl HuntError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of hunt warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Classifier could not be started or waited on.
    InvocationFailed,
    /// Classifier exceeded its timeout.
    Timeout,
    /// Classifier was killed by a signal.
    AbnormalExit,
    /// Classification abandoned on cancellation.
    Cancelled,
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuntWarning {
    /// Path being classified when the warning occurred.
    pub path: String,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl HuntWarning {
    /// Create a new hunt warning.
    pub fn new(path: impl Into<String>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a warning from a failed classifier invocation.
    pub fn from_invocation(path: impl Into<String>, error: &InvocationError) -> Self {
        let kind = match error {
            InvocationError::Timeout { .. } => WarningKind::Timeout,
            InvocationError::Terminated { .. } => WarningKind::AbnormalExit,
            InvocationError::Cancelled { .. } => WarningKind::Cancelled,
            _ => WarningKind::InvocationFailed,
        };
        Self::new(path, error.to_string(), kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_from_timeout() {
        let err = InvocationError::Timeout {
            path: "/data/blob.bin".into(),
            timeout_ms: 250,
        };
        assert!(err.is_timeout());

        let warning = HuntWarning::from_invocation("/data/blob.bin", &err);
        assert_eq!(warning.kind, WarningKind::Timeout);
        assert!(warning.message.contains("250ms"));
    }

    #[test]
    fn test_timed_out_saturates() {
        let err = InvocationError::timed_out("/a", Duration::from_millis(1500));
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: 1500, .. }));

        let err = InvocationError::timed_out("/a", Duration::MAX);
        assert!(matches!(err, InvocationError::Timeout { timeout_ms: u64::MAX, .. }));
    }

    #[test]
    fn test_warning_from_spawn_failure() {
        let err = InvocationError::Spawn {
            program: PathBuf::from("/opt/tchuntng"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let warning = HuntWarning::from_invocation("/x", &err);
        assert_eq!(warning.kind, WarningKind::InvocationFailed);
        assert!(warning.message.contains("/opt/tchuntng"));
    }

    #[test]
    fn test_invalid_config_message() {
        let err = HuntError::invalid_config("timeout must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: timeout must be positive"
        );
    }
}
