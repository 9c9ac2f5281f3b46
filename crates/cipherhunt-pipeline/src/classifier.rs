//! Classifier invocation.
//!
//! The classifier is an external program judging one file at a time. It is
//! run with the path as its final argument (no shell involved) and its exit
//! status is reduced to a boolean: status 0 means the file was flagged,
//! any other status means it was not.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use cipherhunt_core::{HuntConfig, HuntError, InvocationError};

/// Type alias for boxed futures returned by classifiers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Judges whether a single path matches the target pattern.
pub trait Classifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Classify one path. `Ok(true)` means the path was flagged.
    fn classify<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool, InvocationError>>;
}

/// Classifier backed by an external program.
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessClassifier {
    /// Create a classifier for `program` without checking that it exists.
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout,
        }
    }

    /// Resolve `program` on `PATH` (or as a path) and create a classifier.
    ///
    /// A program that cannot be found is a configuration error, reported
    /// once here rather than as a failure for every path.
    pub fn locate(program: &str, timeout: Duration) -> Result<Self, HuntError> {
        let resolved = which::which(program).map_err(|e| HuntError::ClassifierNotFound {
            program: program.to_string(),
            message: e.to_string(),
        })?;
        tracing::debug!(target: "classifier", program = %resolved.display(), "classifier located");
        Ok(Self::new(resolved, timeout))
    }

    /// Locate the classifier named in a hunt config.
    pub fn from_config(config: &HuntConfig) -> Result<Self, HuntError> {
        Ok(Self::locate(&config.classifier, config.timeout())?
            .with_args(config.classifier_args.iter().cloned()))
    }

    /// Set arguments passed before the path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Per-invocation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn invoke(&self, path: &str) -> Result<bool, InvocationError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InvocationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(|source| InvocationError::Wait {
                path: path.to_string(),
                source,
            })?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::debug!(target: "classifier", path, error = %e, "failed to kill timed out classifier");
                }
                return Err(InvocationError::timed_out(path, self.timeout));
            }
        };

        match status.code() {
            Some(0) => Ok(true),
            Some(_) => Ok(false),
            None => Err(InvocationError::Terminated {
                path: path.to_string(),
            }),
        }
    }
}

impl Classifier for ProcessClassifier {
    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("classifier")
    }

    fn classify<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool, InvocationError>> {
        Box::pin(self.invoke(path))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;
    use tempfile::TempDir;

    fn sh(script: &str, timeout: Duration) -> ProcessClassifier {
        ProcessClassifier::locate("sh", timeout)
            .unwrap()
            .with_args(["-c", script, "classifier"])
    }

    #[test]
    fn test_locate_missing_program() {
        let err = ProcessClassifier::locate("cipherhunt-no-such-classifier", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, HuntError::ClassifierNotFound { .. }));
    }

    #[test]
    fn test_name_is_file_name() {
        let classifier = ProcessClassifier::new("/opt/tools/tchuntng", Duration::from_secs(1));
        assert_eq!(classifier.name(), "tchuntng");
    }

    #[tokio::test]
    async fn test_exit_zero_means_classified() {
        let classifier = sh("exit 0", Duration::from_secs(10));
        assert!(classifier.classify("/any").await.unwrap());
    }

    #[tokio::test]
    async fn test_nonzero_exit_means_not_classified() {
        let classifier = sh("exit 1", Duration::from_secs(10));
        assert!(!classifier.classify("/any").await.unwrap());

        let classifier = sh("exit 42", Duration::from_secs(10));
        assert!(!classifier.classify("/any").await.unwrap());
    }

    #[tokio::test]
    async fn test_path_passed_verbatim() {
        let temp = TempDir::new().unwrap();
        let tricky = temp.path().join("vault; exit 0 $(true) 'x'.bin");
        fs::write(&tricky, b"ciphertext").unwrap();

        let classifier = sh("test -f \"$1\"", Duration::from_secs(10));
        assert!(classifier.classify(tricky.to_str().unwrap()).await.unwrap());

        let missing = temp.path().join("missing; exit 0");
        assert!(!classifier.classify(missing.to_str().unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_timeout_kills_classifier() {
        let classifier = sh("sleep 30", Duration::from_millis(200));

        let start = Instant::now();
        let err = classifier.classify("/slow").await.unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_signal_is_abnormal() {
        let classifier = sh("kill -9 $$", Duration::from_secs(10));
        let err = classifier.classify("/crash").await.unwrap_err();
        assert!(matches!(err, InvocationError::Terminated { .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let classifier =
            ProcessClassifier::new("/nonexistent/cipherhunt/classifier", Duration::from_secs(1));
        let err = classifier.classify("/a").await.unwrap_err();
        assert!(matches!(err, InvocationError::Spawn { .. }));
    }
}
