//! Pipeline types and errors

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::transform::TransformError;

/// Errors that end a single task. None of these affect sibling tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The image could not be downloaded.
    #[error("download failed for {identifier} ({locator}): {source}")]
    Download {
        identifier: String,
        locator: String,
        #[source]
        source: FetchError,
    },

    /// The download did not finish within the configured deadline.
    #[error("download of {locator} for {identifier} timed out after {timeout:?}")]
    Timeout {
        identifier: String,
        locator: String,
        timeout: Duration,
    },

    /// The bytes are not a decodable image.
    #[error("decode failed for {identifier} ({locator}): {source}")]
    Decode {
        identifier: String,
        locator: String,
        #[source]
        source: TransformError,
    },

    /// Resizing or encoding failed.
    #[error("transform failed for {identifier}: {reason}")]
    Transform { identifier: String, reason: String },

    /// The output file could not be written.
    #[error("failed to write {} for {identifier}: {source}", path.display())]
    Persist {
        identifier: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TaskError {
    /// Classifies the error for the run summary.
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Download { .. } | TaskError::Timeout { .. } => FailureKind::Download,
            TaskError::Decode { .. } => FailureKind::Decode,
            TaskError::Transform { .. } => FailureKind::Transform,
            TaskError::Persist { .. } => FailureKind::Persist,
        }
    }
}

/// Errors that affect the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration cannot be used.
    #[error("invalid configuration: {0}")]
    Config(#[source] ConfigError),

    /// The output directory could not be created.
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The catalog could not be opened.
    #[error("failed to open catalog: {0}")]
    CatalogOpen(#[source] CatalogError),

    /// The catalog failed mid-run. In-flight tasks were drained first.
    #[error("{source} (after draining: {summary})")]
    CatalogFatal {
        #[source]
        source: CatalogError,
        summary: RunSummary,
    },

    /// The admission pool was closed while the dispatcher waited on it.
    #[error("admission pool closed")]
    AdmissionClosed,

    /// A task was registered after the completion barrier was closed.
    #[error("completion barrier already closed")]
    BarrierClosed,
}

/// Failure classes reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Download,
    Decode,
    Transform,
    Persist,
    /// The task ended without reporting an outcome (it panicked).
    Aborted,
}

impl FailureKind {
    /// All kinds, in summary order.
    pub const ALL: [FailureKind; 5] = [
        FailureKind::Download,
        FailureKind::Decode,
        FailureKind::Transform,
        FailureKind::Persist,
        FailureKind::Aborted,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            FailureKind::Download => 0,
            FailureKind::Decode => 1,
            FailureKind::Transform => 2,
            FailureKind::Persist => 3,
            FailureKind::Aborted => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FailureKind::Download => "download",
            FailureKind::Decode => "decode",
            FailureKind::Transform => "transform",
            FailureKind::Persist => "persist",
            FailureKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(FailureKind),
}

/// Per-kind failure tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounts([usize; 5]);

impl FailureCounts {
    pub(crate) fn record(&mut self, kind: FailureKind) {
        self.0[kind.index()] += 1;
    }

    /// Number of failures of `kind`.
    pub fn get(&self, kind: FailureKind) -> usize {
        self.0[kind.index()]
    }

    /// Total failures across all kinds.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

/// Aggregate result of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks started.
    pub dispatched: usize,
    /// Tasks that wrote their output file.
    pub succeeded: usize,
    /// Tasks that ended in a failure.
    pub failed: usize,
    /// Catalog items that could not be read and were skipped.
    pub skipped: usize,
    /// Failures by kind.
    pub failures: FailureCounts,
    /// Highest number of tasks executing at once.
    pub peak_concurrency: usize,
    /// True if dispatch stopped early on request.
    pub interrupted: bool,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns true if every dispatched task succeeded and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.interrupted
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headline = if self.interrupted {
            "Run interrupted"
        } else {
            "All images processed"
        };
        write!(
            f,
            "{}: {} succeeded, {} failed, {} skipped ({} dispatched, peak concurrency {}, {:.1}s)",
            headline,
            self.succeeded,
            self.failed,
            self.skipped,
            self.dispatched,
            self.peak_concurrency,
            self.elapsed.as_secs_f64()
        )?;

        if self.failures.total() > 0 {
            let parts: Vec<String> = FailureKind::ALL
                .iter()
                .filter(|kind| self.failures.get(**kind) > 0)
                .map(|kind| format!("{}={}", kind, self.failures.get(*kind)))
                .collect();
            write!(f, " [{}]", parts.join(", "))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_kind() {
        let err = TaskError::Timeout {
            identifier: "a".to_string(),
            locator: "http://x/a".to_string(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.kind(), FailureKind::Download);

        let err = TaskError::Persist {
            identifier: "a".to_string(),
            path: PathBuf::from("/img/a.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), FailureKind::Persist);
        assert!(err.to_string().contains("/img/a.jpg"));
    }

    #[test]
    fn test_task_error_display_has_context() {
        let err = TaskError::Download {
            identifier: "show-a".to_string(),
            locator: "http://x/a.png".to_string(),
            source: FetchError::Status {
                status: 503,
                locator: "http://x/a.png".to_string(),
            },
        };
        let message = err.to_string();
        assert!(message.contains("show-a"));
        assert!(message.contains("http://x/a.png"));
        assert!(message.contains("503"));
    }

    #[test]
    fn test_failure_counts() {
        let mut counts = FailureCounts::default();
        counts.record(FailureKind::Download);
        counts.record(FailureKind::Download);
        counts.record(FailureKind::Persist);

        assert_eq!(counts.get(FailureKind::Download), 2);
        assert_eq!(counts.get(FailureKind::Decode), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_summary_display_clean() {
        let summary = RunSummary::default();
        let line = summary.to_string();
        assert!(line.starts_with("All images processed: 0 succeeded, 0 failed, 0 skipped"));
        assert!(!line.contains('['));
        assert!(summary.is_clean());
    }

    #[test]
    fn test_summary_display_with_failures() {
        let mut failures = FailureCounts::default();
        failures.record(FailureKind::Download);
        let summary = RunSummary {
            dispatched: 3,
            succeeded: 2,
            failed: 1,
            failures,
            ..Default::default()
        };

        let line = summary.to_string();
        assert!(line.contains("2 succeeded, 1 failed"));
        assert!(line.ends_with("[download=1]"));
        assert!(!summary.is_clean());
    }

    #[test]
    fn test_summary_display_interrupted() {
        let summary = RunSummary {
            interrupted: true,
            ..Default::default()
        };
        assert!(summary.to_string().starts_with("Run interrupted"));
    }
}
