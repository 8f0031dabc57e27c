use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub(crate) type Result<T> = std::result::Result<T, SyncError>;

/// Canonical error surface for the sync pipeline.
///
/// `FetchFailed` and `ExtractionFailed` are per-cycle and non-fatal: the
/// caller logs them and continues with whichever cycles succeeded.
/// `NoCyclesAvailable` is fatal and raised before anything is written.
#[derive(Debug, Error)]
pub(crate) enum SyncError {
    #[error("I/O error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    #[error("fetch failed for cycle {cycle}: {reason}")]
    FetchFailed { cycle: String, reason: String },

    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed { archive: PathBuf, reason: String },

    #[error("no cycle could be fetched and extracted; store left untouched")]
    NoCyclesAvailable,

    #[error("unusable data file {path}: {reason}")]
    Data { path: PathBuf, reason: String },
}

impl From<std::io::Error> for SyncError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }
}

impl SyncError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
        }
    }

    pub(crate) fn data(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Data {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
