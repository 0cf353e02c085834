use std::path::PathBuf;
use thiserror::Error;

/// Fatal failures of one `build` run.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot resolve module root {}: {reason}", .path.display())]
    Resolution { path: PathBuf, reason: String },
}

impl BuildError {
    pub fn resolution(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A reachable sub-unit that could not be introspected. Recorded and
/// skipped; never aborts the traversal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("skipped {}: {reason}", .path.display())]
pub struct AnalysisWarning {
    pub path: PathBuf,
    pub reason: WarningReason,
}

impl AnalysisWarning {
    pub fn new(path: impl Into<PathBuf>, reason: WarningReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarningReason {
    #[error("native extension with no inspectable structure")]
    NativeExtension,

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("unreadable source: {0}")]
    Unreadable(String),
}
