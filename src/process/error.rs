use std::{fmt, path::PathBuf};
use thiserror::Error;

/// Coarse failure category, stable for callers that only care about why a ticker was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Input missing, unreadable, malformed, or without a `Date` column.
    Load,
    /// Unexpected failure while reshaping a loaded table.
    Transform,
    /// Cleaned table could not be written.
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Load => "load",
            FailureKind::Transform => "transform",
            FailureKind::Write => "write",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to load {}: {source:#}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("missing Date column in {}", .path.display())]
    MissingDateColumn { path: PathBuf },

    #[error("failed to transform {}: {source:#}", .path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write {}: {source:#}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl PreprocessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PreprocessError::Load { .. } | PreprocessError::MissingDateColumn { .. } => {
                FailureKind::Load
            }
            PreprocessError::Transform { .. } => FailureKind::Transform,
            PreprocessError::Write { .. } => FailureKind::Write,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            PreprocessError::Load { path, .. }
            | PreprocessError::MissingDateColumn { path }
            | PreprocessError::Transform { path, .. }
            | PreprocessError::Write { path, .. } => path,
        }
    }
}
