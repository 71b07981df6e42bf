#![allow(missing_docs)]

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// Why a format version was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionProblem {
    /// A known version that is no longer accepted.
    Outdated,
    /// A version this importer does not know.
    Unknown,
}

impl fmt::Display for VersionProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionProblem::Outdated => write!(f, "outdated"),
            VersionProblem::Unknown => write!(f, "unknown"),
        }
    }
}

/// An error that aborts the import of one file, or of a whole batch.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not a valid glr file")]
    InvalidFormat,
    #[error("{kind} glr format version {version}")]
    UnsupportedVersion { version: u16, kind: VersionProblem },
    #[error("rom name is empty")]
    EmptyName,
    #[error("file declares zero triangles")]
    ZeroTriangles,
    #[error("file is too short for a header: expected {expected} bytes, found {actual}")]
    TruncatedHeader { expected: usize, actual: usize },
    #[error(
        "file size mismatch: {triangle_count} triangles need {expected} bytes after the header, found {actual}"
    )]
    SizeMismatch {
        triangle_count: u32,
        expected: u64,
        actual: u64,
    },
    #[error("invalid filter token {0:?}: expected 16 uppercase hex digits or NO_TEXTURE")]
    InvalidFilterExpression(String),
    #[error("an object named {0:?} already exists")]
    DuplicateName(String),
    #[error("no input files selected")]
    NoInputSelected,
    #[error("invalid import options: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ImportError::Io {
            path: path.into(),
            source,
        }
    }
}
