use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Errors raised while ingesting a tabular input file.
///
/// Every variant is fatal to the operation that raised it; callers are
/// expected to abort the enclosing computation.
#[derive(Debug, thiserror::Error)]
pub enum TabularError {
    /// The file could not be opened or its contents could not be read.
    #[error("cannot read {path}: {detail}")]
    Io { path: PathBuf, detail: String },

    /// The caller broke the call-ordering or mapping-uniqueness contract.
    #[error("{0}")]
    Protocol(String),

    /// Units, quantities or data shapes do not match what was declared.
    #[error("{0}")]
    Validation(String),

    /// The operation is not supported for this kind of source.
    #[error("{0} is not implemented for dataset-backed input files")]
    NotImplemented(&'static str),
}

/// Coarse classification of a [`TabularError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Protocol,
    Validation,
    NotImplemented,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "I/O error",
            ErrorKind::Protocol => "protocol error",
            ErrorKind::Validation => "validation error",
            ErrorKind::NotImplemented => "not implemented",
        };
        f.write_str(name)
    }
}

impl TabularError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabularError::Io { .. } => ErrorKind::Io,
            TabularError::Protocol(_) => ErrorKind::Protocol,
            TabularError::Validation(_) => ErrorKind::Validation,
            TabularError::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }

    /// Wrap a source-level failure (an `anyhow` chain) as an I/O error.
    pub(crate) fn io(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        TabularError::Io {
            path: path.into(),
            detail: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, TabularError>;
