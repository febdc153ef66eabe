use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the indexing and retrieval library.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of range (e.g. `ngrams < 1`).
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }
}

/// Failures reading or writing persisted index artifacts.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("artifact not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("i/o error on {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    /// The artifact exists but cannot be parsed or violates an index invariant.
    #[error("corrupt artifact {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to encode {}: {source}", path.display())]
    Encode { path: PathBuf, source: serde_json::Error },

    #[error("csv export to {} failed: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

impl StorageError {
    /// Maps an open/read failure, keeping "not found" distinct from other I/O errors.
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::Missing { path }
        } else {
            StorageError::Io { path, source }
        }
    }

    pub(crate) fn corrupt<S: Into<String>>(path: PathBuf, reason: S) -> Self {
        StorageError::Corrupt { path, reason: reason.into() }
    }
}
