//! Errors raised while reading or writing the quote files

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Could not create the quote directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not allowed to write quotes to '{path}'")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No space or quota left on the device holding the data directory
    #[error("No room left to save quotes at '{path}'")]
    DiskFull {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not read quotes from '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not save quotes to '{path}': {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `quotes.json` is not a JSON array of quote records
    #[error("Stored quotes at '{path}' are unreadable ({details}); a copy was kept at '{backup_path}'")]
    Corrupt {
        path: PathBuf,
        backup_path: PathBuf,
        details: String,
    },

    #[error("Could not encode quotes as JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The temp file was written but could not replace the real one
    #[error("Could not move '{from}' into place at '{to}': {source}")]
    AtomicWriteFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    /// Wrap an I/O failure on `path`, sorting out the cases a user can act on
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path,
                source: error,
            },
            _ if looks_like_disk_full(&error) => StorageError::DiskFull {
                path,
                source: error,
            },
            _ => StorageError::WriteError {
                path,
                source: error,
            },
        }
    }

    /// What the user can do about it, when there is something
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free some disk space and try again."),
            StorageError::PermissionDenied { .. } | StorageError::CreateDirectory { .. } => {
                Some("Make the data directory writable, or point data_dir somewhere else.")
            }
            StorageError::Corrupt { .. } => {
                Some("Fix the saved copy and bring it back with `quoth import`.")
            }
            _ => None,
        }
    }
}

fn looks_like_disk_full(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    ["no space left", "disk full", "quota exceeded", "not enough space"]
        .iter()
        .any(|needle| msg.contains(needle))
}

pub type StorageResult<T> = Result<T, StorageError>;
