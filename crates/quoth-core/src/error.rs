//! Error taxonomy for quote operations
//!
//! Every failure is recovered by the component that detects it and reaches
//! the user as one readable notification via [`QuoteError::notification`].

use std::time::Duration;

use thiserror::Error;

use crate::models::QuoteId;
use crate::storage::StorageError;

/// Errors surfaced by the repository, remote adapter and sync engine
#[derive(Error, Debug)]
pub enum QuoteError {
    /// A required field was empty on local add
    #[error("Quote {field} must not be empty")]
    Validation { field: &'static str },

    /// Persisted data could not be parsed; an empty collection was used instead
    #[error("Stored quotes are unreadable: {0}")]
    StorageCorrupt(#[source] StorageError),

    /// Persisting the collection failed; in-memory state is kept
    #[error("Failed to save quotes: {0}")]
    StorageWrite(#[source] StorageError),

    /// Remote fetch or push failed
    #[error("Network error: {0}")]
    Network(String),

    /// The remote call did not finish in time
    #[error("Remote request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// An import payload was malformed; nothing was appended
    #[error("Import rejected: {0}")]
    ImportParse(String),

    /// Another sync cycle is already running
    #[error("Sync already in progress")]
    SyncInProgress,

    /// A record carried an id above the supported range
    #[error("Quote id {0} is out of range")]
    IdOutOfRange(QuoteId),

    /// No local id is left above the highest id in the collection
    #[error("No free quote id left")]
    IdsExhausted,
}

impl QuoteError {
    /// Message suitable for a one-line user notification
    pub fn notification(&self) -> String {
        match self {
            QuoteError::Validation { .. } => "Please enter both quote and category.".to_string(),
            QuoteError::StorageCorrupt(_) => {
                "Saved quotes could not be read and were reset. A backup was kept.".to_string()
            }
            QuoteError::StorageWrite(e) => match e.recovery_suggestion() {
                Some(hint) => format!("Quotes could not be saved. {}", hint),
                None => "Quotes could not be saved. Changes are kept until the next save."
                    .to_string(),
            },
            QuoteError::Network(_) | QuoteError::Timeout(_) => {
                "Could not reach the quote server. Will try again on the next sync.".to_string()
            }
            QuoteError::ImportParse(details) => format!("Import failed: {}", details),
            QuoteError::SyncInProgress => "A sync is already running.".to_string(),
            QuoteError::IdOutOfRange(id) => format!("Quote id {} is too large to store.", id),
            QuoteError::IdsExhausted => {
                "No new quote id is available. Remove quotes with very large ids.".to_string()
            }
        }
    }

    /// Whether the failure came from talking to the remote side
    pub fn is_network(&self) -> bool {
        matches!(self, QuoteError::Network(_) | QuoteError::Timeout(_))
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(error: reqwest::Error) -> Self {
        QuoteError::Network(error.to_string())
    }
}

/// Result type for quote operations
pub type QuoteResult<T> = Result<T, QuoteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_validation_display() {
        let err = QuoteError::Validation { field: "category" };
        assert_eq!(err.to_string(), "Quote category must not be empty");
        assert_eq!(err.notification(), "Please enter both quote and category.");
    }

    #[test]
    fn test_storage_write_notification_uses_hint() {
        let err = QuoteError::StorageWrite(StorageError::DiskFull {
            path: PathBuf::from("/data/quotes.json"),
            source: io::Error::new(io::ErrorKind::Other, "No space left on device"),
        });
        assert!(err.notification().contains("Free some disk space"));
    }

    #[test]
    fn test_timeout_is_network() {
        let err = QuoteError::Timeout(Duration::from_secs(10));
        assert!(err.is_network());
        assert_eq!(err.to_string(), "Remote request timed out after 10s");
        assert!(!QuoteError::SyncInProgress.is_network());
    }
}
