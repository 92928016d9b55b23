//! Session-scoped slot for the last viewed quote
//!
//! Lives under the session directory (the OS temp dir by default), so it is
//! gone after a reboot or an explicit clear. Nothing here is authoritative.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use super::error::StorageResult;
use super::persistence::atomic_write;
use crate::config::Config;
use crate::models::{Quote, QuoteId, QuoteRecord};

#[derive(Debug, Clone)]
pub struct SessionSlot {
    path: PathBuf,
}

impl SessionSlot {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.last_viewed_path(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remember the quote the user looked at last
    pub fn store(&self, quote: &Quote) -> StorageResult<()> {
        let json = serde_json::to_vec(&quote.to_record())?;
        atomic_write(&self.path, &json)
    }

    /// Read the last viewed quote, if any survives in this session
    pub fn load(&self) -> Option<Quote> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<QuoteRecord>(&content) {
            Ok(record) if record.validate().is_ok() => {
                Some(record.into_quote(|| QuoteId(0), Utc::now()))
            }
            Ok(_) | Err(_) => {
                debug!("Ignoring unreadable session slot {:?}", self.path);
                None
            }
        }
    }

    /// Forget the last viewed quote
    pub fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(super::StorageError::from_io(e, self.path.clone())),
        }
    }
}
