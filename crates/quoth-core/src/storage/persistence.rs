//! Quote collection persistence
//!
//! Saves and loads the quote collection and small preference values as JSON
//! files. Uses atomic writes (write to temp file, then rename) so a crash
//! never leaves a half-written collection behind.
//!
//! Storage location: `~/.local/share/quoth/` (configurable via `Config`)
//!
//! Files:
//! - `quotes.json` - JSON array of quote records
//! - `preferences.json` - string map of UI preferences

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::ids::IdAllocator;
use crate::models::{Quote, QuoteRecord};

/// Preference key for the last selected category filter
pub const CATEGORY_FILTER_KEY: &str = "category_filter";

/// Result of loading the durable collection
///
/// Loading never fails. When the stored file exists but is unusable the
/// quotes are empty and `issue` carries the reason for logging.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub quotes: Vec<Quote>,
    pub issue: Option<StorageError>,
    /// Records that were given an id or timestamp and should be written back
    pub migrated: usize,
}

/// Durable storage for the quote collection and preferences
#[derive(Debug, Clone)]
pub struct QuoteStore {
    quotes_path: PathBuf,
    preferences_path: PathBuf,
}

impl QuoteStore {
    /// Create a store rooted at the configured data directory
    pub fn new(config: &Config) -> Self {
        Self {
            quotes_path: config.quotes_path(),
            preferences_path: config.preferences_path(),
        }
    }

    pub fn quotes_path(&self) -> &Path {
        &self.quotes_path
    }

    /// Check if a collection has been saved
    pub fn exists(&self) -> bool {
        self.quotes_path.exists()
    }

    /// Load the stored collection
    ///
    /// A missing file is an empty collection. Records without an id are
    /// given a fresh local one; records with blank text or category, or an
    /// id past [`MAX_QUOTE_ID`](crate::models::MAX_QUOTE_ID), are dropped.
    pub fn load(&self) -> LoadOutcome {
        let content = match fs::read_to_string(&self.quotes_path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return LoadOutcome::default(),
            Err(e) => {
                let issue = StorageError::ReadError {
                    path: self.quotes_path.clone(),
                    source: e,
                };
                warn!("{}", issue);
                return LoadOutcome {
                    issue: Some(issue),
                    ..LoadOutcome::default()
                };
            }
        };

        let records: Vec<QuoteRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                let issue = self.quarantine(e.to_string());
                warn!("{}", issue);
                return LoadOutcome {
                    issue: Some(issue),
                    ..LoadOutcome::default()
                };
            }
        };

        let records: Vec<QuoteRecord> = records
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Dropping stored quote {:?}: {}", record.id, e);
                    false
                }
            })
            .collect();

        let now = Utc::now();
        let mut ids = IdAllocator::seeded(records.iter().filter_map(|r| r.id.as_ref()));
        let mut quotes = Vec::with_capacity(records.len());
        let mut migrated = 0;
        for record in records {
            if record.id.is_none() || record.updated_at.is_none() {
                migrated += 1;
            }
            let id = match record.id {
                Some(id) => id,
                None => match ids.next(now) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Dropping stored quote without id: {}", e);
                        continue;
                    }
                },
            };
            quotes.push(record.into_quote(|| id, now));
        }

        debug!("Loaded {} quotes from {:?}", quotes.len(), self.quotes_path);
        LoadOutcome {
            quotes,
            issue: None,
            migrated,
        }
    }

    /// Atomically replace the stored collection
    pub fn save(&self, quotes: &[Quote]) -> StorageResult<()> {
        let records: Vec<QuoteRecord> = quotes.iter().map(QuoteRecord::from).collect();
        let json = serde_json::to_vec(&records)?;
        atomic_write(&self.quotes_path, &json)?;
        debug!("Saved {} quotes to {:?}", quotes.len(), self.quotes_path);
        Ok(())
    }

    /// Read a preference value
    ///
    /// An unreadable preferences file counts as no preference.
    pub fn load_preference(&self, key: &str) -> Option<String> {
        self.read_preferences().remove(key)
    }

    /// Store a preference value
    pub fn save_preference(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut prefs = self.read_preferences();
        prefs.insert(key.to_string(), value.to_string());
        let json = serde_json::to_vec_pretty(&prefs)?;
        atomic_write(&self.preferences_path, &json)
    }

    fn read_preferences(&self) -> BTreeMap<String, String> {
        let Ok(content) = fs::read_to_string(&self.preferences_path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring unreadable preferences {:?}: {}", self.preferences_path, e);
            BTreeMap::new()
        })
    }

    /// Copy an unparseable collection aside so the next save doesn't destroy it
    fn quarantine(&self, details: String) -> StorageError {
        let backup_path = corrupt_backup_path(&self.quotes_path);
        match fs::copy(&self.quotes_path, &backup_path) {
            Ok(_) => info!("Backed up unreadable quotes to {:?}", backup_path),
            Err(e) => warn!("Could not back up {:?}: {}", self.quotes_path, e),
        }
        StorageError::Corrupt {
            path: self.quotes_path.clone(),
            backup_path,
            details,
        }
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt.backup");
    PathBuf::from(name)
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path,
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
