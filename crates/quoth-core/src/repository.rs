//! Quote repository
//!
//! The `QuoteRepository` owns the in-memory collection and writes it through
//! the `QuoteStore` after every mutation.
//!
//! ## Usage
//!
//! ```ignore
//! let mut repo = QuoteRepository::open()?;
//!
//! let quote = repo.add("Knowledge is power.", "Education")?;
//! let categories = repo.categories();
//! ```
//!
//! When a save fails the in-memory collection stays authoritative and is
//! marked dirty; the next mutation (or `flush`) tries again.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{QuoteError, QuoteResult};
use crate::ids::IdAllocator;
use crate::models::{Quote, QuoteId, QuoteRecord, ALL_CATEGORIES};
use crate::storage::{QuoteStore, StorageError, CATEGORY_FILTER_KEY};

pub struct QuoteRepository {
    quotes: Vec<Quote>,
    store: QuoteStore,
    ids: IdAllocator,
    dirty: bool,
    load_issue: Option<StorageError>,
}

impl QuoteRepository {
    /// Open the repository using the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::open_with_config(&config))
    }

    /// Open the repository with a specific configuration
    ///
    /// Never fails: unreadable stored data yields an empty collection and
    /// the problem is kept for [`take_load_issue`](Self::take_load_issue).
    pub fn open_with_config(config: &Config) -> Self {
        Self::with_store(QuoteStore::new(config))
    }

    /// Build a repository over an existing store
    ///
    /// Records that needed an id or timestamp filled in are written back
    /// once so the assigned values stay stable across loads.
    pub fn with_store(store: QuoteStore) -> Self {
        let outcome = store.load();
        let ids = IdAllocator::seeded(outcome.quotes.iter().map(|q| &q.id));
        info!("Opened quote repository with {} quotes", outcome.quotes.len());

        let mut repo = Self {
            quotes: outcome.quotes,
            store,
            ids,
            dirty: false,
            load_issue: outcome.issue,
        };
        repo.write_back_migrated(outcome.migrated);
        repo
    }

    /// Pick up changes another process saved since this one loaded
    ///
    /// Unsaved local changes win: a dirty repository keeps its memory. An
    /// unreadable file also leaves memory untouched. Returns whether the
    /// collection was replaced from disk.
    pub fn reload(&mut self) -> bool {
        if self.dirty {
            warn!("Not reloading quotes, unsaved changes are pending");
            return false;
        }

        let outcome = self.store.load();
        if let Some(issue) = outcome.issue {
            warn!("Keeping quotes in memory, reload failed: {}", issue);
            return false;
        }

        for quote in &outcome.quotes {
            self.ids.observe(quote.id);
        }
        debug!("Reloaded {} quotes from disk", outcome.quotes.len());
        self.quotes = outcome.quotes;
        self.write_back_migrated(outcome.migrated);
        true
    }

    fn write_back_migrated(&mut self, migrated: usize) {
        if migrated == 0 {
            return;
        }
        info!("Writing back {} migrated quotes", migrated);
        if let Err(e) = self.persist() {
            warn!("Migrated quotes not saved yet: {}", e);
        }
    }

    /// The problem hit while loading, if the stored collection was unusable
    pub fn take_load_issue(&mut self) -> Option<QuoteError> {
        self.load_issue.take().map(QuoteError::StorageCorrupt)
    }

    /// Current in-memory collection
    pub fn all(&self) -> &[Quote] {
        &self.quotes
    }

    /// Owned copy of the collection, for handing to the merge
    pub fn snapshot(&self) -> Vec<Quote> {
        self.quotes.clone()
    }

    /// First quote with the given id
    pub fn get(&self, id: QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Whether the last save failed and memory is ahead of disk
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &QuoteStore {
        &self.store
    }

    // ==================== Mutations ====================

    /// Create a local quote, append it and persist
    ///
    /// Blank text or category is rejected before anything changes. If the
    /// save fails the quote stays in memory and `StorageWrite` is returned.
    pub fn add(&mut self, text: &str, category: &str) -> QuoteResult<Quote> {
        let now = Utc::now();
        // Validate before touching the allocator so a rejected add leaves no trace
        let mut quote = Quote::new_local(QuoteId(0), text, category, now)?;
        quote.id = self.ids.next(now)?;

        self.quotes.push(quote.clone());
        info!("Added quote {} in category {:?}", quote.id, quote.category);
        self.persist()?;
        Ok(quote)
    }

    /// Append externally supplied records without checking ids
    ///
    /// Duplicate ids are allowed here. Every record is validated first; one
    /// bad record rejects the whole batch. Records without an id get a
    /// fresh local one.
    pub fn import_many(&mut self, records: Vec<QuoteRecord>) -> QuoteResult<&[Quote]> {
        for (index, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|e| QuoteError::ImportParse(format!("record {}: {}", index, e)))?;
        }

        let now = Utc::now();
        let count = records.len();
        for record in records {
            let id = match record.id {
                Some(id) => id,
                None => self.ids.next(now)?,
            };
            let quote = record.into_quote(|| id, now);
            self.ids.observe(quote.id);
            self.quotes.push(quote);
        }

        info!("Imported {} quotes", count);
        self.persist()?;
        Ok(&self.quotes)
    }

    /// Parse an import payload and append it
    pub fn import_json(&mut self, json: &str) -> QuoteResult<usize> {
        let records = parse_import(json)?;
        let count = records.len();
        self.import_many(records)?;
        Ok(count)
    }

    /// Install a reconciled collection and persist it
    pub fn replace_all(&mut self, quotes: Vec<Quote>) -> QuoteResult<()> {
        for quote in &quotes {
            self.ids.observe(quote.id);
        }
        self.quotes = quotes;
        self.persist()
    }

    /// Retry persisting after an earlier failure
    pub fn flush(&mut self) -> QuoteResult<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&mut self) -> QuoteResult<()> {
        match self.store.save(&self.quotes) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                warn!("Keeping unsaved quotes in memory: {}", e);
                self.dirty = true;
                Err(QuoteError::StorageWrite(e))
            }
        }
    }

    // ==================== Queries ====================

    /// Distinct category labels
    pub fn categories(&self) -> BTreeSet<String> {
        self.quotes.iter().map(|q| q.category.clone()).collect()
    }

    /// Quotes under a category, or all of them for the `"all"` sentinel
    pub fn by_category(&self, filter: &str) -> Vec<&Quote> {
        self.quotes
            .iter()
            .filter(|q| q.matches_filter(filter))
            .collect()
    }

    /// Pretty-printed JSON of the whole collection
    pub fn export_json(&self) -> QuoteResult<String> {
        let records: Vec<QuoteRecord> = self.quotes.iter().map(QuoteRecord::from).collect();
        serde_json::to_string_pretty(&records)
            .map_err(|e| QuoteError::StorageWrite(StorageError::Serialize(e)))
    }

    // ==================== Preferences ====================

    /// Last selected category filter
    ///
    /// Falls back to `"all"` when nothing was stored or the stored label no
    /// longer exists in the collection.
    pub fn category_filter(&self) -> String {
        match self.store.load_preference(CATEGORY_FILTER_KEY) {
            Some(filter) if filter == ALL_CATEGORIES || self.categories().contains(&filter) => {
                filter
            }
            _ => ALL_CATEGORIES.to_string(),
        }
    }

    /// Remember the selected category filter
    pub fn set_category_filter(&self, filter: &str) -> QuoteResult<()> {
        if filter != ALL_CATEGORIES && !self.categories().contains(filter) {
            return Err(QuoteError::Validation { field: "category" });
        }
        self.store
            .save_preference(CATEGORY_FILTER_KEY, filter)
            .map_err(QuoteError::StorageWrite)
    }
}

/// Parse an import payload: a JSON array of quote-shaped objects
///
/// The whole payload is rejected if it isn't an array of records or any
/// record has a blank field.
pub fn parse_import(json: &str) -> QuoteResult<Vec<QuoteRecord>> {
    let records: Vec<QuoteRecord> =
        serde_json::from_str(json).map_err(|e| QuoteError::ImportParse(e.to_string()))?;

    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .map_err(|e| QuoteError::ImportParse(format!("record {}: {}", index, e)))?;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Origin, MAX_QUOTE_ID, SERVER_CATEGORY};
    use std::fs;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            session_dir: temp_dir.path().join("session"),
            ..Config::default()
        }
    }

    fn record(id: Option<u64>, text: &str, category: &str) -> QuoteRecord {
        QuoteRecord {
            id: id.map(QuoteId),
            text: text.to_string(),
            category: category.to_string(),
            updated_at: None,
            origin: None,
        }
    }

    #[test]
    fn test_open_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        assert!(repo.is_empty());
        assert!(repo.take_load_issue().is_none());
    }

    #[test]
    fn test_add_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let quote = {
            let mut repo = QuoteRepository::open_with_config(&config);
            repo.add("Knowledge is power.", "Education").unwrap()
        };

        let repo = QuoteRepository::open_with_config(&config);
        assert_eq!(repo.all(), &[quote.clone()]);
        assert_eq!(repo.get(quote.id), Some(&quote));
        assert_eq!(quote.origin, Origin::Local);
    }

    #[test]
    fn test_add_assigns_unique_ids() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        let a = repo.add("A", "X").unwrap();
        let b = repo.add("B", "X").unwrap();
        let c = repo.add("C", "Y").unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn test_add_rejects_empty_fields() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("kept", "X").unwrap();
        let before = repo.snapshot();

        let err = repo.add("", "x").unwrap_err();
        assert!(matches!(err, QuoteError::Validation { .. }));
        let err = repo.add("x", "").unwrap_err();
        assert!(matches!(err, QuoteError::Validation { .. }));
        let err = repo.add("x", "   ").unwrap_err();
        assert!(matches!(err, QuoteError::Validation { .. }));

        assert_eq!(repo.all(), before.as_slice());
        assert!(!repo.is_dirty());
    }

    #[test]
    fn test_import_does_not_dedupe() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.replace_all(vec![Quote::from_remote(QuoteId(1), "A", Utc::now())])
            .unwrap();

        let all = repo
            .import_many(vec![record(Some(1), "Imported", "Inspiration")])
            .unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|q| q.id == QuoteId(1)));
    }

    #[test]
    fn test_import_assigns_missing_ids() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        repo.import_many(vec![record(None, "A", "X"), record(None, "B", "X")])
            .unwrap();
        assert_ne!(repo.all()[0].id, repo.all()[1].id);
    }

    #[test]
    fn test_import_rejects_whole_batch() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        let err = repo
            .import_many(vec![record(Some(1), "A", "X"), record(Some(2), "B", "")])
            .unwrap_err();
        assert!(matches!(err, QuoteError::ImportParse(_)));
        assert!(repo.is_empty());
    }

    #[test]
    fn test_import_json() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        let count = repo
            .import_json(r#"[{"text": "Knowledge is power.", "category": "Education"}]"#)
            .unwrap();
        assert_eq!(count, 1);

        let err = repo.import_json(r#"{"text": "not an array"}"#).unwrap_err();
        assert!(matches!(err, QuoteError::ImportParse(_)));
        let err = repo.import_json("[{\"text\": 3}]").unwrap_err();
        assert!(matches!(err, QuoteError::ImportParse(_)));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_import_rejects_ids_past_the_ceiling() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));

        let err = repo
            .import_json(r#"[{"id": 18446744073709551615, "text": "A", "category": "X"}]"#)
            .unwrap_err();
        assert!(matches!(err, QuoteError::ImportParse(_)));
        assert!(repo.is_empty());

        let quote = repo.add("Still works", "X").unwrap();
        assert!(quote.id.value() <= MAX_QUOTE_ID);
    }

    #[test]
    fn test_add_after_highest_id_reports_exhaustion() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.import_many(vec![record(Some(MAX_QUOTE_ID), "Top", "X")])
            .unwrap();

        let err = repo.add("One more", "X").unwrap_err();
        assert!(matches!(err, QuoteError::IdsExhausted));
        assert_eq!(repo.len(), 1);

        let err = repo.import_many(vec![record(None, "B", "X")]).unwrap_err();
        assert!(matches!(err, QuoteError::IdsExhausted));
    }

    #[test]
    fn test_migrated_ids_are_stable_across_opens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        fs::write(
            config.quotes_path(),
            r#"[{"text": "Knowledge is power.", "category": "Education"}]"#,
        )
        .unwrap();

        let first = QuoteRepository::open_with_config(&config).all()[0].clone();
        let second = QuoteRepository::open_with_config(&config);
        assert_eq!(second.all()[0].id, first.id);
        assert_eq!(second.all()[0].updated_at, first.updated_at);
        assert_eq!(second.get(first.id), Some(&first));
    }

    #[test]
    fn test_reload_picks_up_other_writers() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);
        repo.add("Mine", "X").unwrap();

        let mut other = QuoteRepository::open_with_config(&config);
        let theirs = other.add("Theirs", "Y").unwrap();

        assert!(repo.reload());
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(theirs.id), Some(&theirs));

        let next = repo.add("Later", "X").unwrap();
        assert!(next.id > theirs.id);
    }

    #[test]
    fn test_reload_keeps_dirty_memory() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);

        fs::create_dir_all(config.quotes_path()).unwrap();
        repo.add("Unsaved", "X").unwrap_err();

        assert!(!repo.reload());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_export_then_import_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("A", "X").unwrap();
        repo.add("B", "Y").unwrap();

        let exported = repo.export_json().unwrap();
        assert!(exported.contains('\n'));

        let records = parse_import(&exported).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "A");
        assert_eq!(records[1].category, "Y");
    }

    #[test]
    fn test_categories_and_filter() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("A", "Motivation").unwrap();
        repo.add("B", "Education").unwrap();
        repo.add("C", "Motivation").unwrap();

        let categories: Vec<_> = repo.categories().into_iter().collect();
        assert_eq!(categories, vec!["Education", "Motivation"]);

        assert_eq!(repo.by_category("Motivation").len(), 2);
        assert_eq!(repo.by_category(ALL_CATEGORIES).len(), 3);
        assert!(repo.by_category(SERVER_CATEGORY).is_empty());
    }

    #[test]
    fn test_category_filter_preference() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);
        repo.add("A", "Motivation").unwrap();

        assert_eq!(repo.category_filter(), ALL_CATEGORIES);

        repo.set_category_filter("Motivation").unwrap();
        let reopened = QuoteRepository::open_with_config(&config);
        assert_eq!(reopened.category_filter(), "Motivation");

        let err = repo.set_category_filter("Unknown").unwrap_err();
        assert!(matches!(err, QuoteError::Validation { .. }));
    }

    #[test]
    fn test_stale_filter_falls_back_to_all() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = QuoteRepository::open_with_config(&test_config(&temp_dir));
        repo.add("A", "Motivation").unwrap();
        repo.set_category_filter("Motivation").unwrap();

        repo.replace_all(Vec::new()).unwrap();
        assert_eq!(repo.category_filter(), ALL_CATEGORIES);
    }

    #[test]
    fn test_corrupt_store_opens_empty() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        fs::write(config.quotes_path(), "garbage").unwrap();

        let mut repo = QuoteRepository::open_with_config(&config);
        assert!(repo.is_empty());
        assert!(matches!(
            repo.take_load_issue(),
            Some(QuoteError::StorageCorrupt(_))
        ));
        assert!(repo.take_load_issue().is_none());
    }

    #[test]
    fn test_failed_save_keeps_memory_and_retries() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);
        let mut repo = QuoteRepository::open_with_config(&config);

        // A directory where the file should be makes the rename fail
        fs::create_dir_all(config.quotes_path()).unwrap();
        let err = repo.add("A", "X").unwrap_err();
        assert!(matches!(err, QuoteError::StorageWrite(_)));
        assert_eq!(repo.len(), 1);
        assert!(repo.is_dirty());

        fs::remove_dir_all(config.quotes_path()).unwrap();
        repo.flush().unwrap();
        assert!(!repo.is_dirty());

        let reopened = QuoteRepository::open_with_config(&config);
        assert_eq!(reopened.len(), 1);
    }
}
