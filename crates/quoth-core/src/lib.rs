//! Quoth Core Library
//!
//! This crate provides the core functionality for Quoth, a local-first
//! quote collection that keeps itself in step with a remote source.
//!
//! # Architecture
//!
//! - **JSON file**: Source of truth for the collection, written atomically
//! - **Remote source**: Bounded batches merged in with remote-wins rules
//!
//! All queries are served from the in-memory collection held by the
//! repository.
//!
//! # Quick Start
//!
//! ```text
//! let mut repo = QuoteRepository::open()?;
//!
//! // Add a quote
//! let quote = repo.add("Knowledge is power.", "Education")?;
//!
//! // Query quotes
//! let education = repo.by_category("Education");
//! ```
//!
//! # Modules
//!
//! - `repository`: In-memory collection with write-through persistence (main entry point)
//! - `models`: Quote records and identifiers
//! - `storage`: JSON persistence, preferences and the session slot
//! - `remote`: Remote source trait and its HTTP implementation
//! - `sync`: Merge rules, sync engine, outbox and scheduler
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod remote;
pub mod repository;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use error::{QuoteError, QuoteResult};
pub use ids::IdAllocator;
pub use models::{
    Origin, Quote, QuoteId, QuoteRecord, ALL_CATEGORIES, MAX_QUOTE_ID, SERVER_CATEGORY,
};
pub use remote::{HttpRemote, RemoteSource};
pub use repository::{parse_import, QuoteRepository};
pub use storage::{QuoteStore, SessionSlot, StorageError};
pub use sync::{
    reconcile, ConflictReport, Outbox, SyncEngine, SyncEvent, SyncOutcome, SyncPhase,
    SyncSummary,
};
