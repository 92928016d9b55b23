//! Storage layer
//!
//! - **Durable**: the quote collection and preferences, JSON files under the
//!   data directory
//! - **Session**: the last viewed quote, cleared with the session

pub mod error;
pub mod persistence;
pub mod session;

pub use error::{StorageError, StorageResult};
pub use persistence::{LoadOutcome, QuoteStore, CATEGORY_FILTER_KEY};
pub use session::SessionSlot;
