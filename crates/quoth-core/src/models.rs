//! Data models for Quoth
//!
//! `Quote` is the in-memory record. `QuoteRecord` is the shape written to
//! disk and accepted from import files; it tolerates records written before
//! ids and timestamps were tracked.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};

/// Category label assigned to every record fetched from the remote source
pub const SERVER_CATEGORY: &str = "Server";

/// Sentinel filter value meaning "every category"
pub const ALL_CATEGORIES: &str = "all";

/// Largest id accepted from storage, imports or the remote source
///
/// Ids are JSON numbers, so they stay within the range a double represents
/// exactly.
pub const MAX_QUOTE_ID: u64 = (1 << 53) - 1;

/// Identifier of a quote, unique within a collection after a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub u64);

impl QuoteId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for QuoteId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Where a quote came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Created on this replica and not yet reconciled
    #[default]
    Local,
    /// Installed from the remote source
    Remote,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => write!(f, "local"),
            Origin::Remote => write!(f, "remote"),
        }
    }
}

/// A quote with its category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: QuoteId,
    pub text: String,
    pub category: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub origin: Origin,
}

impl Quote {
    /// Build a locally created quote, trimming and validating both fields
    pub fn new_local(
        id: QuoteId,
        text: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> QuoteResult<Self> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() {
            return Err(QuoteError::Validation { field: "text" });
        }
        if category.is_empty() {
            return Err(QuoteError::Validation { field: "category" });
        }

        Ok(Self {
            id,
            text: text.to_string(),
            category: category.to_string(),
            updated_at: truncate_to_millis(now),
            origin: Origin::Local,
        })
    }

    /// Build a quote from a remote record, which carries no category or timestamp
    pub fn from_remote(id: QuoteId, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            category: SERVER_CATEGORY.to_string(),
            updated_at: truncate_to_millis(now),
            origin: Origin::Remote,
        }
    }

    /// Whether this quote belongs under the given category filter
    pub fn matches_filter(&self, filter: &str) -> bool {
        filter == ALL_CATEGORIES || self.category == filter
    }

    pub fn to_record(&self) -> QuoteRecord {
        QuoteRecord {
            id: Some(self.id),
            text: self.text.clone(),
            category: self.category.clone(),
            updated_at: Some(self.updated_at.timestamp_millis()),
            origin: Some(self.origin),
        }
    }
}

/// Persisted / imported shape of a quote
///
/// `id` and `updatedAt` are optional so that older files and hand-written
/// imports still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteId>,
    pub text: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl QuoteRecord {
    /// Check that both text and category are present and the id is usable
    pub fn validate(&self) -> QuoteResult<()> {
        if let Some(id) = self.id {
            if id.value() > MAX_QUOTE_ID {
                return Err(QuoteError::IdOutOfRange(id));
            }
        }
        if self.text.trim().is_empty() {
            return Err(QuoteError::Validation { field: "text" });
        }
        if self.category.trim().is_empty() {
            return Err(QuoteError::Validation { field: "category" });
        }
        Ok(())
    }

    /// Turn the record into a quote, using `fallback_id` when the record has none
    pub fn into_quote(self, fallback_id: impl FnOnce() -> QuoteId, now: DateTime<Utc>) -> Quote {
        let updated_at = self
            .updated_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(|| truncate_to_millis(now));

        Quote {
            id: self.id.unwrap_or_else(fallback_id),
            text: self.text,
            category: self.category,
            updated_at,
            origin: self.origin.unwrap_or_default(),
        }
    }
}

impl From<&Quote> for QuoteRecord {
    fn from(quote: &Quote) -> Self {
        quote.to_record()
    }
}

/// Drop sub-millisecond precision so values survive the epoch-ms round trip
pub fn truncate_to_millis(time: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(time.timestamp_millis())
        .single()
        .unwrap_or(time)
}
