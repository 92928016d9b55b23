//! Reconciliation of remote batches with the local collection
//!
//! Remote wins on identical ids. Unseen remote ids are appended. Local
//! entries the batch doesn't mention are left alone, in their original
//! order.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{Quote, QuoteId};

/// How a same-id collision was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resolution {
    RemoteWins,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::RemoteWins => write!(f, "remote-wins"),
        }
    }
}

/// A local entry replaced by a remote record with the same id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub local_version: Quote,
    pub remote_version: Quote,
    pub resolution: Resolution,
}

/// What one reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// Remote records whose id was not present locally
    pub added: Vec<Quote>,
    /// Local entries overwritten by remote records
    pub conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn overwritten_count(&self) -> usize {
        self.conflicts.len()
    }

    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.conflicts.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: Vec<Quote>,
    pub report: ConflictReport,
}

/// Merge a remote batch into the local collection
///
/// A remote record that matches a local entry replaces it in place. A match
/// whose text, category and origin are already identical is left untouched
/// and not reported, so polling an unchanged remote is a no-op. This is the
/// one exception to unconditional overwrite: such an entry keeps its local
/// `updated_at` instead of taking the remote fetch time. If the batch
/// repeats an id, its last occurrence is used.
pub fn reconcile(local: Vec<Quote>, remote: Vec<Quote>) -> MergeOutcome {
    let mut merged = local;
    let mut report = ConflictReport::default();

    let mut positions: HashMap<QuoteId, Vec<usize>> = HashMap::new();
    for (index, quote) in merged.iter().enumerate() {
        positions.entry(quote.id).or_default().push(index);
    }

    for incoming in collapse_duplicates(remote) {
        match positions.get(&incoming.id) {
            None => {
                positions.insert(incoming.id, vec![merged.len()]);
                report.added.push(incoming.clone());
                merged.push(incoming);
            }
            Some(indices) => {
                for &index in indices {
                    let existing = &mut merged[index];
                    if same_content(existing, &incoming) {
                        continue;
                    }
                    let local_version = std::mem::replace(existing, incoming.clone());
                    report.conflicts.push(Conflict {
                        local_version,
                        remote_version: incoming.clone(),
                        resolution: Resolution::RemoteWins,
                    });
                }
            }
        }
    }

    MergeOutcome { merged, report }
}

/// Keep one record per id: the last one, at the first one's position
fn collapse_duplicates(batch: Vec<Quote>) -> Vec<Quote> {
    let mut slots: HashMap<QuoteId, usize> = HashMap::new();
    let mut unique: Vec<Quote> = Vec::with_capacity(batch.len());
    for quote in batch {
        match slots.get(&quote.id) {
            Some(&slot) => unique[slot] = quote,
            None => {
                slots.insert(quote.id, unique.len());
                unique.push(quote);
            }
        }
    }
    unique
}

fn same_content(a: &Quote, b: &Quote) -> bool {
    a.text == b.text && a.category == b.category && a.origin == b.origin
}
