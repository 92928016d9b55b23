//! Local identifier allocation
//!
//! Local ids are epoch milliseconds, bumped past every id already seen so
//! they stay strictly increasing on one replica. Remote ids are small
//! integers, so the two spaces do not meet in practice.

use chrono::{DateTime, Utc};

use crate::error::{QuoteError, QuoteResult};
use crate::models::{QuoteId, MAX_QUOTE_ID};

#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the allocator from ids already in a collection
    pub fn seeded<'a>(ids: impl IntoIterator<Item = &'a QuoteId>) -> Self {
        let mut allocator = Self::new();
        for id in ids {
            allocator.observe(*id);
        }
        allocator
    }

    /// Record an id so later allocations never reuse it
    pub fn observe(&mut self, id: QuoteId) {
        self.last = self.last.max(id.value());
    }

    /// Allocate a fresh id at `now`
    ///
    /// Fails once the highest id seen sits at [`MAX_QUOTE_ID`].
    pub fn next(&mut self, now: DateTime<Utc>) -> QuoteResult<QuoteId> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = match self.last.checked_add(1) {
            Some(after_last) => millis.max(after_last),
            None => return Err(QuoteError::IdsExhausted),
        };
        if id > MAX_QUOTE_ID {
            return Err(QuoteError::IdsExhausted);
        }
        self.last = id;
        Ok(QuoteId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_uses_timestamp() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next(now).unwrap(), QuoteId(1_700_000_000_000));
    }

    #[test]
    fn test_next_is_strictly_increasing_within_same_millisecond() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut ids = IdAllocator::new();
        let a = ids.next(now).unwrap();
        let b = ids.next(now).unwrap();
        let c = ids.next(now).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_seeded_skips_existing_ids() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let existing = [QuoteId(5_000), QuoteId(3)];
        let mut ids = IdAllocator::seeded(existing.iter());
        assert_eq!(ids.next(now).unwrap(), QuoteId(5_001));
    }

    #[test]
    fn test_next_fails_at_ceiling_instead_of_overflowing() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();

        let mut ids = IdAllocator::seeded([QuoteId(MAX_QUOTE_ID)].iter());
        assert!(matches!(ids.next(now), Err(QuoteError::IdsExhausted)));

        let mut ids = IdAllocator::seeded([QuoteId(u64::MAX)].iter());
        assert!(matches!(ids.next(now), Err(QuoteError::IdsExhausted)));

        let mut ids = IdAllocator::seeded([QuoteId(MAX_QUOTE_ID - 1)].iter());
        assert_eq!(ids.next(now).unwrap(), QuoteId(MAX_QUOTE_ID));
    }
}
