use crate::db::Database;
use crate::error::VotingResult;
use crate::models::{Feature, Page, MAX_PAGE_SIZE};

/// Read-only, popularity-ordered listing over the feature store.
///
/// Reads only cached counters, never the ledger, and takes no vote gate.
/// Each page comes from one storage snapshot, so a concurrently committing
/// vote is either fully visible or not at all.
#[derive(Clone)]
pub struct RankingReader {
    db: Database,
}

impl RankingReader {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns page `page` (1-based) of size `page_size`.
    ///
    /// `page` below 1 is treated as 1 and `page_size` is clamped to
    /// `[1, MAX_PAGE_SIZE]`; the envelope reports the values actually used.
    pub fn list(&self, page: u32, page_size: u32) -> VotingResult<Page<Feature>> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let offset = u64::from(page - 1) * u64::from(page_size);

        let (total, items) = self.db.ranked_features(page_size, offset)?;
        Ok(Page::new(items, total, page, page_size))
    }
}
