use crate::{MAX_BATCH_ITEMS, StoreError, StoreResult};

/// Configuration for the in-memory backend
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    pub max_batch_items: usize,
    /// Upper bound on items per query page regardless of the requested
    /// limit. Mirrors the size cap real stores put on a single response.
    pub max_page_items: usize,
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_batch_items: MAX_BATCH_ITEMS,
            max_page_items: 1000,
        }
    }
}

impl MemoryStoreConfig {
    pub fn with_max_batch_items(mut self, max: usize) -> Self {
        self.max_batch_items = max;
        self
    }

    pub fn with_max_page_items(mut self, max: usize) -> Self {
        self.max_page_items = max;
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.max_batch_items == 0 {
            return Err(StoreError::configuration(
                "max_batch_items must be at least 1",
            ));
        }
        if self.max_page_items == 0 {
            return Err(StoreError::configuration(
                "max_page_items must be at least 1",
            ));
        }
        Ok(())
    }
}
