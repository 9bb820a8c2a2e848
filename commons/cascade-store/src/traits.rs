use async_trait::async_trait;

use crate::{
    BatchWriteOutcome, ContinuationToken, Item, ItemKey, ItemUpdate,
    MAX_BATCH_ITEMS, QueryPage, StoreResult, WriteRequest,
};

/// Access patterns the cascade engine needs from the wide-column store.
///
/// Every call is a network round trip in production; implementations must
/// be safe to share between concurrently running tasks.
#[async_trait]
pub trait WideColumnStore: Send + Sync {
    /// Query one partition for items whose sort key starts with
    /// `sort_key_prefix`, in sort-key order. At most `limit` items are
    /// returned; `next` is set when more may follow.
    async fn query(
        &self,
        table: &str,
        partition_key: &str,
        sort_key_prefix: &str,
        limit: usize,
        start: Option<ContinuationToken>,
    ) -> StoreResult<QueryPage>;

    /// Get a single item by key
    async fn get_item(
        &self,
        table: &str,
        key: &ItemKey,
    ) -> StoreResult<Option<Item>>;

    /// Apply up to `max_batch_items` puts/deletes in one call. Requests
    /// the store could not apply are handed back in the outcome.
    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> StoreResult<BatchWriteOutcome>;

    /// Field-level update of a single item
    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: ItemUpdate,
    ) -> StoreResult<()>;

    /// Per-call ceiling of `batch_write`
    fn max_batch_items(&self) -> usize {
        MAX_BATCH_ITEMS
    }
}
