use std::sync::Arc;

use cascade_store::{ItemKey, WideColumnStore, WriteRequest};
use futures_util::{StreamExt, stream};
use tracing::{debug, warn};

use crate::error::{CascadeError, CascadeResult};

/// Splits writes into store-sized batches and issues them concurrently.
///
/// Every batch is attempted even when a sibling fails; once all have
/// settled the first store error is returned, otherwise any writes the
/// store left unprocessed are reported as [`CascadeError::PartialBatch`].
pub struct BatchDispatcher<S> {
    store: Arc<S>,
    table: String,
    batch_size: usize,
    max_in_flight: usize,
}

impl<S> Clone for BatchDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
            batch_size: self.batch_size,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<S: WideColumnStore> BatchDispatcher<S> {
    pub fn new(
        store: Arc<S>,
        table: impl Into<String>,
        batch_size: usize,
        max_in_flight: usize,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            batch_size: batch_size.max(1),
            max_in_flight: max_in_flight.max(1),
        }
    }

    fn chunk_size(&self) -> usize {
        self.batch_size.min(self.store.max_batch_items()).max(1)
    }

    /// Apply `requests`, returning how many batches were issued
    pub async fn dispatch(
        &self,
        requests: Vec<WriteRequest>,
    ) -> CascadeResult<usize> {
        if requests.is_empty() {
            return Ok(0);
        }
        let total = requests.len();
        let chunks = chunk(requests, self.chunk_size());
        let batches = chunks.len();

        let results: Vec<_> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, batch)| async move {
                let size = batch.len();
                let result = self.store.batch_write(&self.table, batch).await;
                (index, size, result)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut errors = Vec::new();
        let mut unprocessed: Vec<ItemKey> = Vec::new();
        for (index, size, result) in results {
            match result {
                Ok(outcome) => {
                    if !outcome.is_complete() {
                        warn!(
                            batch = index,
                            size,
                            unprocessed = outcome.unprocessed.len(),
                            "batch partially applied"
                        );
                        let keys =
                            outcome.unprocessed.iter().map(|r| r.key().clone());
                        unprocessed.extend(keys);
                    }
                }
                Err(e) => {
                    warn!(
                        batch = index,
                        size,
                        error = %e,
                        "batch write failed"
                    );
                    errors.push((index, e));
                }
            }
        }

        // lowest batch index first, for a stable report
        let first = errors.into_iter().min_by_key(|(index, _)| *index);
        if let Some((_, e)) = first {
            return Err(e.into());
        }
        if !unprocessed.is_empty() {
            unprocessed.sort();
            return Err(CascadeError::PartialBatch { unprocessed });
        }
        debug!(
            table = %self.table,
            writes = total,
            batches,
            "dispatched writes"
        );
        Ok(batches)
    }
}

fn chunk(requests: Vec<WriteRequest>, size: usize) -> Vec<Vec<WriteRequest>> {
    let mut chunks = Vec::with_capacity(requests.len().div_ceil(size));
    let mut iter = requests.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}
