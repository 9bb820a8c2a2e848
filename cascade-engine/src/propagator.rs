use std::sync::Arc;

use cascade_models::{
    ASSIGNED_CAMPAIGN_ID, ASSIGNED_CAMPAIGN_NAME, ProductGroup, UPDATED_AT,
};
use cascade_store::{ItemUpdate, StoreError, WideColumnStore};
use chrono::Utc;
use futures_util::{StreamExt, stream};
use tracing::{debug, warn};

use crate::error::CascadeResult;

/// Pushes a campaign's name onto the product groups it references.
pub struct Propagator<S> {
    store: Arc<S>,
    table: String,
    max_in_flight: usize,
}

impl<S> Clone for Propagator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<S: WideColumnStore> Propagator<S> {
    pub fn new(
        store: Arc<S>,
        table: impl Into<String>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Set `assigned_campaign_name` and `assigned_campaign_id` on every
    /// listed group that still exists. Returns the number of groups updated.
    pub async fn propagate_campaign_name<'g>(
        &self,
        brand_id: &str,
        campaign_id: &str,
        campaign_name: &str,
        product_group_ids: impl IntoIterator<Item = &'g str>,
    ) -> CascadeResult<usize> {
        let updated_at = Utc::now().to_rfc3339();
        let results: Vec<_> = stream::iter(product_group_ids)
            .map(|group_id| {
                let update = ItemUpdate::new()
                    .set(ASSIGNED_CAMPAIGN_NAME, campaign_name)
                    .set(ASSIGNED_CAMPAIGN_ID, campaign_id)
                    .set(UPDATED_AT, updated_at.as_str())
                    .if_exists();
                async move {
                    let key = ProductGroup::key_of(brand_id, group_id);
                    let result =
                        self.store.update_item(&self.table, &key, update).await;
                    (group_id, result)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut updated = 0;
        let mut first_error = None;
        for (group_id, result) in results {
            match result {
                Ok(()) => updated += 1,
                Err(StoreError::ConditionFailed) => {
                    warn!(
                        brand_id,
                        campaign_id,
                        group_id,
                        "product group does not exist, skipping"
                    );
                }
                Err(e) => {
                    warn!(
                        brand_id,
                        campaign_id,
                        group_id,
                        error = %e,
                        "failed to propagate campaign name"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e.into());
        }
        debug!(brand_id, campaign_id, updated, "propagated campaign name");
        Ok(updated)
    }
}
