use std::sync::Arc;

use cascade_models::{Brand, CAMPAIGNS_COUNT, LandingPage, UPDATED_AT};
use cascade_store::{ItemKey, ItemUpdate, StoreError, WideColumnStore};
use chrono::Utc;
use tracing::{debug, warn};

use crate::error::CascadeResult;

/// Campaign counters kept on brands and landing pages.
///
/// Deltas are not idempotent: a redelivered create or delete adjusts the
/// counter again.
pub struct Counters<S> {
    store: Arc<S>,
    table: String,
}

impl<S> Clone for Counters<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
        }
    }
}

impl<S: WideColumnStore> Counters<S> {
    pub fn new(store: Arc<S>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    /// Returns `false` when the brand does not exist.
    pub async fn adjust_brand_campaigns(
        &self,
        brand_id: &str,
        delta: i64,
    ) -> CascadeResult<bool> {
        self.adjust(Brand::key_of(brand_id), delta).await
    }

    /// Returns `false` when the landing page does not exist.
    pub async fn adjust_landing_page_campaigns(
        &self,
        brand_id: &str,
        landing_page_id: &str,
        delta: i64,
    ) -> CascadeResult<bool> {
        self.adjust(LandingPage::key_of(brand_id, landing_page_id), delta)
            .await
    }

    async fn adjust(&self, key: ItemKey, delta: i64) -> CascadeResult<bool> {
        let update = ItemUpdate::new()
            .add(CAMPAIGNS_COUNT, delta)
            .set(UPDATED_AT, Utc::now().to_rfc3339())
            .if_exists();
        match self.store.update_item(&self.table, &key, update).await {
            Ok(()) => {
                debug!(%key, delta, "adjusted campaigns_count");
                Ok(true)
            }
            Err(StoreError::ConditionFailed) => {
                warn!(%key, delta, "counter target does not exist, skipping");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
