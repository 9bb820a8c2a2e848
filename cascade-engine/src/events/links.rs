use std::sync::Arc;

use cascade_models::{
    ASSIGNED_CAMPAIGN_ID, ASSIGNED_CAMPAIGN_NAME, Campaign, LandingPageLink,
    ProductGroup, ProductGroupLink, Record, UPDATED_AT, keys,
};
use cascade_store::{
    Item, ItemKey, ItemUpdate, SORT_KEY, StoreError, WideColumnStore,
};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::aggregates::Counters;
use crate::error::CascadeResult;

/// Keeps product groups and landing pages in step with the link records
/// the campaign handlers create and delete.
pub struct LinkHandler<S> {
    store: Arc<S>,
    table: String,
    counters: Counters<S>,
}

impl<S: WideColumnStore> LinkHandler<S> {
    pub fn new(
        store: Arc<S>,
        table: impl Into<String>,
        counters: Counters<S>,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            counters,
        }
    }

    fn decode<T: Record>(image: &Item) -> Option<T> {
        match T::from_item(image) {
            Ok(link) => Some(link),
            Err(e) => {
                let sort_key = image.get(SORT_KEY).and_then(|v| v.as_str());
                warn!(
                    datatype = T::DATATYPE,
                    sort_key = sort_key.unwrap_or_default(),
                    error = %e,
                    "ignoring malformed link record"
                );
                None
            }
        }
    }

    /// Copy the owning campaign's name onto the product group. Returns
    /// whether the group was updated.
    pub async fn on_product_group_link_created(
        &self,
        image: &Item,
    ) -> CascadeResult<bool> {
        let Some(link) = Self::decode::<ProductGroupLink>(image) else {
            return Ok(false);
        };
        let campaign_key = ItemKey::new(
            keys::brand_partition(&link.brand_id),
            keys::campaign_sort_key(&link.campaign_id),
        );
        let item = self.store.get_item(&self.table, &campaign_key).await?;
        let Some(item) = item else {
            warn!(
                brand_id = %link.brand_id,
                campaign_id = %link.campaign_id,
                "campaign of product group link no longer exists"
            );
            return Ok(false);
        };
        let campaign = Campaign::from_item(&item)?;

        let update = ItemUpdate::new()
            .set(ASSIGNED_CAMPAIGN_NAME, campaign.campaign_name.as_str())
            .set(ASSIGNED_CAMPAIGN_ID, link.campaign_id.as_str())
            .set(UPDATED_AT, Utc::now().to_rfc3339())
            .if_exists();
        let group_key =
            ProductGroup::key_of(&link.brand_id, &link.product_group_id);
        match self.store.update_item(&self.table, &group_key, update).await {
            Ok(()) => {
                info!(
                    brand_id = %link.brand_id,
                    campaign_id = %link.campaign_id,
                    product_group_id = %link.product_group_id,
                    "product group assigned to campaign"
                );
                Ok(true)
            }
            Err(StoreError::ConditionFailed) => {
                warn!(
                    brand_id = %link.brand_id,
                    product_group_id = %link.product_group_id,
                    "linked product group no longer exists"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Clear the campaign fields of the product group, unless it has
    /// meanwhile been assigned to another campaign.
    pub async fn on_product_group_link_deleted(
        &self,
        image: &Item,
    ) -> CascadeResult<bool> {
        let Some(link) = Self::decode::<ProductGroupLink>(image) else {
            return Ok(false);
        };
        let update = ItemUpdate::new()
            .remove(ASSIGNED_CAMPAIGN_NAME)
            .remove(ASSIGNED_CAMPAIGN_ID)
            .set(UPDATED_AT, Utc::now().to_rfc3339())
            .expect(ASSIGNED_CAMPAIGN_ID, link.campaign_id.as_str());
        let group_key =
            ProductGroup::key_of(&link.brand_id, &link.product_group_id);
        match self.store.update_item(&self.table, &group_key, update).await {
            Ok(()) => {
                info!(
                    brand_id = %link.brand_id,
                    campaign_id = %link.campaign_id,
                    product_group_id = %link.product_group_id,
                    "product group unassigned from campaign"
                );
                Ok(true)
            }
            Err(StoreError::ConditionFailed) => {
                debug!(
                    brand_id = %link.brand_id,
                    product_group_id = %link.product_group_id,
                    "product group gone or reassigned, nothing to clear"
                );
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn on_landing_page_link_created(
        &self,
        image: &Item,
    ) -> CascadeResult<bool> {
        self.adjust_landing_page(image, 1).await
    }

    pub async fn on_landing_page_link_deleted(
        &self,
        image: &Item,
    ) -> CascadeResult<bool> {
        self.adjust_landing_page(image, -1).await
    }

    async fn adjust_landing_page(
        &self,
        image: &Item,
        delta: i64,
    ) -> CascadeResult<bool> {
        let Some(link) = Self::decode::<LandingPageLink>(image) else {
            return Ok(false);
        };
        self.counters
            .adjust_landing_page_campaigns(
                &link.brand_id,
                &link.landing_page_id,
                delta,
            )
            .await
    }
}
