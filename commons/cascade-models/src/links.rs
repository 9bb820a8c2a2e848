//! Association and materialized records owned by the cascade.

use cascade_store::ItemKey;
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::record::{Record, brand_of, datatype};
use crate::{ModelError, ModelResult};

/// One product's membership in a product group. Read-only for the cascade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProductGroupMembership {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(default)]
    pub product_group_id: String,
    #[serde(default)]
    pub product_id: String,
}

impl ProductGroupMembership {
    pub fn new(
        brand_id: impl Into<String>,
        product_group_id: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            product_group_id: product_group_id.into(),
            product_id: product_id.into(),
        }
    }
}

impl Record for ProductGroupMembership {
    const DATATYPE: &'static str = datatype::PRODUCT_GROUP_MEMBERSHIP;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            keys::membership_sort_key(&self.product_group_id, &self.product_id),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        let (group, product) = keys::parse_membership_sort_key(&key.sort_key)
            .ok_or_else(|| ModelError::invalid_key(Self::DATATYPE, &key.sort_key))?;
        self.product_group_id = group.to_string();
        self.product_id = product.to_string();
        Ok(())
    }
}

/// Thin record tying a campaign to one of its product groups
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProductGroupLink {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default)]
    pub product_group_id: String,
}

impl ProductGroupLink {
    pub fn new(
        brand_id: impl Into<String>,
        campaign_id: impl Into<String>,
        product_group_id: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            campaign_id: campaign_id.into(),
            product_group_id: product_group_id.into(),
        }
    }
}

impl Record for ProductGroupLink {
    const DATATYPE: &'static str = datatype::PRODUCT_GROUP_LINK;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            keys::product_group_link_sort_key(
                &self.product_group_id,
                &self.campaign_id,
            ),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        let (group, campaign) =
            keys::parse_product_group_link_sort_key(&key.sort_key).ok_or_else(
                || ModelError::invalid_key(Self::DATATYPE, &key.sort_key),
            )?;
        self.product_group_id = group.to_string();
        self.campaign_id = campaign.to_string();
        Ok(())
    }
}

/// Thin record tying a campaign to one of its landing pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LandingPageLink {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default)]
    pub landing_page_id: String,
}

impl LandingPageLink {
    pub fn new(
        brand_id: impl Into<String>,
        campaign_id: impl Into<String>,
        landing_page_id: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            campaign_id: campaign_id.into(),
            landing_page_id: landing_page_id.into(),
        }
    }
}

impl Record for LandingPageLink {
    const DATATYPE: &'static str = datatype::LANDING_PAGE_LINK;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            keys::landing_page_link_sort_key(
                &self.landing_page_id,
                &self.campaign_id,
            ),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        let (page, campaign) =
            keys::parse_landing_page_link_sort_key(&key.sort_key).ok_or_else(
                || ModelError::invalid_key(Self::DATATYPE, &key.sort_key),
            )?;
        self.landing_page_id = page.to_string();
        self.campaign_id = campaign.to_string();
        Ok(())
    }
}

/// Materialized (product, window) page. Identity is the product and the
/// window digest; the landing page is an attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DisplayPage {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(skip)]
    pub window_id: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub campaign_id: String,
    #[serde(default)]
    pub landing_page_id: String,
    #[serde(default)]
    pub product_group_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

impl Record for DisplayPage {
    const DATATYPE: &'static str = datatype::DISPLAY_PAGE;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            keys::display_page_sort_key(&self.product_id, &self.window_id),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        let (product, window) = keys::parse_display_page_sort_key(&key.sort_key)
            .ok_or_else(|| ModelError::invalid_key(Self::DATATYPE, &key.sort_key))?;
        self.product_id = product.to_string();
        self.window_id = window.to_string();
        Ok(())
    }
}
