//! Entities the cascade reads or adjusts but does not own.

use cascade_store::ItemKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::keys;
use crate::record::{Record, brand_of, datatype};
use crate::{ModelError, ModelResult};

pub const CAMPAIGNS_COUNT: &str = "campaigns_count";
pub const ASSIGNED_CAMPAIGN_NAME: &str = "assigned_campaign_name";
pub const ASSIGNED_CAMPAIGN_ID: &str = "assigned_campaign_id";
pub const UPDATED_AT: &str = "updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Brand {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(default)]
    pub brand_name: String,
    #[serde(default)]
    pub campaigns_count: i64,
}

impl Brand {
    pub fn new(brand_id: impl Into<String>, brand_name: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            brand_name: brand_name.into(),
            campaigns_count: 0,
        }
    }

    pub fn key_of(brand_id: &str) -> ItemKey {
        ItemKey::new(keys::brand_partition(brand_id), keys::brand_sort_key(brand_id))
    }
}

impl Record for Brand {
    const DATATYPE: &'static str = datatype::BRAND;

    fn key(&self) -> ItemKey {
        Self::key_of(&self.brand_id)
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProductGroup {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(skip)]
    pub product_group_id: String,
    #[serde(default)]
    pub product_group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_campaign_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ProductGroup {
    pub fn new(
        brand_id: impl Into<String>,
        product_group_id: impl Into<String>,
        product_group_name: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            product_group_id: product_group_id.into(),
            product_group_name: product_group_name.into(),
            ..Default::default()
        }
    }

    pub fn key_of(brand_id: &str, product_group_id: &str) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(brand_id),
            keys::product_group_sort_key(product_group_id),
        )
    }
}

impl Record for ProductGroup {
    const DATATYPE: &'static str = datatype::PRODUCT_GROUP;

    fn key(&self) -> ItemKey {
        Self::key_of(&self.brand_id, &self.product_group_id)
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        self.product_group_id = keys::parse_product_group_sort_key(&key.sort_key)
            .ok_or_else(|| ModelError::invalid_key(Self::DATATYPE, &key.sort_key))?
            .to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LandingPage {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(skip)]
    pub landing_page_id: String,
    #[serde(default)]
    pub landing_page_name: String,
    #[serde(default)]
    pub campaigns_count: i64,
}

impl LandingPage {
    pub fn new(
        brand_id: impl Into<String>,
        landing_page_id: impl Into<String>,
        landing_page_name: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            landing_page_id: landing_page_id.into(),
            landing_page_name: landing_page_name.into(),
            campaigns_count: 0,
        }
    }

    pub fn key_of(brand_id: &str, landing_page_id: &str) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(brand_id),
            keys::landing_page_sort_key(landing_page_id),
        )
    }
}

impl Record for LandingPage {
    const DATATYPE: &'static str = datatype::LANDING_PAGE;

    fn key(&self) -> ItemKey {
        Self::key_of(&self.brand_id, &self.landing_page_id)
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        self.landing_page_id = keys::parse_landing_page_sort_key(&key.sort_key)
            .ok_or_else(|| ModelError::invalid_key(Self::DATATYPE, &key.sort_key))?
            .to_string();
        Ok(())
    }
}

/// A form submission recorded against a campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CampaignEvent {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(skip)]
    pub campaign_id: String,
    #[serde(skip)]
    pub event_id: String,
    #[serde(default)]
    pub payload: Value,
}

impl CampaignEvent {
    pub fn new(
        brand_id: impl Into<String>,
        campaign_id: impl Into<String>,
        event_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            campaign_id: campaign_id.into(),
            event_id: event_id.into(),
            payload,
        }
    }
}

impl Record for CampaignEvent {
    const DATATYPE: &'static str = datatype::CAMPAIGN_EVENT;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            format!(
                "{}{}",
                keys::campaign_events_prefix(&self.campaign_id),
                self.event_id
            ),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        let (campaign, event) =
            keys::parse_campaign_event_sort_key(&key.sort_key).ok_or_else(
                || ModelError::invalid_key(Self::DATATYPE, &key.sort_key),
            )?;
        self.campaign_id = campaign.to_string();
        self.event_id = event.to_string();
        Ok(())
    }
}
