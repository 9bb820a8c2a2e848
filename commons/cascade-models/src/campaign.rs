use cascade_store::ItemKey;
use serde::{Deserialize, Serialize};

use crate::keys;
use crate::record::{Record, brand_of, datatype};
use crate::{ModelError, ModelResult};

/// A time-bounded landing page assignment embedded in a campaign.
/// `landing_page_name` is display-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CampaignLandingPage {
    pub landing_page_id: String,
    #[serde(default)]
    pub landing_page_name: String,
    pub start_date: String,
    pub end_date: String,
}

impl CampaignLandingPage {
    pub fn new(
        landing_page_id: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            landing_page_id: landing_page_id.into(),
            landing_page_name: String::new(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.landing_page_name = name.into();
        self
    }
}

/// Product group reference embedded in a campaign. Only the id carries
/// identity; name and count are display copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CampaignProductGroup {
    pub product_group_id: String,
    #[serde(default)]
    pub product_group_name: String,
    #[serde(default)]
    pub product_group_count: u64,
}

impl CampaignProductGroup {
    pub fn new(product_group_id: impl Into<String>) -> Self {
        Self {
            product_group_id: product_group_id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.product_group_name = name.into();
        self
    }

    pub fn with_count(mut self, count: u64) -> Self {
        self.product_group_count = count;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Campaign {
    #[serde(skip)]
    pub brand_id: String,
    #[serde(skip)]
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub campaign_landing_pages: Vec<CampaignLandingPage>,
    #[serde(default)]
    pub campaign_product_groups: Vec<CampaignProductGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Campaign {
    pub fn new(
        brand_id: impl Into<String>,
        campaign_id: impl Into<String>,
        campaign_name: impl Into<String>,
    ) -> Self {
        Self {
            brand_id: brand_id.into(),
            campaign_id: campaign_id.into(),
            campaign_name: campaign_name.into(),
            ..Default::default()
        }
    }

    /// Same identity, no embedded lists. The "before" image of a campaign
    /// that has just been created.
    pub fn empty_like(&self) -> Self {
        Self {
            brand_id: self.brand_id.clone(),
            campaign_id: self.campaign_id.clone(),
            ..Default::default()
        }
    }

    pub fn with_landing_page(mut self, landing_page: CampaignLandingPage) -> Self {
        self.campaign_landing_pages.push(landing_page);
        self
    }

    pub fn with_product_group(mut self, group: CampaignProductGroup) -> Self {
        self.campaign_product_groups.push(group);
        self
    }

    pub fn partition_key(&self) -> String {
        keys::brand_partition(&self.brand_id)
    }

    pub fn product_group_ids(&self) -> impl Iterator<Item = &str> {
        self.campaign_product_groups
            .iter()
            .map(|g| g.product_group_id.as_str())
    }
}

impl Record for Campaign {
    const DATATYPE: &'static str = datatype::CAMPAIGN;

    fn key(&self) -> ItemKey {
        ItemKey::new(
            keys::brand_partition(&self.brand_id),
            keys::campaign_sort_key(&self.campaign_id),
        )
    }

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()> {
        self.brand_id = brand_of(key, Self::DATATYPE)?;
        self.campaign_id = keys::parse_campaign_sort_key(&key.sort_key)
            .ok_or_else(|| ModelError::invalid_key(Self::DATATYPE, &key.sort_key))?
            .to_string();
        Ok(())
    }
}
