use cascade_store::{Item, ItemKey};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ModelError, ModelResult};

/// Attribute naming the entity family of an item
pub const DATATYPE_ATTR: &str = "datatype";

pub mod datatype {
    pub const BRAND: &str = "brand";
    pub const CAMPAIGN: &str = "campaign";
    pub const PRODUCT_GROUP: &str = "product-group";
    pub const LANDING_PAGE: &str = "landing-page";
    pub const PRODUCT_GROUP_MEMBERSHIP: &str = "product-group-product";
    pub const PRODUCT_GROUP_LINK: &str = "campaign-product-group";
    pub const LANDING_PAGE_LINK: &str = "campaign-landing-page";
    pub const DISPLAY_PAGE: &str = "display-page";
    pub const CAMPAIGN_EVENT: &str = "campaign-event";
}

pub fn datatype_of(item: &Item) -> Option<&str> {
    item.get(DATATYPE_ATTR).and_then(Value::as_str)
}

/// A typed view over a stored item.
///
/// Key-derived fields are not serialized as attributes; `apply_key` fills
/// them back in when an item is decoded.
pub trait Record: Serialize + DeserializeOwned {
    const DATATYPE: &'static str;

    fn key(&self) -> ItemKey;

    fn apply_key(&mut self, key: &ItemKey) -> ModelResult<()>;

    fn to_item(&self) -> ModelResult<Item> {
        let Value::Object(mut item) = serde_json::to_value(self)? else {
            return Err(ModelError::Serialization(format!(
                "{} did not serialize to an object",
                Self::DATATYPE
            )));
        };
        self.key().stamp(&mut item);
        item.insert(DATATYPE_ATTR.into(), Value::from(Self::DATATYPE));
        Ok(item)
    }

    fn from_item(item: &Item) -> ModelResult<Self> {
        if let Some(found) = datatype_of(item) {
            if found != Self::DATATYPE {
                return Err(ModelError::UnexpectedDatatype {
                    expected: Self::DATATYPE,
                    found: found.to_string(),
                });
            }
        }
        let key = ItemKey::of(item)?;
        let mut record: Self = serde_json::from_value(Value::Object(item.clone()))?;
        record.apply_key(&key)?;
        Ok(record)
    }
}

pub(crate) fn brand_of(key: &ItemKey, family: &'static str) -> ModelResult<String> {
    crate::keys::parse_brand_partition(&key.partition_key)
        .map(str::to_string)
        .ok_or_else(|| ModelError::invalid_key(family, key.to_string()))
}
