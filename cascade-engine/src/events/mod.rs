//! Change-feed records and the handlers reacting to them.

pub mod campaign;
pub mod links;
pub mod router;

use std::fmt;

use cascade_models::{datatype, datatype_of};
use cascade_store::Item;
use serde::{Deserialize, Serialize};

pub use campaign::CampaignHandler;
pub use links::LinkHandler;
pub use router::ChangeRouter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    #[serde(alias = "INSERT")]
    Create,
    #[serde(alias = "MODIFY")]
    Modify,
    #[serde(alias = "REMOVE")]
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Entity family of a changed item, read from its `datatype` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Campaign,
    ProductGroupLink,
    LandingPageLink,
    Other(String),
}

impl EntityKind {
    pub fn from_datatype(value: &str) -> Self {
        match value {
            datatype::CAMPAIGN => Self::Campaign,
            datatype::PRODUCT_GROUP_LINK => Self::ProductGroupLink,
            datatype::LANDING_PAGE_LINK => Self::LandingPageLink,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One entry of the change feed with its before/after snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub sequence_number: String,
    pub change_kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_image: Option<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_image: Option<Item>,
}

impl ChangeRecord {
    pub fn create(sequence_number: impl Into<String>, new_image: Item) -> Self {
        Self {
            sequence_number: sequence_number.into(),
            change_kind: ChangeKind::Create,
            old_image: None,
            new_image: Some(new_image),
        }
    }

    pub fn modify(
        sequence_number: impl Into<String>,
        old_image: Item,
        new_image: Item,
    ) -> Self {
        Self {
            sequence_number: sequence_number.into(),
            change_kind: ChangeKind::Modify,
            old_image: Some(old_image),
            new_image: Some(new_image),
        }
    }

    pub fn delete(sequence_number: impl Into<String>, old_image: Item) -> Self {
        Self {
            sequence_number: sequence_number.into(),
            change_kind: ChangeKind::Delete,
            old_image: Some(old_image),
            new_image: None,
        }
    }

    /// `None` when neither image carries a `datatype`.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.new_image
            .as_ref()
            .and_then(datatype_of)
            .or_else(|| self.old_image.as_ref().and_then(datatype_of))
            .map(EntityKind::from_datatype)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    pub sequence_number: String,
    pub message: String,
}

/// Outcome of one change-feed batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_sequence_numbers(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.sequence_number.as_str())
    }
}
