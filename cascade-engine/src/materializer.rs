//! Display page identity and mutation planning.
//!
//! Everything here is pure: handlers resolve group members first, then
//! plan the writes of one phase into a [`MutationSet`] that the dispatcher
//! executes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use cascade_models::{CampaignLandingPage, DisplayPage, Record, keys};
use cascade_store::{Item, ItemKey, PutCondition, WriteRequest};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::error::{CascadeError, CascadeResult};

/// Parse a `YYYY-MM-DD` date or an RFC 3339 timestamp down to its UTC day.
pub fn parse_day(value: &str) -> CascadeResult<NaiveDate> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| CascadeError::InvalidDate(value.to_string()))
}

/// Stable digest of a window: both days as `YYYYMMDD`, concatenated.
/// Windows differing only in time of day share an id.
pub fn window_id(start_date: &str, end_date: &str) -> CascadeResult<String> {
    let start = parse_day(start_date)?;
    let end = parse_day(end_date)?;
    Ok(format!("{}{}", start.format("%Y%m%d"), end.format("%Y%m%d")))
}

/// A landing page window with its resolved id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub window_id: String,
    pub landing_page_id: String,
    pub start_date: String,
    pub end_date: String,
}

impl Window {
    pub fn of(entry: &CampaignLandingPage) -> CascadeResult<Self> {
        Ok(Self {
            window_id: window_id(&entry.start_date, &entry.end_date)?,
            landing_page_id: entry.landing_page_id.clone(),
            start_date: entry.start_date.clone(),
            end_date: entry.end_date.clone(),
        })
    }
}

/// Resolve window ids, skipping entries whose dates do not parse.
pub fn resolve_windows<'a>(
    campaign_id: &str,
    entries: impl IntoIterator<Item = &'a CampaignLandingPage>,
) -> Vec<Window> {
    entries
        .into_iter()
        .filter_map(|entry| match Window::of(entry) {
            Ok(window) => Some(window),
            Err(e) => {
                warn!(
                    campaign_id,
                    landing_page_id = %entry.landing_page_id,
                    error = %e,
                    "skipping landing page window"
                );
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Member {
    pub product_group_id: String,
    pub product_id: String,
}

/// Products of each resolved product group
#[derive(Debug, Clone, Default)]
pub struct MemberIndex {
    by_group: HashMap<String, Vec<String>>,
}

impl MemberIndex {
    pub fn insert(
        &mut self,
        product_group_id: impl Into<String>,
        products: Vec<String>,
    ) {
        self.by_group.insert(product_group_id.into(), products);
    }

    pub fn contains_group(&self, product_group_id: &str) -> bool {
        self.by_group.contains_key(product_group_id)
    }

    /// Members of the given groups in group order. Unresolved groups
    /// contribute nothing.
    pub fn members<'g>(
        &self,
        product_group_ids: impl IntoIterator<Item = &'g str>,
    ) -> Vec<Member> {
        product_group_ids
            .into_iter()
            .flat_map(|group| {
                let products = self.by_group.get(group).into_iter().flatten();
                products.map(move |product| Member {
                    product_group_id: group.to_string(),
                    product_id: product.clone(),
                })
            })
            .collect()
    }

    /// First of `product_group_ids` that has `product_id` as a member
    pub fn owning_group<'g>(
        &self,
        product_group_ids: impl IntoIterator<Item = &'g str>,
        product_id: &str,
    ) -> Option<&'g str> {
        product_group_ids.into_iter().find(|group| {
            self.by_group
                .get(*group)
                .is_some_and(|members| members.iter().any(|p| p == product_id))
        })
    }

    /// Distinct products reachable through the given groups
    pub fn products<'g>(
        &self,
        product_group_ids: impl IntoIterator<Item = &'g str>,
    ) -> BTreeSet<&str> {
        product_group_ids
            .into_iter()
            .filter_map(|group| self.by_group.get(group))
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Writes of one phase, keyed by item key.
///
/// A put supersedes a delete of the same key and turns into an overwrite
/// so the record is re-owned. Repeated creates or deletes collapse to the
/// first; an overwrite replaces whatever was planned before it.
#[derive(Debug, Clone, Default)]
pub struct MutationSet {
    writes: BTreeMap<ItemKey, WriteRequest>,
}

impl MutationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record unless one already exists
    pub fn create(&mut self, key: ItemKey, item: Item) {
        match self.writes.get(&key) {
            Some(WriteRequest::Put { .. }) => {}
            Some(WriteRequest::Delete { .. }) => {
                self.writes.insert(key.clone(), WriteRequest::put(key, item));
            }
            None => {
                let request = WriteRequest::put_if_absent(key.clone(), item);
                self.writes.insert(key, request);
            }
        }
    }

    /// Write `item` unconditionally, replacing any earlier write of the key
    pub fn overwrite(&mut self, key: ItemKey, item: Item) {
        self.writes.insert(key.clone(), WriteRequest::put(key, item));
    }

    pub fn delete(&mut self, key: ItemKey) {
        self.writes
            .entry(key.clone())
            .or_insert_with(|| WriteRequest::delete(key));
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn get(&self, key: &ItemKey) -> Option<&WriteRequest> {
        self.writes.get(key)
    }

    pub fn puts(&self) -> usize {
        self.writes.values().filter(|w| w.is_put()).count()
    }

    pub fn deletes(&self) -> usize {
        self.len() - self.puts()
    }

    /// Requests in key order
    pub fn into_requests(self) -> Vec<WriteRequest> {
        self.writes.into_values().collect()
    }
}

pub fn display_page(
    brand_id: &str,
    campaign_id: &str,
    member: &Member,
    window: &Window,
) -> DisplayPage {
    DisplayPage {
        brand_id: brand_id.to_string(),
        window_id: window.window_id.clone(),
        product_id: member.product_id.clone(),
        campaign_id: campaign_id.to_string(),
        landing_page_id: window.landing_page_id.clone(),
        product_group_id: member.product_group_id.clone(),
        start_date: window.start_date.clone(),
        end_date: window.end_date.clone(),
    }
}

pub fn display_page_key(
    brand_id: &str,
    product_id: &str,
    window_id: &str,
) -> ItemKey {
    ItemKey::new(
        keys::brand_partition(brand_id),
        keys::display_page_sort_key(product_id, window_id),
    )
}

/// Create-if-absent puts for every (member, window) pair
pub fn plan_page_creates(
    set: &mut MutationSet,
    brand_id: &str,
    campaign_id: &str,
    members: &[Member],
    windows: &[Window],
) -> CascadeResult<()> {
    for member in members {
        for window in windows {
            let page = display_page(brand_id, campaign_id, member, window);
            set.create(page.key(), page.to_item()?);
        }
    }
    Ok(())
}

/// Deletes for every (product, window) pair
pub fn plan_page_deletes<'p>(
    set: &mut MutationSet,
    brand_id: &str,
    products: impl IntoIterator<Item = &'p str>,
    windows: &[Window],
) {
    for product in products {
        for window in windows {
            set.delete(display_page_key(brand_id, product, &window.window_id));
        }
    }
}
