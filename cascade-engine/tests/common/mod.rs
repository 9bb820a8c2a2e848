#![allow(dead_code)] // each test binary uses a different subset

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cascade_engine::{CascadeConfig, ChangeRecord, ChangeRouter};
use cascade_models::{
    Brand, Campaign, CampaignLandingPage, CampaignProductGroup, DisplayPage,
    LandingPage, ProductGroup, ProductGroupMembership, Record, datatype_of,
    keys,
};
use cascade_store::{
    BatchWriteOutcome, ContinuationToken, Item, ItemKey, ItemUpdate,
    MemoryStore, QueryPage, StoreError, StoreResult, WideColumnStore,
    WriteRequest,
};
use tokio::sync::Barrier;

pub const TABLE: &str = "cascade";
pub const BRAND: &str = "b1";

pub const JAN: (&str, &str, &str) = ("lp1", "2024-01-01", "2024-01-31");
pub const FEB: (&str, &str, &str) = ("lp2", "2024-02-01", "2024-02-29");
pub const JAN_ID: &str = "2024010120240131";
pub const FEB_ID: &str = "2024020120240229";

pub fn config() -> CascadeConfig {
    CascadeConfig::default()
        .with_table_name(TABLE)
        .with_query_page_size(2)
}

/// Wide-column store wrapper that records calls and injects faults.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    batch_sizes: Mutex<Vec<usize>>,
    queries: AtomicUsize,
    updates: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
    fail_on: Mutex<Option<String>>,
    leave_unprocessed: Mutex<Option<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `batch_write` waits until `parties` calls are in flight.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Reject any batch touching a sort key that starts with `prefix`.
    pub fn fail_batches_touching(&self, prefix: impl Into<String>) {
        *self.fail_on.lock().unwrap() = Some(prefix.into());
    }

    /// Hand back writes to sort keys starting with `prefix` as unprocessed.
    pub fn leave_unprocessed(&self, prefix: impl Into<String>) {
        *self.leave_unprocessed.lock().unwrap() = Some(prefix.into());
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn total_writes(&self) -> usize {
        self.batch_sizes().iter().sum()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.batch_sizes.lock().unwrap().clear();
        self.queries.store(0, Ordering::SeqCst);
        self.updates.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl WideColumnStore for RecordingStore {
    async fn query(
        &self,
        table: &str,
        partition_key: &str,
        sort_key_prefix: &str,
        limit: usize,
        start: Option<ContinuationToken>,
    ) -> StoreResult<QueryPage> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner
            .query(table, partition_key, sort_key_prefix, limit, start)
            .await
    }

    async fn get_item(
        &self,
        table: &str,
        key: &ItemKey,
    ) -> StoreResult<Option<Item>> {
        self.inner.get_item(table, key).await
    }

    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> StoreResult<BatchWriteOutcome> {
        self.batch_sizes.lock().unwrap().push(requests.len());
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        let fail_on = self.fail_on.lock().unwrap().clone();
        if let Some(prefix) = fail_on {
            if requests.iter().any(|r| r.key().sort_key.starts_with(&prefix)) {
                return Err(StoreError::throttled("injected failure"));
            }
        }
        let hold_back = self.leave_unprocessed.lock().unwrap().clone();
        let (applied, unprocessed): (Vec<_>, Vec<_>) = match hold_back {
            Some(prefix) => requests
                .into_iter()
                .partition(|r| !r.key().sort_key.starts_with(&prefix)),
            None => (requests, Vec::new()),
        };
        self.inner.batch_write(table, applied).await?;
        Ok(BatchWriteOutcome { unprocessed })
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: ItemUpdate,
    ) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_item(table, key, update).await
    }
}

pub fn router(
    store: Arc<RecordingStore>,
    config: CascadeConfig,
) -> ChangeRouter<RecordingStore> {
    ChangeRouter::new(store, config).unwrap()
}

pub fn campaign(groups: &[&str], windows: &[(&str, &str, &str)]) -> Campaign {
    named_campaign("Summer", groups, windows)
}

pub fn named_campaign(
    name: &str,
    groups: &[&str],
    windows: &[(&str, &str, &str)],
) -> Campaign {
    let mut campaign = Campaign::new(BRAND, "c1", name);
    for group in groups {
        let group = CampaignProductGroup::new(*group)
            .with_name(format!("Group {group}"));
        campaign = campaign.with_product_group(group);
    }
    for (landing_page, start, end) in windows {
        let window = CampaignLandingPage::new(*landing_page, *start, *end);
        campaign = campaign.with_landing_page(window);
    }
    campaign
}

pub fn image<R: Record>(record: &R) -> Item {
    record.to_item().unwrap()
}

/// Seed a brand, three landing pages, and the given groups with their
/// products.
pub async fn seed_catalog(store: &MemoryStore, groups: &[(&str, &[&str])]) {
    let mut items = vec![
        image(&Brand::new(BRAND, "Acme")),
        image(&LandingPage::new(BRAND, "lp1", "Home")),
        image(&LandingPage::new(BRAND, "lp2", "Sale")),
        image(&LandingPage::new(BRAND, "lp3", "Outlet")),
    ];
    for (group, products) in groups {
        let name = format!("Group {group}");
        items.push(image(&ProductGroup::new(BRAND, *group, name)));
        for product in *products {
            let membership =
                ProductGroupMembership::new(BRAND, *group, *product);
            items.push(image(&membership));
        }
    }
    store.seed(TABLE, items).await.unwrap();
}

/// Seed the campaign record itself, as the API layer would have stored it
pub async fn seed_campaign(store: &MemoryStore, campaign: &Campaign) {
    store.seed(TABLE, [image(campaign)]).await.unwrap();
}

pub async fn display_pages(store: &MemoryStore) -> Vec<DisplayPage> {
    store
        .items_with_prefix(
            TABLE,
            &keys::brand_partition(BRAND),
            keys::DISPLAY_PAGE_PREFIX,
        )
        .await
        .iter()
        .map(|item| DisplayPage::from_item(item).unwrap())
        .collect()
}

/// A display page as a handler would have written it at JAN's landing page
pub fn stored_page(
    product: &str,
    window_id: &str,
    campaign: &str,
    group: &str,
) -> DisplayPage {
    DisplayPage {
        brand_id: BRAND.into(),
        window_id: window_id.into(),
        product_id: product.into(),
        campaign_id: campaign.into(),
        landing_page_id: JAN.0.into(),
        product_group_id: group.into(),
        start_date: JAN.1.into(),
        end_date: JAN.2.into(),
    }
}

/// `(product, window id, campaign)` of every display page
pub async fn page_owners(
    store: &MemoryStore,
) -> Vec<(String, String, String)> {
    display_pages(store)
        .await
        .into_iter()
        .map(|p| (p.product_id, p.window_id, p.campaign_id))
        .collect()
}

/// `(product, window id)` of every display page
pub async fn page_ids(store: &MemoryStore) -> BTreeSet<(String, String)> {
    display_pages(store)
        .await
        .into_iter()
        .map(|p| (p.product_id, p.window_id))
        .collect()
}

pub fn pages(pairs: &[(&str, &str)]) -> BTreeSet<(String, String)> {
    pairs
        .iter()
        .map(|(p, w)| (p.to_string(), w.to_string()))
        .collect()
}

pub async fn sort_keys(store: &MemoryStore, prefix: &str) -> Vec<String> {
    store
        .items_with_prefix(TABLE, &keys::brand_partition(BRAND), prefix)
        .await
        .iter()
        .map(|item| ItemKey::of(item).unwrap().sort_key)
        .collect()
}

pub async fn brand(store: &MemoryStore) -> Brand {
    let item = store
        .get_item(TABLE, &Brand::key_of(BRAND))
        .await
        .unwrap()
        .unwrap();
    Brand::from_item(&item).unwrap()
}

pub async fn product_group(store: &MemoryStore, id: &str) -> ProductGroup {
    let item = store
        .get_item(TABLE, &ProductGroup::key_of(BRAND, id))
        .await
        .unwrap()
        .unwrap();
    ProductGroup::from_item(&item).unwrap()
}

pub async fn landing_page(store: &MemoryStore, id: &str) -> LandingPage {
    let item = store
        .get_item(TABLE, &LandingPage::key_of(BRAND, id))
        .await
        .unwrap()
        .unwrap();
    LandingPage::from_item(&item).unwrap()
}

/// Link records created or deleted between two snapshots of the store,
/// turned into the change records the feed would deliver for them.
pub fn link_changes(
    before: &[Item],
    after: &[Item],
    first_sequence: u64,
) -> Vec<ChangeRecord> {
    let is_link = |item: &Item| {
        matches!(
            datatype_of(item),
            Some(cascade_models::datatype::PRODUCT_GROUP_LINK)
                | Some(cascade_models::datatype::LANDING_PAGE_LINK)
        )
    };
    let keys_of = |items: &[Item]| -> BTreeSet<ItemKey> {
        items
            .iter()
            .filter(|i| is_link(i))
            .map(|i| ItemKey::of(i).unwrap())
            .collect()
    };
    let old = keys_of(before);
    let new = keys_of(after);

    let mut sequence = first_sequence;
    let mut records = Vec::new();
    for item in after.iter().filter(|i| is_link(i)) {
        if !old.contains(&ItemKey::of(item).unwrap()) {
            let record =
                ChangeRecord::create(sequence.to_string(), item.clone());
            records.push(record);
            sequence += 1;
        }
    }
    for item in before.iter().filter(|i| is_link(i)) {
        if !new.contains(&ItemKey::of(item).unwrap()) {
            let record =
                ChangeRecord::delete(sequence.to_string(), item.clone());
            records.push(record);
            sequence += 1;
        }
    }
    records
}
