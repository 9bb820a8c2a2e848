use std::sync::Arc;

use cascade_models::{DisplayPage, ProductGroupMembership, Record, keys};
use cascade_store::{Item, WideColumnStore};
use futures_util::{StreamExt, stream};
use tracing::{trace, warn};

use crate::error::CascadeResult;
use crate::materializer::MemberIndex;

/// Reads every association record under a parent key, following
/// continuation tokens.
pub struct AssociationFetcher<S> {
    store: Arc<S>,
    table: String,
    page_size: usize,
    max_in_flight: usize,
}

impl<S> Clone for AssociationFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            table: self.table.clone(),
            page_size: self.page_size,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl<S: WideColumnStore> AssociationFetcher<S> {
    pub fn new(
        store: Arc<S>,
        table: impl Into<String>,
        page_size: usize,
        max_in_flight: usize,
    ) -> Self {
        Self {
            store,
            table: table.into(),
            page_size: page_size.max(1),
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// All items in `partition_key` whose sort key starts with `prefix`.
    /// Any failing page aborts the whole fetch.
    pub async fn fetch_all(
        &self,
        partition_key: &str,
        prefix: &str,
    ) -> CascadeResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut start = None;
        let mut pages = 0usize;
        loop {
            let page = self
                .store
                .query(
                    &self.table,
                    partition_key,
                    prefix,
                    self.page_size,
                    start,
                )
                .await?;
            pages += 1;
            items.extend(page.items);
            match page.next {
                Some(token) => start = Some(token),
                None => break,
            }
        }
        trace!(
            partition_key,
            prefix,
            pages,
            items = items.len(),
            "fetched associations"
        );
        Ok(items)
    }

    /// Product ids belonging to one product group
    pub async fn group_members(
        &self,
        brand_id: &str,
        product_group_id: &str,
    ) -> CascadeResult<Vec<String>> {
        let items = self
            .fetch_all(
                &keys::brand_partition(brand_id),
                &keys::group_members_prefix(product_group_id),
            )
            .await?;
        let mut products = Vec::with_capacity(items.len());
        for item in &items {
            match ProductGroupMembership::from_item(item) {
                Ok(membership) => products.push(membership.product_id),
                Err(e) => {
                    warn!(
                        brand_id,
                        product_group_id,
                        error = %e,
                        "skipping malformed membership record"
                    );
                }
            }
        }
        Ok(products)
    }

    /// Resolve the members of every group not yet in `index`, concurrently.
    pub async fn resolve_members<'g>(
        &self,
        brand_id: &str,
        product_group_ids: impl IntoIterator<Item = &'g str>,
        index: &mut MemberIndex,
    ) -> CascadeResult<()> {
        let mut pending: Vec<&str> = product_group_ids
            .into_iter()
            .filter(|id| !index.contains_group(id))
            .collect();
        pending.sort_unstable();
        pending.dedup();
        if pending.is_empty() {
            return Ok(());
        }

        let results: Vec<_> = stream::iter(pending)
            .map(|group_id| async move {
                (group_id, self.group_members(brand_id, group_id).await)
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut first_error = None;
        for (group_id, result) in results {
            match result {
                Ok(products) => index.insert(group_id, products),
                Err(e) => {
                    warn!(
                        brand_id,
                        group_id,
                        error = %e,
                        "failed to resolve group members"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every display page stored for the given products, whichever
    /// campaign or window owns it. Sorted by product, then window.
    pub async fn product_pages<'p>(
        &self,
        brand_id: &str,
        product_ids: impl IntoIterator<Item = &'p str>,
    ) -> CascadeResult<Vec<DisplayPage>> {
        let partition_key = keys::brand_partition(brand_id);
        let results: Vec<_> = stream::iter(product_ids)
            .map(|product_id| {
                let partition_key = &partition_key;
                async move {
                    let prefix = keys::product_display_pages_prefix(product_id);
                    (product_id, self.fetch_all(partition_key, &prefix).await)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut pages = Vec::new();
        let mut first_error = None;
        for (product_id, result) in results {
            let items = match result {
                Ok(items) => items,
                Err(e) => {
                    warn!(
                        brand_id,
                        product_id,
                        error = %e,
                        "failed to read display pages"
                    );
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            for item in &items {
                match DisplayPage::from_item(item) {
                    Ok(page) => pages.push(page),
                    Err(e) => warn!(
                        brand_id,
                        product_id,
                        error = %e,
                        "skipping malformed display page"
                    ),
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        pages.sort_by(|a, b| {
            a.product_id
                .cmp(&b.product_id)
                .then_with(|| a.window_id.cmp(&b.window_id))
        });
        Ok(pages)
    }
}
