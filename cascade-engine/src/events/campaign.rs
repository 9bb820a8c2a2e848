use std::collections::{BTreeSet, HashSet};

use cascade_models::{
    Campaign, CampaignLandingPage, CampaignProductGroup, DisplayPage,
    LandingPageLink, ProductGroupLink, Record, keys,
};
use cascade_store::{Item, ItemKey, WideColumnStore};
use tracing::{debug, info};

use crate::aggregates::Counters;
use crate::diff::{self, PRODUCT_GROUP_IDENTITY, WINDOW_IDENTITY};
use crate::dispatcher::BatchDispatcher;
use crate::error::{CascadeError, CascadeResult};
use crate::fetcher::AssociationFetcher;
use crate::materializer::{
    MemberIndex, MutationSet, Window, plan_page_creates, plan_page_deletes,
    resolve_windows,
};
use crate::propagator::Propagator;

/// What a handler wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub writes: usize,
    pub batches: usize,
    pub groups_renamed: usize,
}

impl CascadeOutcome {
    pub fn is_noop(&self) -> bool {
        self.writes == 0 && self.groups_renamed == 0
    }
}

/// Differences between two snapshots of one campaign, and the writes they
/// call for. Planning is pure; group members must be resolved into a
/// [`MemberIndex`] first.
#[derive(Debug)]
pub struct ModifyDiff<'a> {
    before: &'a Campaign,
    after: &'a Campaign,
    removed_groups: Vec<&'a CampaignProductGroup>,
    added_groups: Vec<&'a CampaignProductGroup>,
    removed_windows: Vec<&'a CampaignLandingPage>,
    added_windows: Vec<&'a CampaignLandingPage>,
}

impl<'a> ModifyDiff<'a> {
    pub fn compute(
        before: &'a Campaign,
        after: &'a Campaign,
    ) -> CascadeResult<Self> {
        if before.brand_id != after.brand_id
            || before.campaign_id != after.campaign_id
        {
            return Err(CascadeError::decode(
                "campaign images",
                format!(
                    "before is {}/{}, after is {}/{}",
                    before.brand_id,
                    before.campaign_id,
                    after.brand_id,
                    after.campaign_id
                ),
            ));
        }
        let (removed_groups, added_groups) = diff::changes(
            &before.campaign_product_groups,
            &after.campaign_product_groups,
            PRODUCT_GROUP_IDENTITY,
        )?;
        let (removed_windows, added_windows) = diff::changes(
            &before.campaign_landing_pages,
            &after.campaign_landing_pages,
            WINDOW_IDENTITY,
        )?;
        Ok(Self {
            before,
            after,
            removed_groups,
            added_groups,
            removed_windows,
            added_windows,
        })
    }

    pub fn groups_changed(&self) -> bool {
        !self.removed_groups.is_empty() || !self.added_groups.is_empty()
    }

    pub fn windows_changed(&self) -> bool {
        !self.removed_windows.is_empty() || !self.added_windows.is_empty()
    }

    pub fn renamed(&self) -> bool {
        self.before.campaign_name != self.after.campaign_name
    }

    fn removed_group_ids(&self) -> Vec<&'a str> {
        self.removed_groups
            .iter()
            .copied()
            .map(|g| g.product_group_id.as_str())
            .collect()
    }

    fn added_group_ids(&self) -> Vec<&'a str> {
        self.added_groups
            .iter()
            .copied()
            .map(|g| g.product_group_id.as_str())
            .collect()
    }

    /// Groups kept from the before snapshot, in their new order
    fn retained_group_ids(&self) -> Vec<&'a str> {
        let added: HashSet<&str> = self.added_group_ids().into_iter().collect();
        self.after
            .product_group_ids()
            .filter(|id| !added.contains(id))
            .collect()
    }

    /// Groups whose members the group phase needs
    pub fn group_phase_groups(&self) -> Vec<&'a str> {
        let mut groups = self.removed_group_ids();
        groups.extend(self.added_group_ids());
        if !self.removed_groups.is_empty() {
            groups.extend(self.retained_group_ids());
        }
        groups
    }

    /// Groups whose members the window phase needs
    pub fn window_phase_groups(&self) -> Vec<&'a str> {
        let mut groups = Vec::new();
        if !self.removed_windows.is_empty() {
            groups.extend(self.before.product_group_ids());
        }
        groups.extend(self.after.product_group_ids());
        groups
    }

    /// Products of the removed groups. Their stored pages are what the
    /// group phase sweeps.
    pub fn removed_group_products<'i>(
        &self,
        index: &'i MemberIndex,
    ) -> BTreeSet<&'i str> {
        index.products(self.removed_group_ids())
    }

    /// Removed groups lose their pages, unless the product is still
    /// reachable through a retained group; such a page is handed to that
    /// group. Added groups gain pages at every new window.
    ///
    /// `stored` holds the pages already written for the removed groups'
    /// products, so pages at windows the campaign no longer lists are
    /// swept too. Pages of other campaigns are left alone.
    pub fn plan_group_phase(
        &self,
        index: &MemberIndex,
        stored: &[DisplayPage],
    ) -> CascadeResult<MutationSet> {
        let brand_id = &self.after.brand_id;
        let campaign_id = &self.after.campaign_id;
        let mut set = MutationSet::new();
        if !self.groups_changed() {
            return Ok(set);
        }

        if !self.removed_groups.is_empty() {
            let retained = self.retained_group_ids();
            let reachable = index.products(retained.iter().copied());
            let orphaned: Vec<&str> = self
                .removed_group_products(index)
                .into_iter()
                .filter(|product| !reachable.contains(product))
                .collect();
            let old_windows = resolve_windows(
                campaign_id,
                &self.before.campaign_landing_pages,
            );
            plan_page_deletes(&mut set, brand_id, orphaned, &old_windows);

            let removed: HashSet<&str> =
                self.removed_group_ids().into_iter().collect();
            let live_windows: HashSet<String> = resolve_windows(
                campaign_id,
                &self.after.campaign_landing_pages,
            )
            .into_iter()
            .map(|w| w.window_id)
            .collect();
            let owned = stored.iter().filter(|p| p.campaign_id == *campaign_id);
            for page in owned {
                if !reachable.contains(page.product_id.as_str()) {
                    set.delete(page.key());
                    continue;
                }
                if !removed.contains(page.product_group_id.as_str())
                    || !live_windows.contains(&page.window_id)
                {
                    continue;
                }
                let owner = index
                    .owning_group(retained.iter().copied(), &page.product_id);
                if let Some(owner) = owner {
                    let mut page = page.clone();
                    page.product_group_id = owner.to_string();
                    set.overwrite(page.key(), page.to_item()?);
                }
            }

            for group in &self.removed_groups {
                let link = ProductGroupLink::new(
                    brand_id,
                    campaign_id,
                    &group.product_group_id,
                );
                set.delete(link.key());
            }
        }

        if !self.added_groups.is_empty() {
            let new_windows = resolve_windows(
                campaign_id,
                &self.after.campaign_landing_pages,
            );
            let members = index.members(self.added_group_ids());
            plan_page_creates(
                &mut set,
                brand_id,
                campaign_id,
                &members,
                &new_windows,
            )?;
            for group in &self.added_groups {
                let link = ProductGroupLink::new(
                    brand_id,
                    campaign_id,
                    &group.product_group_id,
                );
                set.overwrite(link.key(), link.to_item()?);
            }
        }
        Ok(set)
    }

    /// Pages at removed windows go away for every old-group product; pages
    /// at added windows appear for every new-group product. A surviving
    /// window that shares its id with a removed one re-owns the page.
    pub fn plan_window_phase(
        &self,
        index: &MemberIndex,
    ) -> CascadeResult<MutationSet> {
        let brand_id = &self.after.brand_id;
        let campaign_id = &self.after.campaign_id;
        let mut set = MutationSet::new();
        if !self.windows_changed() {
            return Ok(set);
        }

        let removed =
            resolve_windows(campaign_id, self.removed_windows.iter().copied());
        let mut to_create =
            resolve_windows(campaign_id, self.added_windows.iter().copied());

        if !removed.is_empty() {
            let products = index.products(self.before.product_group_ids());
            plan_page_deletes(&mut set, brand_id, products, &removed);

            let removed_ids: HashSet<&str> =
                removed.iter().map(|w| w.window_id.as_str()).collect();
            let survivors: Vec<Window> = resolve_windows(
                campaign_id,
                &self.after.campaign_landing_pages,
            )
            .into_iter()
            .filter(|w| removed_ids.contains(w.window_id.as_str()))
            .filter(|w| !to_create.iter().any(|a| a.window_id == w.window_id))
            .collect();
            to_create.extend(survivors);
        }

        let members = index.members(self.after.product_group_ids());
        plan_page_creates(
            &mut set,
            brand_id,
            campaign_id,
            &members,
            &to_create,
        )?;

        let remaining_pages: HashSet<&str> = self
            .after
            .campaign_landing_pages
            .iter()
            .map(|lp| lp.landing_page_id.as_str())
            .collect();
        for window in &self.removed_windows {
            if !remaining_pages.contains(window.landing_page_id.as_str()) {
                let link = LandingPageLink::new(
                    brand_id,
                    campaign_id,
                    &window.landing_page_id,
                );
                set.delete(link.key());
            }
        }
        for window in &self.added_windows {
            let link = LandingPageLink::new(
                brand_id,
                campaign_id,
                &window.landing_page_id,
            );
            set.overwrite(link.key(), link.to_item()?);
        }
        Ok(set)
    }
}

/// Every record a deleted campaign owns: links, display pages at all of
/// its windows, any other stored page it still owns, and its campaign
/// events.
pub fn plan_campaign_delete(
    campaign: &Campaign,
    index: &MemberIndex,
    stored: &[DisplayPage],
    events: &[Item],
) -> CascadeResult<MutationSet> {
    let brand_id = &campaign.brand_id;
    let campaign_id = &campaign.campaign_id;
    let mut set = MutationSet::new();

    let windows =
        resolve_windows(campaign_id, &campaign.campaign_landing_pages);
    plan_page_deletes(
        &mut set,
        brand_id,
        index.products(campaign.product_group_ids()),
        &windows,
    );
    for page in stored.iter().filter(|p| p.campaign_id == *campaign_id) {
        set.delete(page.key());
    }
    for group_id in campaign.product_group_ids() {
        let link = ProductGroupLink::new(brand_id, campaign_id, group_id);
        set.delete(link.key());
    }
    for landing_page in &campaign.campaign_landing_pages {
        let link = LandingPageLink::new(
            brand_id,
            campaign_id,
            &landing_page.landing_page_id,
        );
        set.delete(link.key());
    }
    for event in events {
        set.delete(ItemKey::of(event)?);
    }
    Ok(set)
}

/// Reacts to campaign create, modify and delete.
pub struct CampaignHandler<S> {
    fetcher: AssociationFetcher<S>,
    dispatcher: BatchDispatcher<S>,
    propagator: Propagator<S>,
    counters: Counters<S>,
    materialize_on_create: bool,
}

impl<S: WideColumnStore> CampaignHandler<S> {
    pub fn new(
        fetcher: AssociationFetcher<S>,
        dispatcher: BatchDispatcher<S>,
        propagator: Propagator<S>,
        counters: Counters<S>,
        materialize_on_create: bool,
    ) -> Self {
        Self {
            fetcher,
            dispatcher,
            propagator,
            counters,
            materialize_on_create,
        }
    }

    async fn apply(
        &self,
        set: MutationSet,
        outcome: &mut CascadeOutcome,
    ) -> CascadeResult<()> {
        let writes = set.len();
        outcome.batches += self.dispatcher.dispatch(set.into_requests()).await?;
        outcome.writes += writes;
        Ok(())
    }

    pub async fn on_create(
        &self,
        campaign: &Campaign,
    ) -> CascadeResult<CascadeOutcome> {
        info!(
            brand_id = %campaign.brand_id,
            campaign_id = %campaign.campaign_id,
            "campaign created"
        );
        let outcome = if self.materialize_on_create {
            self.on_modify(&campaign.empty_like(), campaign).await?
        } else {
            CascadeOutcome::default()
        };
        self.counters
            .adjust_brand_campaigns(&campaign.brand_id, 1)
            .await?;
        Ok(outcome)
    }

    pub async fn on_modify(
        &self,
        before: &Campaign,
        after: &Campaign,
    ) -> CascadeResult<CascadeOutcome> {
        let diff = ModifyDiff::compute(before, after)?;
        let brand_id = after.brand_id.as_str();
        let campaign_id = after.campaign_id.as_str();
        info!(
            brand_id,
            campaign_id,
            groups_changed = diff.groups_changed(),
            windows_changed = diff.windows_changed(),
            renamed = diff.renamed(),
            "campaign modified"
        );

        let mut outcome = CascadeOutcome::default();
        let mut index = MemberIndex::default();

        if diff.groups_changed() {
            let groups = diff.group_phase_groups();
            self.fetcher
                .resolve_members(brand_id, groups, &mut index)
                .await?;
            let stored = self
                .fetcher
                .product_pages(brand_id, diff.removed_group_products(&index))
                .await?;
            let set = diff.plan_group_phase(&index, &stored)?;
            debug!(
                brand_id,
                campaign_id,
                puts = set.puts(),
                deletes = set.deletes(),
                "group phase"
            );
            self.apply(set, &mut outcome).await?;
        }

        if diff.windows_changed() {
            let groups = diff.window_phase_groups();
            self.fetcher
                .resolve_members(brand_id, groups, &mut index)
                .await?;
            let set = diff.plan_window_phase(&index)?;
            debug!(
                brand_id,
                campaign_id,
                puts = set.puts(),
                deletes = set.deletes(),
                "window phase"
            );
            self.apply(set, &mut outcome).await?;
        }

        if diff.renamed() {
            outcome.groups_renamed = self
                .propagator
                .propagate_campaign_name(
                    brand_id,
                    campaign_id,
                    &after.campaign_name,
                    after.product_group_ids(),
                )
                .await?;
        }
        Ok(outcome)
    }

    pub async fn on_delete(
        &self,
        campaign: &Campaign,
    ) -> CascadeResult<CascadeOutcome> {
        let brand_id = campaign.brand_id.as_str();
        let campaign_id = campaign.campaign_id.as_str();
        info!(brand_id, campaign_id, "campaign deleted");

        let mut index = MemberIndex::default();
        self.fetcher
            .resolve_members(brand_id, campaign.product_group_ids(), &mut index)
            .await?;
        let products = index.products(campaign.product_group_ids());
        let stored = self.fetcher.product_pages(brand_id, products).await?;
        let events = self
            .fetcher
            .fetch_all(
                &campaign.partition_key(),
                &keys::campaign_events_prefix(campaign_id),
            )
            .await?;

        let set = plan_campaign_delete(campaign, &index, &stored, &events)?;
        debug!(
            brand_id,
            campaign_id,
            deletes = set.len(),
            stored_pages = stored.len(),
            events = events.len(),
            "delete plan"
        );
        let mut outcome = CascadeOutcome::default();
        self.apply(set, &mut outcome).await?;

        self.counters.adjust_brand_campaigns(brand_id, -1).await?;
        Ok(outcome)
    }
}
