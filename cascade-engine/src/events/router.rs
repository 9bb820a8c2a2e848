use std::sync::Arc;

use cascade_models::{Campaign, Record};
use cascade_store::{Item, WideColumnStore};
use tracing::{debug, error, info};

use super::{
    BatchReport, CampaignHandler, ChangeKind, ChangeRecord, EntityKind,
    LinkHandler, RecordFailure,
};
use crate::CascadeConfig;
use crate::aggregates::Counters;
use crate::dispatcher::BatchDispatcher;
use crate::error::{CascadeError, CascadeResult};
use crate::fetcher::AssociationFetcher;
use crate::propagator::Propagator;

/// Entry point for change-feed batches. Routes each record by entity kind
/// and change kind.
pub struct ChangeRouter<S> {
    campaigns: CampaignHandler<S>,
    links: LinkHandler<S>,
    config: CascadeConfig,
}

impl<S: WideColumnStore> ChangeRouter<S> {
    pub fn new(store: Arc<S>, config: CascadeConfig) -> CascadeResult<Self> {
        config.validate()?;
        let table = config.table_name.as_str();
        let counters = Counters::new(store.clone(), table);
        let campaigns = CampaignHandler::new(
            AssociationFetcher::new(
                store.clone(),
                table,
                config.query_page_size,
                config.max_in_flight,
            ),
            BatchDispatcher::new(
                store.clone(),
                table,
                config.batch_size,
                config.max_in_flight,
            ),
            Propagator::new(store.clone(), table, config.max_in_flight),
            counters.clone(),
            config.materialize_on_create,
        );
        let links = LinkHandler::new(store, table, counters);
        Ok(Self {
            campaigns,
            links,
            config,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn campaigns(&self) -> &CampaignHandler<S> {
        &self.campaigns
    }

    pub fn links(&self) -> &LinkHandler<S> {
        &self.links
    }

    /// Process every record in order. A failing record does not stop the
    /// batch; it is reported by sequence number.
    pub async fn process_batch(&self, records: &[ChangeRecord]) -> BatchReport {
        let mut report = BatchReport::default();
        for record in records {
            if let Err(e) = self.process_record(record).await {
                report.failures.push(RecordFailure {
                    sequence_number: record.sequence_number.clone(),
                    message: e.to_string(),
                });
            }
            report.processed += 1;
        }
        info!(
            processed = report.processed,
            failed = report.failures.len(),
            "change batch processed"
        );
        report
    }

    pub async fn process_record(
        &self,
        record: &ChangeRecord,
    ) -> CascadeResult<()> {
        let result = self.route(record).await;
        if let Err(e) = &result {
            error!(
                sequence_number = %record.sequence_number,
                change_kind = %record.change_kind,
                entity_kind = ?record.entity_kind(),
                transient = e.is_transient(),
                error = %e,
                "change record failed"
            );
        }
        result
    }

    async fn route(&self, record: &ChangeRecord) -> CascadeResult<()> {
        if record.old_image.is_none() && record.new_image.is_none() {
            let image = match record.change_kind {
                ChangeKind::Delete => "old",
                ChangeKind::Create | ChangeKind::Modify => "new",
            };
            return Err(missing(record, image));
        }
        let Some(entity) = record.entity_kind() else {
            debug!(
                sequence_number = %record.sequence_number,
                "record without datatype, ignoring"
            );
            return Ok(());
        };

        match (entity, record.change_kind) {
            (EntityKind::Campaign, ChangeKind::Create) => {
                let campaign = decode_campaign(new_image(record)?)?;
                self.campaigns.on_create(&campaign).await?;
            }
            (EntityKind::Campaign, ChangeKind::Modify) => {
                let before = decode_campaign(old_image(record)?)?;
                let after = decode_campaign(new_image(record)?)?;
                self.campaigns.on_modify(&before, &after).await?;
            }
            (EntityKind::Campaign, ChangeKind::Delete) => {
                let campaign = decode_campaign(old_image(record)?)?;
                self.campaigns.on_delete(&campaign).await?;
            }
            (EntityKind::ProductGroupLink, ChangeKind::Create) => {
                self.links
                    .on_product_group_link_created(new_image(record)?)
                    .await?;
            }
            (EntityKind::ProductGroupLink, ChangeKind::Delete) => {
                self.links
                    .on_product_group_link_deleted(old_image(record)?)
                    .await?;
            }
            (EntityKind::LandingPageLink, ChangeKind::Create) => {
                self.links
                    .on_landing_page_link_created(new_image(record)?)
                    .await?;
            }
            (EntityKind::LandingPageLink, ChangeKind::Delete) => {
                self.links
                    .on_landing_page_link_deleted(old_image(record)?)
                    .await?;
            }
            (entity, change_kind) => {
                debug!(
                    sequence_number = %record.sequence_number,
                    ?entity,
                    %change_kind,
                    "no handler for change, ignoring"
                );
            }
        }
        Ok(())
    }
}

fn missing(record: &ChangeRecord, image: &'static str) -> CascadeError {
    CascadeError::MissingImage {
        sequence_number: record.sequence_number.clone(),
        change_kind: record.change_kind,
        image,
    }
}

fn old_image(record: &ChangeRecord) -> CascadeResult<&Item> {
    record.old_image.as_ref().ok_or_else(|| missing(record, "old"))
}

fn new_image(record: &ChangeRecord) -> CascadeResult<&Item> {
    record.new_image.as_ref().ok_or_else(|| missing(record, "new"))
}

fn decode_campaign(image: &Item) -> CascadeResult<Campaign> {
    Campaign::from_item(image)
        .map_err(|e| CascadeError::decode("campaign image", e))
}
