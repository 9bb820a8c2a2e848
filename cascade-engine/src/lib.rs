pub mod aggregates;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod materializer;
pub mod propagator;

use envconfig::Envconfig;

pub use error::{CascadeError, CascadeResult};
pub use events::campaign::CascadeOutcome;
pub use events::{BatchReport, ChangeKind, ChangeRecord, ChangeRouter};

#[derive(Envconfig, Clone, Debug)]
pub struct CascadeConfig {
    #[envconfig(from = "CASCADE_TABLE_NAME", default = "cascade")]
    pub table_name: String,
    /// Writes per `batch_write` call, capped by the store's own limit
    #[envconfig(from = "CASCADE_BATCH_SIZE", default = "25")]
    pub batch_size: usize,
    #[envconfig(from = "CASCADE_QUERY_PAGE_SIZE", default = "100")]
    pub query_page_size: usize,
    /// Concurrent store calls per fan-out
    #[envconfig(from = "CASCADE_MAX_IN_FLIGHT", default = "16")]
    pub max_in_flight: usize,
    #[envconfig(from = "CASCADE_MATERIALIZE_ON_CREATE", default = "false")]
    pub materialize_on_create: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            table_name: "cascade".to_string(),
            batch_size: cascade_store::MAX_BATCH_ITEMS,
            query_page_size: 100,
            max_in_flight: 16,
            materialize_on_create: false,
        }
    }
}

impl CascadeConfig {
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_query_page_size(mut self, page_size: usize) -> Self {
        self.query_page_size = page_size;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    pub fn with_materialize_on_create(mut self, enabled: bool) -> Self {
        self.materialize_on_create = enabled;
        self
    }

    pub fn validate(&self) -> CascadeResult<()> {
        if self.table_name.trim().is_empty() {
            return Err(CascadeError::config("table_name must not be empty"));
        }
        if !(1..=cascade_store::MAX_BATCH_ITEMS).contains(&self.batch_size) {
            return Err(CascadeError::config(format!(
                "batch_size must be between 1 and {}, got {}",
                cascade_store::MAX_BATCH_ITEMS,
                self.batch_size
            )));
        }
        if self.query_page_size == 0 {
            return Err(CascadeError::config(
                "query_page_size must be at least 1",
            ));
        }
        if self.max_in_flight == 0 {
            return Err(CascadeError::config(
                "max_in_flight must be at least 1",
            ));
        }
        Ok(())
    }
}
