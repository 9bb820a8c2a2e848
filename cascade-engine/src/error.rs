use cascade_models::ModelError;
use cascade_store::{ItemKey, StoreError};
use thiserror::Error;

use crate::events::ChangeKind;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{} writes were not applied by the store", .unprocessed.len())]
    PartialBatch { unprocessed: Vec<ItemKey> },

    #[error("{change_kind} record {sequence_number} has no {image} image")]
    MissingImage {
        sequence_number: String,
        change_kind: ChangeKind,
        image: &'static str,
    },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("Invalid date `{0}`")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CascadeError {
    pub fn decode<T: ToString>(what: impl Into<String>, reason: T) -> Self {
        Self::Decode {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Whether redelivering the event may succeed. All cascade writes are
    /// idempotent, so a retry after a transient failure is safe.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::PartialBatch { .. } => true,
            _ => false,
        }
    }
}

impl From<ModelError> for CascadeError {
    fn from(err: ModelError) -> Self {
        Self::decode("record", err)
    }
}

pub type CascadeResult<T> = Result<T, CascadeError>;
