use cascade_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid {family} key: {key}")]
    InvalidKey { family: &'static str, key: String },

    #[error("Expected datatype `{expected}`, found `{found}`")]
    UnexpectedDatatype {
        expected: &'static str,
        found: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ModelError {
    pub fn invalid_key(family: &'static str, key: impl Into<String>) -> Self {
        Self::InvalidKey {
            family,
            key: key.into(),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
