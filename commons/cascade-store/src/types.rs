use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{StoreError, StoreResult};

pub const PARTITION_KEY: &str = "partition_key";
pub const SORT_KEY: &str = "sort_key";

/// Maximum number of requests a single `batch_write` call accepts.
pub const MAX_BATCH_ITEMS: usize = 25;

/// A schemaless record. Keys live alongside the attributes, the same way
/// the wide-column store returns them.
pub type Item = serde_json::Map<String, Value>;

#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ItemKey {
    pub partition_key: String,
    pub sort_key: String,
}

impl ItemKey {
    pub fn new(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
        }
    }

    /// Read the key attributes out of an item.
    pub fn of(item: &Item) -> StoreResult<Self> {
        let partition_key = item
            .get(PARTITION_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::invalid_operation("missing partition_key"))?;
        let sort_key = item
            .get(SORT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::invalid_operation("missing sort_key"))?;
        Ok(Self::new(partition_key, sort_key))
    }

    /// Write the key attributes into an item, overwriting existing ones.
    pub fn stamp(&self, item: &mut Item) {
        item.insert(
            PARTITION_KEY.into(),
            Value::String(self.partition_key.clone()),
        );
        item.insert(SORT_KEY.into(), Value::String(self.sort_key.clone()));
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.sort_key)
    }
}

/// Opaque marker handed back by a paginated query. Callers only pass it
/// back to the next `query` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub next: Option<ContinuationToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PutCondition {
    #[default]
    Always,
    /// Skip the put when an item already exists under the key.
    IfAbsent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Put {
        key: ItemKey,
        item: Item,
        condition: PutCondition,
    },
    Delete {
        key: ItemKey,
    },
}

impl WriteRequest {
    pub fn put(key: ItemKey, item: Item) -> Self {
        Self::Put {
            key,
            item,
            condition: PutCondition::Always,
        }
    }

    pub fn put_if_absent(key: ItemKey, item: Item) -> Self {
        Self::Put {
            key,
            item,
            condition: PutCondition::IfAbsent,
        }
    }

    pub fn delete(key: ItemKey) -> Self {
        Self::Delete { key }
    }

    pub fn key(&self) -> &ItemKey {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }

    pub fn is_put(&self) -> bool {
        matches!(self, Self::Put { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchWriteOutcome {
    /// Requests the store accepted the call for but did not apply.
    pub unprocessed: Vec<WriteRequest>,
}

impl BatchWriteOutcome {
    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    Set(Value),
    /// Numeric delta; a missing attribute counts as zero.
    Add(i64),
    Remove,
}

/// A single-item, field-level update with optional preconditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub actions: BTreeMap<String, UpdateAction>,
    pub require_exists: bool,
    pub expected: BTreeMap<String, Value>,
}

impl ItemUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, attr: impl Into<String>, value: impl Into<Value>) -> Self {
        self.actions.insert(attr.into(), UpdateAction::Set(value.into()));
        self
    }

    pub fn add(mut self, attr: impl Into<String>, delta: i64) -> Self {
        self.actions.insert(attr.into(), UpdateAction::Add(delta));
        self
    }

    pub fn remove(mut self, attr: impl Into<String>) -> Self {
        self.actions.insert(attr.into(), UpdateAction::Remove);
        self
    }

    /// Fail with `ConditionFailed` when the item does not exist.
    pub fn if_exists(mut self) -> Self {
        self.require_exists = true;
        self
    }

    /// Fail with `ConditionFailed` unless `attr` currently equals `value`.
    pub fn expect(
        mut self,
        attr: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.expected.insert(attr.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
