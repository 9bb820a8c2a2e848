use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{
    BatchWriteOutcome, ContinuationToken, Item, ItemKey, ItemUpdate,
    MemoryStoreConfig, PutCondition, QueryPage, StoreError, StoreResult,
    UpdateAction, WideColumnStore, WriteRequest,
};

type Table = BTreeMap<ItemKey, Item>;

/// In-memory wide-column store. Tables are created on first write.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    config: MemoryStoreConfig,
}

impl Clone for MemoryStore {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            config: self.config.clone(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            config: MemoryStoreConfig::default(),
        }
    }
}

impl MemoryStore {
    pub fn new(config: MemoryStoreConfig) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            config,
        })
    }

    /// Insert items directly, bypassing batch limits. Each item must carry
    /// its key attributes.
    pub async fn seed(
        &self,
        table: &str,
        items: impl IntoIterator<Item = Item>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();
        for item in items {
            let key = ItemKey::of(&item)?;
            target.insert(key, item);
        }
        Ok(())
    }

    /// All items of a table in key order
    pub async fn items(&self, table: &str) -> Vec<Item> {
        let tables = self.tables.read().await;
        tables
            .get(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Items of one partition whose sort key starts with `prefix`
    pub async fn items_with_prefix(
        &self,
        table: &str,
        partition_key: &str,
        prefix: &str,
    ) -> Vec<Item> {
        let tables = self.tables.read().await;
        let Some(target) = tables.get(table) else {
            return Vec::new();
        };
        target
            .range(ItemKey::new(partition_key, prefix)..)
            .take_while(|(k, _)| {
                k.partition_key == partition_key && k.sort_key.starts_with(prefix)
            })
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub async fn len(&self, table: &str) -> usize {
        let tables = self.tables.read().await;
        tables.get(table).map(|t| t.len()).unwrap_or(0)
    }
}

fn apply_update(item: &mut Item, update: &ItemUpdate) -> StoreResult<()> {
    for (attr, action) in &update.actions {
        match action {
            UpdateAction::Set(value) => {
                item.insert(attr.clone(), value.clone());
            }
            UpdateAction::Add(delta) => {
                let current = match item.get(attr) {
                    None | Some(Value::Null) => 0,
                    Some(v) => v.as_i64().ok_or_else(|| {
                        StoreError::invalid_operation(format!(
                            "attribute `{attr}` is not numeric"
                        ))
                    })?,
                };
                item.insert(attr.clone(), Value::from(current + delta));
            }
            UpdateAction::Remove => {
                item.remove(attr);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl WideColumnStore for MemoryStore {
    async fn query(
        &self,
        table: &str,
        partition_key: &str,
        sort_key_prefix: &str,
        limit: usize,
        start: Option<ContinuationToken>,
    ) -> StoreResult<QueryPage> {
        if limit == 0 {
            return Err(StoreError::invalid_operation("query limit must be > 0"));
        }
        let limit = limit.min(self.config.max_page_items);
        let tables = self.tables.read().await;
        let Some(target) = tables.get(table) else {
            return Ok(QueryPage::default());
        };

        let lower = match &start {
            Some(token) => {
                Bound::Excluded(ItemKey::new(partition_key, token.as_str()))
            }
            None => Bound::Included(ItemKey::new(partition_key, sort_key_prefix)),
        };
        let mut matching = target
            .range((lower, Bound::Unbounded))
            .take_while(|(k, _)| {
                k.partition_key == partition_key
                    && k.sort_key.starts_with(sort_key_prefix)
            })
            .peekable();

        let mut items = Vec::new();
        let mut last_key = None;
        while items.len() < limit {
            match matching.next() {
                Some((k, v)) => {
                    last_key = Some(k.sort_key.clone());
                    items.push(v.clone());
                }
                None => break,
            }
        }
        let next = if matching.peek().is_some() {
            last_key.map(ContinuationToken::new)
        } else {
            None
        };
        trace!(
            table,
            partition_key,
            sort_key_prefix,
            returned = items.len(),
            more = next.is_some(),
            "memory query"
        );
        Ok(QueryPage { items, next })
    }

    async fn get_item(
        &self,
        table: &str,
        key: &ItemKey,
    ) -> StoreResult<Option<Item>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    async fn batch_write(
        &self,
        table: &str,
        requests: Vec<WriteRequest>,
    ) -> StoreResult<BatchWriteOutcome> {
        if requests.len() > self.config.max_batch_items {
            return Err(StoreError::BatchTooLarge {
                size: requests.len(),
                max: self.config.max_batch_items,
            });
        }
        let mut seen = HashSet::with_capacity(requests.len());
        for request in &requests {
            if !seen.insert(request.key()) {
                return Err(StoreError::invalid_operation(format!(
                    "duplicate key {} in batch",
                    request.key()
                )));
            }
        }

        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();
        for request in requests {
            match request {
                WriteRequest::Put {
                    key,
                    mut item,
                    condition,
                } => {
                    if condition == PutCondition::IfAbsent
                        && target.contains_key(&key)
                    {
                        continue;
                    }
                    key.stamp(&mut item);
                    target.insert(key, item);
                }
                WriteRequest::Delete { key } => {
                    target.remove(&key);
                }
            }
        }
        Ok(BatchWriteOutcome::default())
    }

    async fn update_item(
        &self,
        table: &str,
        key: &ItemKey,
        update: ItemUpdate,
    ) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let target = tables.entry(table.to_string()).or_default();
        match target.get_mut(key) {
            Some(item) => {
                for (attr, expected) in &update.expected {
                    if item.get(attr) != Some(expected) {
                        return Err(StoreError::ConditionFailed);
                    }
                }
                apply_update(item, &update)
            }
            None => {
                if update.require_exists || !update.expected.is_empty() {
                    return Err(StoreError::ConditionFailed);
                }
                let mut item = Item::new();
                key.stamp(&mut item);
                apply_update(&mut item, &update)?;
                target.insert(key.clone(), item);
                Ok(())
            }
        }
    }

    fn max_batch_items(&self) -> usize {
        self.config.max_batch_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TABLE: &str = "test";

    fn item(pk: &str, sk: &str) -> Item {
        let mut item = Item::new();
        ItemKey::new(pk, sk).stamp(&mut item);
        item
    }

    #[tokio::test]
    async fn test_query_follows_continuation() {
        let store = MemoryStore::default();
        store
            .seed(
                TABLE,
                (0..5).map(|i| item("p", &format!("group#g1#product#{i}"))),
            )
            .await
            .unwrap();
        store.seed(TABLE, [item("p", "group#g2#product#9")]).await.unwrap();
        store.seed(TABLE, [item("q", "group#g1#product#7")]).await.unwrap();

        let first = store
            .query(TABLE, "p", "group#g1#", 2, None)
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        let token = first.next.expect("more pages");

        let second = store
            .query(TABLE, "p", "group#g1#", 2, Some(token))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);

        let third = store
            .query(TABLE, "p", "group#g1#", 2, second.next)
            .await
            .unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.next.is_none());
    }

    #[tokio::test]
    async fn test_query_exact_page_has_no_token() {
        let store = MemoryStore::default();
        store
            .seed(TABLE, [item("p", "a#1"), item("p", "a#2")])
            .await
            .unwrap();
        let page = store.query(TABLE, "p", "a#", 2, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_query_unknown_table_is_empty() {
        let store = MemoryStore::default();
        let page = store.query("nope", "p", "a#", 10, None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.next.is_none());
    }

    #[tokio::test]
    async fn test_batch_limit_and_duplicates() {
        let store = MemoryStore::default();
        let too_many = (0..26)
            .map(|i| WriteRequest::delete(ItemKey::new("p", format!("k{i}"))))
            .collect();
        assert!(matches!(
            store.batch_write(TABLE, too_many).await,
            Err(StoreError::BatchTooLarge { size: 26, max: 25 })
        ));

        let key = ItemKey::new("p", "k");
        let dup = vec![
            WriteRequest::delete(key.clone()),
            WriteRequest::put(key, Item::new()),
        ];
        assert!(matches!(
            store.batch_write(TABLE, dup).await,
            Err(StoreError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_put_if_absent_keeps_existing() {
        let store = MemoryStore::default();
        let key = ItemKey::new("p", "k");
        let mut first = Item::new();
        first.insert("owner".into(), json!("a"));
        let mut second = Item::new();
        second.insert("owner".into(), json!("b"));

        store
            .batch_write(TABLE, vec![WriteRequest::put_if_absent(key.clone(), first)])
            .await
            .unwrap();
        store
            .batch_write(TABLE, vec![WriteRequest::put_if_absent(key.clone(), second)])
            .await
            .unwrap();

        let stored = store.get_item(TABLE, &key).await.unwrap().unwrap();
        assert_eq!(stored["owner"], json!("a"));
        assert_eq!(stored["sort_key"], json!("k"));
    }

    #[tokio::test]
    async fn test_update_item_conditions() {
        let store = MemoryStore::default();
        let key = ItemKey::new("p", "counter");

        let missing = store
            .update_item(TABLE, &key, ItemUpdate::new().add("n", 1).if_exists())
            .await;
        assert!(matches!(missing, Err(StoreError::ConditionFailed)));

        store
            .update_item(TABLE, &key, ItemUpdate::new().add("n", 2))
            .await
            .unwrap();
        store
            .update_item(TABLE, &key, ItemUpdate::new().add("n", -1).if_exists())
            .await
            .unwrap();
        let stored = store.get_item(TABLE, &key).await.unwrap().unwrap();
        assert_eq!(stored["n"], json!(1));

        let wrong = store
            .update_item(
                TABLE,
                &key,
                ItemUpdate::new().remove("n").expect("n", 5),
            )
            .await;
        assert!(matches!(wrong, Err(StoreError::ConditionFailed)));
    }
}
