//! In-process [`Datastore`] backed by one ordered map per kind.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicI64, Ordering},
};

use dashmap::DashMap;
use serde_json::Value;

use super::{compare_fields, Datastore, Direction, Key, Query, StoreError, MAX_BATCH};

type Records = BTreeMap<Key, Value>;

/// Writes to one kind are serialized through that kind's map entry, so a batch
/// is applied in full before any other writer sees the kind.
#[derive(Debug)]
pub struct MemoryStore {
    kinds: DashMap<String, Records>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { kinds: DashMap::new(), next_id: AtomicI64::new(1) }
    }

    /// Rebuild a store from `(kind, key, value)` records. Id allocation resumes
    /// after the highest numeric key present.
    pub fn from_records(records: impl IntoIterator<Item = (String, Key, Value)>) -> Self {
        let store = Self::new();
        let mut max_id = 0;
        for (kind, key, value) in records {
            if let Some(id) = key.as_id() {
                max_id = max_id.max(id);
            }
            store.kinds.entry(kind).or_default().insert(key, value);
        }
        store.next_id.store(max_id + 1, Ordering::SeqCst);
        store
    }

    /// Every record currently held, grouped by kind.
    pub fn records(&self) -> Vec<(String, Key, Value)> {
        let mut out = Vec::new();
        for entry in self.kinds.iter() {
            for (key, value) in entry.value() {
                out.push((entry.key().clone(), key.clone(), value.clone()));
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.kinds.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_batch(len: usize) -> Result<(), StoreError> {
    if len > MAX_BATCH {
        return Err(StoreError::BatchTooLarge { len, max: MAX_BATCH });
    }
    Ok(())
}

impl Datastore for MemoryStore {
    fn get(&self, kind: &str, key: &Key) -> Result<Option<Value>, StoreError> {
        Ok(self.kinds.get(kind).and_then(|records| records.get(key).cloned()))
    }

    fn get_multi(&self, kind: &str, keys: &[Key]) -> Result<Vec<Option<Value>>, StoreError> {
        check_batch(keys.len())?;
        let Some(records) = self.kinds.get(kind) else {
            return Ok(vec![None; keys.len()]);
        };
        Ok(keys.iter().map(|key| records.get(key).cloned()).collect())
    }

    fn put(&self, kind: &str, key: Key, value: Value) -> Result<(), StoreError> {
        self.kinds.entry(kind.to_string()).or_default().insert(key, value);
        Ok(())
    }

    fn insert(&self, kind: &str, value: Value) -> Result<Key, StoreError> {
        let key = Key::Id(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.kinds.entry(kind.to_string()).or_default().insert(key.clone(), value);
        Ok(key)
    }

    fn put_multi(&self, kind: &str, entries: Vec<(Key, Value)>) -> Result<(), StoreError> {
        check_batch(entries.len())?;
        let mut records = self.kinds.entry(kind.to_string()).or_default();
        records.extend(entries);
        Ok(())
    }

    fn query(&self, query: &Query) -> Result<Vec<(Key, Value)>, StoreError> {
        let mut rows: Vec<(Key, Value)> = match self.kinds.get(query.kind) {
            Some(records) => records
                .iter()
                .filter(|(_, value)| query.matches(value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            None => Vec::new(),
        };

        // Equal sort values fall back to key order, i.e. allocation order for ids.
        if let Some((field, direction)) = &query.order {
            rows.sort_by(|(ka, a), (kb, b)| {
                let ord = compare_fields(a.get(field), b.get(field)).then_with(|| ka.cmp(kb));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn keys(&self, kind: &str) -> Result<Vec<Key>, StoreError> {
        Ok(self
            .kinds
            .get(kind)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn delete_multi(&self, kind: &str, keys: &[Key]) -> Result<(), StoreError> {
        check_batch(keys.len())?;
        if let Some(mut records) = self.kinds.get_mut(kind) {
            for key in keys {
                records.remove(key);
            }
        }
        Ok(())
    }
}
