//! Persistence gateway: a schemaless document store addressed by kind and key.
//!
//! Services talk to an injected `Arc<dyn Datastore>`; [`EntityExt`] layers typed
//! (serde) access on top of the raw JSON values.

mod memory;
pub mod snapshot;

use std::{cmp::Ordering, fmt};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

pub use memory::MemoryStore;

/// Most keys accepted by a single batch put or delete.
pub const MAX_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Caller-chosen name, e.g. a player id.
    Name(String),
    /// Store-allocated numeric id.
    Id(i64),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn as_id(&self) -> Option<i64> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Name(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality filters, an optional sort field and an optional limit over one kind.
#[derive(Debug, Clone)]
pub struct Query {
    pub kind: &'static str,
    pub filters: Vec<(String, Value)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(kind: &'static str) -> Self {
        Self { kind, filters: Vec::new(), order: None, limit: None }
    }

    pub fn of<E: Entity>() -> Self {
        Self::new(E::KIND)
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| value.get(field) == Some(expected))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to encode {kind} entity: {source}")]
    Encode {
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to decode {kind} entity {key}: {source}")]
    Decode {
        kind: &'static str,
        key: Key,
        source: serde_json::Error,
    },
    #[error("batch of {len} keys exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },
    #[error("snapshot i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot format: {0}")]
    Snapshot(serde_json::Error),
}

/// The gateway contract. Implementations must apply `put_multi` and
/// `delete_multi` all-or-nothing and reject batches over [`MAX_BATCH`].
pub trait Datastore: Send + Sync {
    fn get(&self, kind: &str, key: &Key) -> Result<Option<Value>, StoreError>;

    fn get_multi(&self, kind: &str, keys: &[Key]) -> Result<Vec<Option<Value>>, StoreError>;

    /// Create or fully replace the entity under `key`.
    fn put(&self, kind: &str, key: Key, value: Value) -> Result<(), StoreError>;

    /// Store under a freshly allocated numeric key.
    fn insert(&self, kind: &str, value: Value) -> Result<Key, StoreError>;

    fn put_multi(&self, kind: &str, entries: Vec<(Key, Value)>) -> Result<(), StoreError>;

    fn query(&self, query: &Query) -> Result<Vec<(Key, Value)>, StoreError>;

    fn keys(&self, kind: &str) -> Result<Vec<Key>, StoreError>;

    fn delete_multi(&self, kind: &str, keys: &[Key]) -> Result<(), StoreError>;
}

/// A record type persisted under a fixed kind.
pub trait Entity: Serialize + DeserializeOwned {
    const KIND: &'static str;

    /// Copy storage-derived fields (e.g. the numeric id) onto a loaded entity.
    fn with_key(self, _key: &Key) -> Self {
        self
    }
}

/// Typed access over any [`Datastore`].
pub trait EntityExt {
    fn get_entity<E: Entity>(&self, key: &Key) -> Result<Option<E>, StoreError>;
    fn put_entity<E: Entity>(&self, key: Key, entity: &E) -> Result<(), StoreError>;
    fn insert_entity<E: Entity>(&self, entity: &E) -> Result<Key, StoreError>;
    fn put_entities<E: Entity>(&self, entries: Vec<(Key, E)>) -> Result<(), StoreError>;
    fn query_keyed<E: Entity>(&self, query: &Query) -> Result<Vec<(Key, E)>, StoreError>;

    fn query_entities<E: Entity>(&self, query: &Query) -> Result<Vec<E>, StoreError> {
        Ok(self
            .query_keyed::<E>(query)?
            .into_iter()
            .map(|(_, entity)| entity)
            .collect())
    }
}

impl<S: Datastore + ?Sized> EntityExt for S {
    fn get_entity<E: Entity>(&self, key: &Key) -> Result<Option<E>, StoreError> {
        self.get(E::KIND, key)?
            .map(|value| decode::<E>(key, value))
            .transpose()
    }

    fn put_entity<E: Entity>(&self, key: Key, entity: &E) -> Result<(), StoreError> {
        self.put(E::KIND, key, encode(entity)?)
    }

    fn insert_entity<E: Entity>(&self, entity: &E) -> Result<Key, StoreError> {
        self.insert(E::KIND, encode(entity)?)
    }

    fn put_entities<E: Entity>(&self, entries: Vec<(Key, E)>) -> Result<(), StoreError> {
        let encoded = entries
            .into_iter()
            .map(|(key, entity)| encode(&entity).map(|value| (key, value)))
            .collect::<Result<Vec<_>, _>>()?;
        self.put_multi(E::KIND, encoded)
    }

    fn query_keyed<E: Entity>(&self, query: &Query) -> Result<Vec<(Key, E)>, StoreError> {
        self.query(query)?
            .into_iter()
            .map(|(key, value)| decode::<E>(&key, value).map(|entity| (key, entity)))
            .collect()
    }
}

fn encode<E: Entity>(entity: &E) -> Result<Value, StoreError> {
    serde_json::to_value(entity).map_err(|source| StoreError::Encode { kind: E::KIND, source })
}

fn decode<E: Entity>(key: &Key, value: Value) -> Result<E, StoreError> {
    serde_json::from_value::<E>(value)
        .map(|entity| entity.with_key(key))
        .map_err(|source| StoreError::Decode { kind: E::KIND, key: key.clone(), source })
}

/// Ordering used for `order_by`: absent sorts first, numbers numerically,
/// RFC 3339 strings chronologically, other strings lexically.
pub(crate) fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (OffsetDateTime::parse(x, &Rfc3339), OffsetDateTime::parse(y, &Rfc3339)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
