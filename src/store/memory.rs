//! In-memory reference implementation of the stream store
//!
//! Streams are `BTreeMap<EntryId, fields>` per key, so ordered scans fall out
//! of the map's range iterators. A `parking_lot::RwLock` guards the whole
//! store; the engine itself is sequential per invocation, the lock makes the
//! store usable from multi-threaded embedders.
//!
//! A stream whose last entry is removed (by delete or trim) disappears
//! entirely: `len` and `describe` report absence, matching the series
//! lifecycle where mutations down to zero return the key to the empty state.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::error::StoreError;
use crate::types::{Entry, EntryId};

use super::{SeriesStore, StreamInfo};

type Fields = Vec<(String, String)>;

#[derive(Default)]
struct Shared {
    streams: HashMap<String, BTreeMap<EntryId, Fields>>,
    hashes: HashMap<String, BTreeMap<String, String>>,
}

/// Thread-safe in-memory stream store
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Shared>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back one hash field (test and inspection helper; the engine only
    /// ever writes hashes)
    pub fn hash_field(&self, key: &str, field: &str) -> Option<String> {
        self.inner
            .read()
            .hashes
            .get(key)
            .and_then(|h| h.get(field).cloned())
    }

    /// Number of fields in a hash key, or `None` when absent
    pub fn hash_len(&self, key: &str) -> Option<usize> {
        self.inner.read().hashes.get(key).map(|h| h.len())
    }
}

impl SeriesStore for MemoryStore {
    fn append(
        &self,
        key: &str,
        id: EntryId,
        fields: &[(String, String)],
    ) -> Result<(), StoreError> {
        let mut shared = self.inner.write();
        let stream = shared.streams.entry(key.to_string()).or_default();

        if let Some((&last, _)) = stream.iter().next_back() {
            if id <= last {
                return Err(StoreError::IdRegression {
                    key: key.to_string(),
                    last,
                    attempted: id,
                });
            }
        }

        stream.insert(id, fields.to_vec());
        Ok(())
    }

    fn scan(
        &self,
        key: &str,
        min: EntryId,
        max: EntryId,
        count: Option<usize>,
    ) -> Result<Vec<Entry>, StoreError> {
        if min > max {
            return Ok(Vec::new());
        }
        let shared = self.inner.read();
        let Some(stream) = shared.streams.get(key) else {
            return Ok(Vec::new());
        };
        let cap = count.unwrap_or(usize::MAX);
        Ok(stream
            .range(min..=max)
            .take(cap)
            .map(|(id, fields)| Entry::new(*id, fields.clone()))
            .collect())
    }

    fn scan_rev(
        &self,
        key: &str,
        min: EntryId,
        max: EntryId,
        count: Option<usize>,
    ) -> Result<Vec<Entry>, StoreError> {
        if min > max {
            return Ok(Vec::new());
        }
        let shared = self.inner.read();
        let Some(stream) = shared.streams.get(key) else {
            return Ok(Vec::new());
        };
        let cap = count.unwrap_or(usize::MAX);
        Ok(stream
            .range(min..=max)
            .rev()
            .take(cap)
            .map(|(id, fields)| Entry::new(*id, fields.clone()))
            .collect())
    }

    fn lookup(&self, key: &str, id: EntryId) -> Result<Vec<Entry>, StoreError> {
        let shared = self.inner.read();
        Ok(shared
            .streams
            .get(key)
            .and_then(|stream| stream.get(&id))
            .map(|fields| vec![Entry::new(id, fields.clone())])
            .unwrap_or_default())
    }

    fn delete(&self, key: &str, ids: &[EntryId]) -> Result<u64, StoreError> {
        let mut shared = self.inner.write();
        let Some(stream) = shared.streams.get_mut(key) else {
            return Ok(0);
        };
        let mut removed = 0;
        for id in ids {
            if stream.remove(id).is_some() {
                removed += 1;
            }
        }
        if stream.is_empty() {
            shared.streams.remove(key);
        }
        Ok(removed)
    }

    fn len(&self, key: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .inner
            .read()
            .streams
            .get(key)
            .map(|s| s.len() as u64))
    }

    fn trim_to(&self, key: &str, keep: u64, _approximate: bool) -> Result<u64, StoreError> {
        // exact trim; the approximate flag is a backend latitude this
        // implementation does not need
        let mut shared = self.inner.write();
        let Some(stream) = shared.streams.get_mut(key) else {
            return Ok(0);
        };
        let len = stream.len() as u64;
        if len <= keep {
            return Ok(0);
        }
        let excess = (len - keep) as usize;
        let victims: Vec<EntryId> = stream.keys().take(excess).copied().collect();
        for id in &victims {
            stream.remove(id);
        }
        if stream.is_empty() {
            shared.streams.remove(key);
        }
        Ok(victims.len() as u64)
    }

    fn describe(&self, key: &str) -> Result<Option<StreamInfo>, StoreError> {
        let shared = self.inner.read();
        let Some(stream) = shared.streams.get(key) else {
            return Ok(None);
        };
        let (first, last) = match (stream.keys().next(), stream.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(None),
        };
        Ok(Some(StreamInfo {
            length: stream.len() as u64,
            first,
            last,
        }))
    }

    fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .write()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }
}
