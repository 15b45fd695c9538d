//! Store writers for `copy` and `merge`
//!
//! Results are materialised either as new stream entries or as fields of a
//! keyed hash:
//!
//! - the **stream sink** appends entries under their original ids, and
//!   aggregated buckets under `(bucket_key, 0)` with the per-field outputs
//!   flattened to `field_kind` names;
//! - the **hash sink** stores each payload as JSON text, keyed by the
//!   formatted entry id (so same-timestamp sequences cannot collide) or by
//!   the bucket key.

use crate::aggregate::BucketRow;
use crate::error::Result;
use crate::reply::record_json;
use crate::store::SeriesStore;
use crate::types::{Entry, EntryId};

/// Destination shape for materialised results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Append to a destination stream (`STORAGE timeseries`)
    Stream,
    /// Write JSON payloads into a keyed hash (`STORAGE hash`)
    Hash,
}

/// Writer over the collaborator for one destination key
pub struct Sink<'a> {
    store: &'a dyn SeriesStore,
    dest: &'a str,
    kind: SinkKind,
}

impl<'a> Sink<'a> {
    /// Create a sink for `dest`
    pub fn new(store: &'a dyn SeriesStore, dest: &'a str, kind: SinkKind) -> Self {
        Self { store, dest, kind }
    }

    /// Write one entry (plain copy / merge output)
    pub fn write_entry(&self, entry: &Entry) -> Result<()> {
        match self.kind {
            SinkKind::Stream => {
                self.store.append(self.dest, entry.id, &entry.fields)?;
            }
            SinkKind::Hash => {
                let payload = serde_json::to_string(&record_json(&entry.fields))
                    .map_err(|e| crate::error::EngineError::Serialization(e.to_string()))?;
                self.store
                    .hash_set(self.dest, &entry.id.to_string(), &payload)?;
            }
        }
        Ok(())
    }

    /// Write one aggregated bucket, flattening `field → [kind, value...]`
    /// groupings into `field_kind` names. Empty accumulators are skipped.
    pub fn write_bucket(&self, row: &BucketRow) -> Result<()> {
        match self.kind {
            SinkKind::Stream => {
                let mut fields = Vec::new();
                for field in &row.fields {
                    for (kind, value) in &field.outputs {
                        if let Some(v) = value {
                            fields.push((
                                format!("{}_{}", field.name, kind.name()),
                                v.to_string(),
                            ));
                        }
                    }
                }
                self.store
                    .append(self.dest, EntryId::new(row.key, 0), &fields)?;
            }
            SinkKind::Hash => {
                let mut object = serde_json::Map::new();
                for field in &row.fields {
                    for (kind, value) in &field.outputs {
                        if let Some(v) = value {
                            object.insert(
                                format!("{}_{}", field.name, kind.name()),
                                v.to_json(),
                            );
                        }
                    }
                }
                let payload = serde_json::to_string(&serde_json::Value::Object(object))
                    .map_err(|e| crate::error::EngineError::Serialization(e.to_string()))?;
                self.store
                    .hash_set(self.dest, &row.key.to_string(), &payload)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{AggregateKind, AggregatedField};
    use crate::store::MemoryStore;
    use crate::value::Value;

    fn sample_entry() -> Entry {
        Entry::new(
            EntryId::new(100, 2),
            vec![
                ("name".to_string(), "ada".to_string()),
                ("score".to_string(), "7".to_string()),
            ],
        )
    }

    #[test]
    fn test_stream_sink_preserves_ids_and_fields() {
        let store = MemoryStore::new();
        Sink::new(&store, "dst", SinkKind::Stream)
            .write_entry(&sample_entry())
            .unwrap();

        let copied = store
            .lookup("dst", EntryId::new(100, 2))
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(copied, sample_entry());
    }

    #[test]
    fn test_hash_sink_keys_by_full_id() {
        let store = MemoryStore::new();
        Sink::new(&store, "dst", SinkKind::Hash)
            .write_entry(&sample_entry())
            .unwrap();

        let payload = store.hash_field("dst", "100-2").expect("payload written");
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["name"], serde_json::json!("ada"));
        assert_eq!(parsed["score"], serde_json::json!(7));
    }

    #[test]
    fn test_bucket_flattening_uses_field_kind_names() {
        let row = BucketRow {
            key: 40,
            fields: vec![AggregatedField {
                name: "value".to_string(),
                outputs: vec![
                    (AggregateKind::Min, Some(Value::Int(423))),
                    (AggregateKind::Avg, Some(Value::Float("456.5".to_string()))),
                    (AggregateKind::Range, None),
                ],
            }],
        };

        let store = MemoryStore::new();
        Sink::new(&store, "dst", SinkKind::Stream)
            .write_bucket(&row)
            .unwrap();
        let entry = store
            .lookup("dst", EntryId::new(40, 0))
            .unwrap()
            .pop()
            .unwrap();
        assert_eq!(
            entry.fields,
            vec![
                ("value_min".to_string(), "423".to_string()),
                ("value_avg".to_string(), "456.5".to_string()),
            ]
        );

        let store = MemoryStore::new();
        Sink::new(&store, "dst", SinkKind::Hash)
            .write_bucket(&row)
            .unwrap();
        let payload = store.hash_field("dst", "40").expect("payload written");
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed["value_min"], serde_json::json!(423));
        assert_eq!(parsed["value_avg"], serde_json::json!(456.5));
    }
}
