//! Range pipeline
//!
//! Streams raw entries from the collaborator through filter and projection
//! in one pass:
//!
//! 1. scan the inclusive id range (capped by `LIMIT` when given),
//! 2. evaluate the compiled predicate against a transient by-name view,
//!    dropping non-matches,
//! 3. apply the projection, preserving field order.
//!
//! Nothing beyond the (cap-bounded) scan result is ever materialised. When
//! no `LIMIT` is present, the configured `max_result_entries` guard applies.

use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::query::QuerySpec;
use crate::store::SeriesStore;
use crate::types::Entry;

/// Run the scan → filter → projection pipeline for one key.
///
/// `reverse` selects the descending scan (`revrange`); the cap then applies
/// from the newest end.
pub fn fetch_range(
    store: &dyn SeriesStore,
    key: &str,
    spec: &QuerySpec,
    reverse: bool,
    config: &EngineConfig,
) -> Result<Vec<Entry>> {
    let lo = spec.min.resolve_min();
    let hi = spec.max.resolve_max();
    if lo > hi {
        return Ok(Vec::new());
    }

    let scanned = if reverse {
        store.scan_rev(key, lo, hi, spec.options.count)?
    } else {
        store.scan(key, lo, hi, spec.options.count)?
    };

    if spec.options.count.is_none() {
        if let Some(cap) = config.max_result_entries {
            if scanned.len() > cap {
                return Err(EngineError::ResourceLimit(cap));
            }
        }
    }

    let mut out = Vec::with_capacity(scanned.len());
    for entry in scanned {
        if let Some(predicate) = &spec.options.filter {
            let view: HashMap<&str, &str> = entry
                .fields
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect();
            if !predicate.matches(&view) {
                continue;
            }
        }

        let entry = if spec.options.projection.is_none() {
            entry
        } else {
            Entry::new(entry.id, spec.options.projection.apply(entry.fields))
        };
        out.push(entry);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{OptionMask, QuerySpec};
    use crate::store::{MemoryStore, SeriesStore};
    use crate::types::EntryId;

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let rows = [
            (1u64, "april", "high"),
            (2, "may", "low"),
            (3, "april", "low"),
            (4, "june", "high"),
        ];
        for (ts, name, rating) in rows {
            store
                .append(
                    "s",
                    EntryId::new(ts, 0),
                    &[
                        ("name".to_string(), name.to_string()),
                        ("rating".to_string(), rating.to_string()),
                    ],
                )
                .unwrap();
        }
        store
    }

    fn spec(args: &[&str]) -> QuerySpec {
        QuerySpec::parse("range", args, OptionMask::RANGE).unwrap()
    }

    #[test]
    fn test_plain_scan_in_order() {
        let store = seeded();
        let out = fetch_range(&store, "s", &spec(&["-", "+"]), false, &EngineConfig::default())
            .unwrap();
        let ids: Vec<u64> = out.iter().map(|e| e.id.ts).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_filter_drops_non_matches() {
        let store = seeded();
        let out = fetch_range(
            &store,
            "s",
            &spec(&["-", "+", "FILTER", "name=april", "AND", "rating=high"]),
            false,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id.ts, 1);
    }

    #[test]
    fn test_projection_applies_after_filter() {
        let store = seeded();
        let out = fetch_range(
            &store,
            "s",
            &spec(&["-", "+", "FILTER", "rating=high", "LABELS", "name"]),
            false,
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        for entry in &out {
            assert_eq!(entry.fields.len(), 1);
            assert_eq!(entry.fields[0].0, "name");
        }
    }

    #[test]
    fn test_reverse_scan() {
        let store = seeded();
        let out = fetch_range(
            &store,
            "s",
            &spec(&["-", "+", "LIMIT", "2"]),
            true,
            &EngineConfig::default(),
        )
        .unwrap();
        let ids: Vec<u64> = out.iter().map(|e| e.id.ts).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[test]
    fn test_inverted_bounds_yield_empty() {
        let store = seeded();
        let out = fetch_range(
            &store,
            "s",
            &spec(&["9", "1"]),
            false,
            &EngineConfig::default(),
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_result_cap_guard() {
        let store = seeded();
        let config = EngineConfig {
            max_result_entries: Some(2),
            ..Default::default()
        };
        let err = fetch_range(&store, "s", &spec(&["-", "+"]), false, &config).unwrap_err();
        assert!(matches!(err, EngineError::ResourceLimit(2)));

        // an explicit LIMIT stays within the cap's intent and is exempt
        let out = fetch_range(&store, "s", &spec(&["-", "+", "LIMIT", "3"]), false, &config)
            .unwrap();
        assert_eq!(out.len(), 3);
    }
}
