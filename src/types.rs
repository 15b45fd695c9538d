//! Core data types used throughout the engine
//!
//! # Key Types
//!
//! - **`EntryId`**: composite `(timestamp, sequence)` identifier of an entry
//! - **`Entry`**: a single entry: id plus an *ordered* list of field pairs
//! - **`RangeBound`**: one end of an inclusive range query (`-`, `+`, or id)
//!
//! Field lists are deliberately `Vec<(String, String)>` rather than a map:
//! insertion order is part of the data model and must survive projection and
//! output shaping. A by-name view is built transiently where a filter needs
//! one.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identifier of a stream entry.
///
/// Ids order lexicographically: first by `ts`, then by `seq`. The sequence
/// part disambiguates entries that collide on the same timestamp.
///
/// The textual form is `"<ts>-<seq>"`; a bare `"<ts>"` is accepted on input
/// with a context-dependent default sequence (0 for lower bounds and appends,
/// `u64::MAX` for upper bounds). The tokens `-` and `+` are reserved range
/// sentinels and never parse as ids.
///
/// # Example
///
/// ```rust
/// use streamts::types::EntryId;
///
/// let id = EntryId::parse("1700000000-3", 0).unwrap();
/// assert_eq!(id, EntryId::new(1_700_000_000, 3));
/// assert_eq!(id.to_string(), "1700000000-3");
///
/// // Bare timestamps take the supplied default sequence
/// let lo = EntryId::parse("1700000000", 0).unwrap();
/// assert_eq!(lo.seq, 0);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntryId {
    /// Non-negative timestamp component
    pub ts: u64,
    /// Sequence component, disambiguates same-timestamp entries
    pub seq: u64,
}

impl EntryId {
    /// Smallest possible id
    pub const MIN: EntryId = EntryId { ts: 0, seq: 0 };

    /// Largest possible id
    pub const MAX: EntryId = EntryId {
        ts: u64::MAX,
        seq: u64::MAX,
    };

    /// Create an id from its parts
    pub fn new(ts: u64, seq: u64) -> Self {
        Self { ts, seq }
    }

    /// Parse an id token, splitting on the first `-`.
    ///
    /// The left side must be a non-negative integer timestamp; the right
    /// side, when present, a non-negative integer sequence. A missing right
    /// side takes `default_seq`.
    pub fn parse(token: &str, default_seq: u64) -> Result<Self> {
        let (ts_part, seq_part) = match token.split_once('-') {
            Some((ts, seq)) => (ts, Some(seq)),
            None => (token, None),
        };

        let ts = ts_part
            .parse::<u64>()
            .map_err(|_| EngineError::argument(format!("invalid entry id '{}'", token)))?;

        let seq = match seq_part {
            None => default_seq,
            Some(s) => s
                .parse::<u64>()
                .map_err(|_| EngineError::argument(format!("invalid entry id '{}'", token)))?,
        };

        Ok(Self { ts, seq })
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ts, self.seq)
    }
}

/// A single stream entry: composite id plus ordered field pairs.
///
/// Values are raw text; interpretation is deferred to query time (see
/// [`crate::value::Value`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Composite id of the entry
    pub id: EntryId,
    /// Ordered `(name, raw_value)` pairs
    pub fields: Vec<(String, String)>,
}

impl Entry {
    /// Create an entry from an id and field pairs
    pub fn new(id: EntryId, fields: Vec<(String, String)>) -> Self {
        Self { id, fields }
    }

    /// Look up a field value by name (first match wins)
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One end of an inclusive range query.
///
/// `-` selects the lowest possible id, `+` the highest; anything else is a
/// composite id token. Bare timestamps resolve with sequence 0 on the lower
/// end and `u64::MAX` on the upper end, so a bare `ts` bound covers every
/// entry at that timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    /// The `-` sentinel: lowest possible id
    Min,
    /// The `+` sentinel: highest possible id
    Max,
    /// An explicit composite id
    Id(EntryId),
}

impl RangeBound {
    /// Parse a lower-bound token (bare timestamps default to sequence 0)
    pub fn parse_min(token: &str) -> Result<Self> {
        Self::parse(token, 0)
    }

    /// Parse an upper-bound token (bare timestamps default to the maximum
    /// sequence)
    pub fn parse_max(token: &str) -> Result<Self> {
        Self::parse(token, u64::MAX)
    }

    fn parse(token: &str, default_seq: u64) -> Result<Self> {
        match token {
            "-" => Ok(RangeBound::Min),
            "+" => Ok(RangeBound::Max),
            _ => Ok(RangeBound::Id(EntryId::parse(token, default_seq)?)),
        }
    }

    /// Resolve to a concrete id when used as a lower bound
    pub fn resolve_min(&self) -> EntryId {
        match self {
            RangeBound::Min => EntryId::MIN,
            RangeBound::Max => EntryId::MAX,
            RangeBound::Id(id) => *id,
        }
    }

    /// Resolve to a concrete id when used as an upper bound
    pub fn resolve_max(&self) -> EntryId {
        match self {
            RangeBound::Min => EntryId::MIN,
            RangeBound::Max => EntryId::MAX,
            RangeBound::Id(id) => *id,
        }
    }
}

/// Validate a field name against the `[A-Za-z_][A-Za-z0-9_]*` token grammar.
///
/// The filter DSL tokenises on this shape, so names outside it are rejected
/// at write time rather than silently becoming unfilterable.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_ordering() {
        assert!(EntryId::new(1, 0) < EntryId::new(2, 0));
        assert!(EntryId::new(1, 0) < EntryId::new(1, 1));
        assert!(EntryId::new(1, 9) < EntryId::new(2, 0));
        assert_eq!(EntryId::new(3, 3), EntryId::new(3, 3));
    }

    #[test]
    fn test_id_parse_and_display() {
        let id = EntryId::parse("1000-5", 0).unwrap();
        assert_eq!(id, EntryId::new(1000, 5));
        assert_eq!(id.to_string(), "1000-5");

        let bare = EntryId::parse("1000", 7).unwrap();
        assert_eq!(bare, EntryId::new(1000, 7));
    }

    #[test]
    fn test_id_parse_rejects_garbage() {
        assert!(EntryId::parse("", 0).is_err());
        assert!(EntryId::parse("abc", 0).is_err());
        assert!(EntryId::parse("10-", 0).is_err());
        assert!(EntryId::parse("10-x", 0).is_err());
        assert!(EntryId::parse("-5", 0).is_err());
        assert!(EntryId::parse("1.5", 0).is_err());
    }

    #[test]
    fn test_range_bound_sentinels() {
        assert_eq!(RangeBound::parse_min("-").unwrap(), RangeBound::Min);
        assert_eq!(RangeBound::parse_max("+").unwrap(), RangeBound::Max);
        assert_eq!(RangeBound::Min.resolve_min(), EntryId::MIN);
        assert_eq!(RangeBound::Max.resolve_max(), EntryId::MAX);
    }

    #[test]
    fn test_range_bound_bare_timestamp_defaults() {
        let lo = RangeBound::parse_min("4000").unwrap();
        let hi = RangeBound::parse_max("4000").unwrap();
        assert_eq!(lo.resolve_min(), EntryId::new(4000, 0));
        assert_eq!(hi.resolve_max(), EntryId::new(4000, u64::MAX));
    }

    #[test]
    fn test_entry_field_lookup() {
        let entry = Entry::new(
            EntryId::new(1, 0),
            vec![
                ("name".to_string(), "april".to_string()),
                ("rating".to_string(), "high".to_string()),
            ],
        );
        assert_eq!(entry.field("rating"), Some("high"));
        assert_eq!(entry.field("missing"), None);
    }

    #[test]
    fn test_field_name_grammar() {
        assert!(is_valid_field_name("value"));
        assert!(is_valid_field_name("_hidden"));
        assert!(is_valid_field_name("cpu_usage_2"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("2fast"));
        assert!(!is_valid_field_name("with-dash"));
        assert!(!is_valid_field_name("with space"));
    }
}
