//! Incremental aggregation engine
//!
//! Entries are bucketed by `ts - ts % time_bucket` and each requested field
//! accumulates one [`FieldState`] per bucket. The state carries everything
//! the eleven aggregation kinds need - entry count, running sum, Welford
//! mean/variance, raw min/max, numeric min/max, first/last - and a buffered
//! value list only when a `median` was requested. Finalisation is per kind,
//! so one field requested under several kinds shares a single accumulator.
//!
//! Numeric semantics:
//!
//! - `count` increments on every entry regardless of coercibility
//! - `sum` treats non-numeric values as 0
//! - `avg`, `median`, `stdev`, `range` skip non-numeric values
//! - `min`/`max` compare numerically when both sides parse, lexicographically
//!   otherwise, and preserve the winning raw value
//! - `first`/`last` preserve the original textual form
//! - `rate` is `count / time_bucket`
//! - `stdev` is the sample deviation (`n − 1` divisor); fewer than two
//!   samples yield 0
//!
//! Buckets are always emitted in ascending bucket-key order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::Entry;
use crate::value::{parse_numeric, Value};

// ============================================================================
// Aggregation Kinds
// ============================================================================

/// Supported aggregation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    /// Number of entries in the bucket
    Count,
    /// Running sum (non-numeric as 0)
    Sum,
    /// Arithmetic mean (Welford)
    Avg,
    /// Middle value (mean of the two middles for even counts)
    Median,
    /// Sample standard deviation
    Stdev,
    /// Smallest value
    Min,
    /// Largest value
    Max,
    /// `max − min` over numeric values
    Range,
    /// First non-null value of the bucket
    First,
    /// Last value seen in the bucket
    Last,
    /// Entries per time unit: `count / time_bucket`
    Rate,
}

impl AggregateKind {
    /// Parse a kind name case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateKind::Count),
            "sum" => Some(AggregateKind::Sum),
            "avg" => Some(AggregateKind::Avg),
            "median" => Some(AggregateKind::Median),
            "stdev" => Some(AggregateKind::Stdev),
            "min" => Some(AggregateKind::Min),
            "max" => Some(AggregateKind::Max),
            "range" => Some(AggregateKind::Range),
            "first" => Some(AggregateKind::First),
            "last" => Some(AggregateKind::Last),
            "rate" => Some(AggregateKind::Rate),
            _ => None,
        }
    }

    /// Canonical lower-case name
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Median => "median",
            AggregateKind::Stdev => "stdev",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
            AggregateKind::Range => "range",
            AggregateKind::First => "first",
            AggregateKind::Last => "last",
            AggregateKind::Rate => "rate",
        }
    }

    fn needs_buffer(&self) -> bool {
        matches!(self, AggregateKind::Median)
    }
}

/// Compiled `AGGREGATION bucket kind(field)+` plan
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    /// Bucket width; bucket key is `ts - ts % time_bucket`
    pub time_bucket: u64,
    /// Requested `(field, kind)` pairs in query order
    pub fields: Vec<(String, AggregateKind)>,
}

// ============================================================================
// Per-Bucket Field State
// ============================================================================

/// Incremental accumulator for one field inside one bucket.
///
/// Also reused outside bucketing for whole-range statistics.
#[derive(Debug, Clone)]
pub(crate) struct FieldState {
    entries: u64,
    sum: f64,
    numeric_count: u64,
    mean: f64,
    m2: f64,
    values: Option<Vec<f64>>,
    min_raw: Option<String>,
    max_raw: Option<String>,
    min_num: Option<f64>,
    max_num: Option<f64>,
    first: Option<String>,
    last: Option<String>,
}

impl FieldState {
    /// `buffer` opts in to keeping every numeric value (median needs it)
    pub(crate) fn new(buffer: bool) -> Self {
        Self {
            entries: 0,
            sum: 0.0,
            numeric_count: 0,
            mean: 0.0,
            m2: 0.0,
            values: buffer.then(Vec::new),
            min_raw: None,
            max_raw: None,
            min_num: None,
            max_num: None,
            first: None,
            last: None,
        }
    }

    /// Fold in one entry's value for this field (`None` when the entry has
    /// no such field; the entry still counts)
    pub(crate) fn update(&mut self, raw: Option<&str>) {
        self.entries += 1;
        let Some(raw) = raw else {
            return;
        };

        if self.first.is_none() {
            self.first = Some(raw.to_string());
        }
        self.last = Some(raw.to_string());

        match &self.min_raw {
            Some(current) if raw_cmp(raw, current) != Ordering::Less => {}
            _ => self.min_raw = Some(raw.to_string()),
        }
        match &self.max_raw {
            Some(current) if raw_cmp(raw, current) != Ordering::Greater => {}
            _ => self.max_raw = Some(raw.to_string()),
        }

        if let Some(x) = parse_numeric(raw) {
            self.sum += x;
            self.numeric_count += 1;

            // Welford's online update
            let delta = x - self.mean;
            self.mean += delta / self.numeric_count as f64;
            let delta2 = x - self.mean;
            self.m2 += delta * delta2;

            self.min_num = Some(self.min_num.map_or(x, |m| m.min(x)));
            self.max_num = Some(self.max_num.map_or(x, |m| m.max(x)));

            if let Some(buf) = &mut self.values {
                buf.push(x);
            }
        }
    }

    /// Finalise one kind; `None` when the accumulator saw nothing usable
    pub(crate) fn finalize(&self, kind: AggregateKind, time_bucket: u64) -> Option<Value> {
        match kind {
            AggregateKind::Count => Some(Value::Int(self.entries as i64)),
            AggregateKind::Sum => Some(Value::from_f64(self.sum)),
            AggregateKind::Avg => {
                (self.numeric_count > 0).then(|| Value::from_f64(self.mean))
            }
            AggregateKind::Median => {
                let buf = self.values.as_ref()?;
                if buf.is_empty() {
                    return None;
                }
                let mut sorted = buf.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let n = sorted.len();
                let mid = if n % 2 == 1 {
                    sorted[n / 2]
                } else {
                    (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
                };
                Some(Value::from_f64(mid))
            }
            AggregateKind::Stdev => {
                if self.numeric_count < 2 {
                    return Some(Value::from_f64(0.0));
                }
                let variance = self.m2 / (self.numeric_count - 1) as f64;
                Some(Value::from_f64(variance.sqrt()))
            }
            AggregateKind::Min => self.min_raw.as_deref().map(Value::coerce),
            AggregateKind::Max => self.max_raw.as_deref().map(Value::coerce),
            AggregateKind::Range => match (self.min_num, self.max_num) {
                (Some(lo), Some(hi)) => Some(Value::from_f64(hi - lo)),
                _ => None,
            },
            AggregateKind::First => self.first.as_deref().map(Value::coerce),
            AggregateKind::Last => self.last.as_deref().map(Value::coerce),
            AggregateKind::Rate => {
                Some(Value::from_f64(self.entries as f64 / time_bucket as f64))
            }
        }
    }
}

/// Numeric comparison when both sides parse, lexicographic otherwise
fn raw_cmp(a: &str, b: &str) -> Ordering {
    match (parse_numeric(a), parse_numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

// ============================================================================
// Aggregator
// ============================================================================

struct FieldPlan {
    name: String,
    kinds: Vec<AggregateKind>,
    buffer: bool,
}

/// One finalised output field of a bucket: `(kind, value)` in query order
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedField {
    /// Field name
    pub name: String,
    /// Finalised `(kind, value)` pairs; `None` marks an empty accumulator
    pub outputs: Vec<(AggregateKind, Option<Value>)>,
}

/// One finalised bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRow {
    /// Bucket key: the floored timestamp itself
    pub key: u64,
    /// Per-field outputs, one slot per distinct requested field
    pub fields: Vec<AggregatedField>,
}

/// Streaming bucketed aggregator over pipeline output
pub struct Aggregator {
    time_bucket: u64,
    plan: Vec<FieldPlan>,
    buckets: BTreeMap<u64, Vec<FieldState>>,
}

impl Aggregator {
    /// Build an aggregator from a compiled spec.
    ///
    /// Fields requested under several kinds share one accumulator slot; the
    /// distinct-field order follows first occurrence in the spec.
    pub fn new(spec: &AggregateSpec) -> Self {
        let mut plan: Vec<FieldPlan> = Vec::new();
        for (name, kind) in &spec.fields {
            match plan.iter_mut().find(|p| &p.name == name) {
                Some(existing) => {
                    existing.kinds.push(*kind);
                    existing.buffer |= kind.needs_buffer();
                }
                None => plan.push(FieldPlan {
                    name: name.clone(),
                    kinds: vec![*kind],
                    buffer: kind.needs_buffer(),
                }),
            }
        }
        Self {
            time_bucket: spec.time_bucket,
            plan,
            buckets: BTreeMap::new(),
        }
    }

    /// Fold one entry into its bucket
    pub fn observe(&mut self, entry: &Entry) {
        let key = entry.id.ts - entry.id.ts % self.time_bucket;
        let plan = &self.plan;
        let states = self
            .buckets
            .entry(key)
            .or_insert_with(|| plan.iter().map(|p| FieldState::new(p.buffer)).collect());
        for (state, field) in states.iter_mut().zip(plan.iter()) {
            state.update(entry.field(&field.name));
        }
    }

    /// Finalise all buckets in ascending key order
    pub fn finish(self) -> Vec<BucketRow> {
        let time_bucket = self.time_bucket;
        let plan = self.plan;
        self.buckets
            .into_iter()
            .map(|(key, states)| BucketRow {
                key,
                fields: plan
                    .iter()
                    .zip(states.iter())
                    .map(|(field, state)| AggregatedField {
                        name: field.name.clone(),
                        outputs: field
                            .kinds
                            .iter()
                            .map(|kind| (*kind, state.finalize(*kind, time_bucket)))
                            .collect(),
                    })
                    .collect(),
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
