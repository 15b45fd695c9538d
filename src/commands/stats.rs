//! Group-by-field commands: `distinct`, `count_distinct`, `basic_stats`
//!
//! All three aggregate over the values of the selected labels across a
//! range. `LABELS` is mandatory here: it names the fields to group on (and
//! doubles as the projection, so the pipeline only carries those fields).
//! Distinct values are reported in first-seen order.

use crate::aggregate::{AggregateKind, FieldState};
use crate::error::{EngineError, Result};
use crate::pipeline::fetch_range;
use crate::query::{OptionMask, Projection, QuerySpec};
use crate::reply::Reply;
use crate::types::Entry;

use super::CommandContext;

/// `distinct K min max LABELS name+ [FILTER ...] [LIMIT ...]` - per label, the
/// distinct raw values seen in the range
pub(crate) fn distinct(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (labels, entries) = grouped_input("distinct", ctx)?;

    let mut out = Vec::with_capacity(labels.len() * 2);
    for label in &labels {
        let values = distinct_values(&entries, label);
        out.push(Reply::Bulk(label.clone()));
        out.push(Reply::Array(
            values.into_iter().map(|(v, _)| Reply::Bulk(v)).collect(),
        ));
    }
    Ok(Reply::Array(out))
}

/// `count_distinct K min max LABELS name+ [opts]` - per label, each distinct
/// value with its occurrence count
pub(crate) fn count_distinct(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (labels, entries) = grouped_input("count_distinct", ctx)?;

    let mut out = Vec::with_capacity(labels.len() * 2);
    for label in &labels {
        let values = distinct_values(&entries, label);
        let mut pairs = Vec::with_capacity(values.len() * 2);
        for (value, occurrences) in values {
            pairs.push(Reply::Bulk(value));
            pairs.push(Reply::Int(occurrences));
        }
        out.push(Reply::Bulk(label.clone()));
        out.push(Reply::Array(pairs));
    }
    Ok(Reply::Array(out))
}

const BASIC_STATS_KINDS: [AggregateKind; 6] = [
    AggregateKind::Count,
    AggregateKind::Min,
    AggregateKind::Max,
    AggregateKind::Sum,
    AggregateKind::Avg,
    AggregateKind::Stdev,
];

/// `basic_stats K min max LABELS name+ [opts]` - per label, whole-range
/// count/min/max/sum/avg/stdev over its values
pub(crate) fn basic_stats(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (labels, entries) = grouped_input("basic_stats", ctx)?;

    let mut out = Vec::with_capacity(labels.len() * 2);
    for label in &labels {
        let mut state = FieldState::new(false);
        for entry in &entries {
            state.update(entry.field(label));
        }

        let mut pairs = Vec::with_capacity(BASIC_STATS_KINDS.len() * 2);
        for kind in BASIC_STATS_KINDS {
            pairs.push(Reply::Bulk(kind.name().to_string()));
            pairs.push(match state.finalize(kind, 1) {
                Some(value) => Reply::from_value(&value),
                None => Reply::Null,
            });
        }
        out.push(Reply::Bulk(label.clone()));
        out.push(Reply::Array(pairs));
    }
    Ok(Reply::Array(out))
}

/// Parse the shared `min max LABELS name+ [FILTER ...] [LIMIT ...]` tail and run
/// the pipeline; LABELS is mandatory and becomes the label list
fn grouped_input(
    command: &'static str,
    ctx: &CommandContext<'_>,
) -> Result<(Vec<String>, Vec<Entry>)> {
    let spec = QuerySpec::parse(command, ctx.args, OptionMask::GROUPED)?;
    let labels = match &spec.options.projection {
        Projection::Include(names) => names.clone(),
        _ => {
            return Err(EngineError::argument(format!(
                "'{}' requires LABELS",
                command
            )))
        }
    };
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;
    Ok((labels, entries))
}

/// Distinct raw values of one label with occurrence counts, first-seen order
fn distinct_values(entries: &[Entry], label: &str) -> Vec<(String, i64)> {
    let mut values: Vec<(String, i64)> = Vec::new();
    for entry in entries {
        let Some(raw) = entry.field(label) else {
            continue;
        };
        match values.iter_mut().find(|(v, _)| v == raw) {
            Some((_, occurrences)) => *occurrences += 1,
            None => values.push((raw.to_string(), 1)),
        }
    }
    values
}
