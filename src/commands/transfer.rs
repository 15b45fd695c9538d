//! Materialising commands: `copy` and `merge`
//!
//! Both are best-effort append-only: an error mid-write leaves the
//! destination with whatever was written before it. Callers are expected to
//! use a fresh destination key.

use tracing::debug;

use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::merge::merge_entries;
use crate::pipeline::fetch_range;
use crate::query::{OptionMask, QuerySpec};
use crate::reply::Reply;
use crate::sink::{Sink, SinkKind};

use super::CommandContext;

/// `copy K_src K_dst min max [opts]` - filtered / projected / aggregated
/// copy into a stream or hash sink; replies with the number of entries (or
/// buckets) written
pub(crate) fn copy(ctx: &CommandContext<'_>) -> Result<Reply> {
    let source = ctx.keys[0];
    let dest = ctx.keys[1];

    let spec = QuerySpec::parse("copy", ctx.args, OptionMask::COPY)?;
    let entries = fetch_range(ctx.store, source, &spec, false, ctx.config)?;
    let sink = Sink::new(
        ctx.store,
        dest,
        spec.options.storage.unwrap_or(SinkKind::Stream),
    );

    let written = match &spec.options.aggregate {
        Some(aggregate) => {
            let mut aggregator = Aggregator::new(aggregate);
            for entry in &entries {
                aggregator.observe(entry);
            }
            let buckets = aggregator.finish();
            for bucket in &buckets {
                sink.write_bucket(bucket)?;
            }
            buckets.len()
        }
        None => {
            for entry in &entries {
                sink.write_entry(entry)?;
            }
            entries.len()
        }
    };

    debug!(source, dest, written, "copy complete");
    Ok(Reply::Int(written as i64))
}

/// `merge K_a K_b K_dst min max [opts]` - two-pointer ordered merge of the
/// filtered / projected ranges of both sources into a destination stream;
/// duplicate ids keep the left source's entry
pub(crate) fn merge(ctx: &CommandContext<'_>) -> Result<Reply> {
    let left_key = ctx.keys[0];
    let right_key = ctx.keys[1];
    let dest = ctx.keys[2];

    let spec = QuerySpec::parse("merge", ctx.args, OptionMask::MERGE)?;
    let left = fetch_range(ctx.store, left_key, &spec, false, ctx.config)?;
    let right = fetch_range(ctx.store, right_key, &spec, false, ctx.config)?;

    let merged = merge_entries(left, right);
    let sink = Sink::new(ctx.store, dest, SinkKind::Stream);
    for entry in &merged {
        sink.write_entry(entry)?;
    }

    debug!(
        left = left_key,
        right = right_key,
        dest,
        written = merged.len(),
        "merge complete"
    );
    Ok(Reply::Int(merged.len() as i64))
}
