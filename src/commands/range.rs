//! Range commands: `range`, `revrange`, `poprange`, `remrange`

use crate::aggregate::Aggregator;
use crate::error::Result;
use crate::pipeline::fetch_range;
use crate::query::{OptionMask, QuerySpec};
use crate::reply::{buckets_reply, entries_reply, Reply};
use crate::types::{Entry, EntryId};

use super::CommandContext;

/// `range K min max [opts]` - ordered ascending slice
pub(crate) fn range(ctx: &CommandContext<'_>) -> Result<Reply> {
    let spec = QuerySpec::parse("range", ctx.args, OptionMask::RANGE)?;
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;
    shape(&spec, &entries)
}

/// `revrange K min max [opts]` - as `range`, scanned newest-first
pub(crate) fn revrange(ctx: &CommandContext<'_>) -> Result<Reply> {
    let spec = QuerySpec::parse("revrange", ctx.args, OptionMask::RANGE)?;
    let entries = fetch_range(ctx.store, ctx.key(), &spec, true, ctx.config)?;
    shape(&spec, &entries)
}

/// `poprange K min max [opts]` - as `range`, then delete the matched ids
pub(crate) fn poprange(ctx: &CommandContext<'_>) -> Result<Reply> {
    let spec = QuerySpec::parse("poprange", ctx.args, OptionMask::RANGE)?;
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;
    let reply = shape(&spec, &entries)?;

    let ids: Vec<EntryId> = entries.iter().map(|entry| entry.id).collect();
    ctx.store.delete(ctx.key(), &ids)?;
    Ok(reply)
}

/// `remrange K min max [opts]` - delete the matched ids, reply with the count
pub(crate) fn remrange(ctx: &CommandContext<'_>) -> Result<Reply> {
    let spec = QuerySpec::parse("remrange", ctx.args, OptionMask::REMRANGE)?;
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;

    let ids: Vec<EntryId> = entries.iter().map(|entry| entry.id).collect();
    let removed = ctx.store.delete(ctx.key(), &ids)?;
    Ok(Reply::Int(removed as i64))
}

/// Aggregate when the spec asks for it, otherwise shape the raw entries.
/// Buckets ascend by key regardless of scan direction.
fn shape(spec: &QuerySpec, entries: &[Entry]) -> Result<Reply> {
    match &spec.options.aggregate {
        Some(aggregate) => {
            let mut aggregator = Aggregator::new(aggregate);
            for entry in entries {
                aggregator.observe(entry);
            }
            buckets_reply(&aggregator.finish(), spec.options.format)
        }
        None => entries_reply(entries, spec.options.format),
    }
}
