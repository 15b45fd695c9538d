//! Read-path commands: `get`, `pop`, `size`, `exists`, `span`, `info`,
//! `count`, `times`

use crate::error::{EngineError, Result};
use crate::pipeline::fetch_range;
use crate::query::{OptionMask, QueryOptions, QuerySpec};
use crate::reply::{record_reply, Reply};
use crate::types::{EntryId, RangeBound};

use super::{point_lookup, CommandContext};

/// `size K` - entry count, null when the key is absent
pub(crate) fn size(ctx: &CommandContext<'_>) -> Result<Reply> {
    expect_no_args(ctx, "size")?;
    Ok(match ctx.store.len(ctx.key())? {
        Some(n) => Reply::Int(n as i64),
        None => Reply::Null,
    })
}

/// `exists K ts` - 1 when an entry with that id exists, 0 otherwise
pub(crate) fn exists(ctx: &CommandContext<'_>) -> Result<Reply> {
    if ctx.args.len() != 1 {
        return Err(EngineError::argument("'exists' requires exactly one id"));
    }
    let id = EntryId::parse(ctx.args[0], 0)?;
    let found = point_lookup(ctx.store, ctx.key(), id)?;
    Ok(Reply::Int(i64::from(found.is_some())))
}

/// `span K` - `[first_id, last_id]`, null when the key is absent
pub(crate) fn span(ctx: &CommandContext<'_>) -> Result<Reply> {
    expect_no_args(ctx, "span")?;
    Ok(match ctx.store.describe(ctx.key())? {
        Some(info) => Reply::Array(vec![
            Reply::Bulk(info.first.to_string()),
            Reply::Bulk(info.last.to_string()),
        ]),
        None => Reply::Null,
    })
}

/// `info K` - flat metadata passthrough, null when the key is absent
pub(crate) fn info(ctx: &CommandContext<'_>) -> Result<Reply> {
    expect_no_args(ctx, "info")?;
    Ok(match ctx.store.describe(ctx.key())? {
        Some(info) => Reply::Array(vec![
            Reply::Bulk("length".to_string()),
            Reply::Int(info.length as i64),
            Reply::Bulk("first_id".to_string()),
            Reply::Bulk(info.first.to_string()),
            Reply::Bulk("last_id".to_string()),
            Reply::Bulk(info.last.to_string()),
        ]),
        None => Reply::Null,
    })
}

/// `get K ts [LABELS...|REDACT...] [FORMAT json]` - point lookup
pub(crate) fn get(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (id, options) = point_query("get", ctx)?;
    match point_lookup(ctx.store, ctx.key(), id)? {
        Some(entry) => {
            let fields = options.projection.apply(entry.fields);
            record_reply(&fields, options.format)
        }
        None => Ok(Reply::Null),
    }
}

/// `pop K ts [opts]` - as `get`, then delete the id
pub(crate) fn pop(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (id, options) = point_query("pop", ctx)?;
    match point_lookup(ctx.store, ctx.key(), id)? {
        Some(entry) => {
            let fields = options.projection.apply(entry.fields);
            let reply = record_reply(&fields, options.format)?;
            ctx.store.delete(ctx.key(), &[id])?;
            Ok(reply)
        }
        None => Ok(Reply::Null),
    }
}

/// `count K min max [FILTER ...]` - number of matching entries
pub(crate) fn count(ctx: &CommandContext<'_>) -> Result<Reply> {
    let spec = QuerySpec::parse("count", ctx.args, OptionMask::COUNT)?;
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;
    Ok(Reply::Int(entries.len() as i64))
}

/// `times K [min max]` - list of formatted entry ids
pub(crate) fn times(ctx: &CommandContext<'_>) -> Result<Reply> {
    let (min, max) = match ctx.args {
        [] => (RangeBound::Min, RangeBound::Max),
        [min_tok, max_tok] => (
            RangeBound::parse_min(min_tok)?,
            RangeBound::parse_max(max_tok)?,
        ),
        _ => {
            return Err(EngineError::argument(
                "'times' takes either no bounds or both min and max",
            ))
        }
    };

    let spec = QuerySpec {
        min,
        max,
        options: QueryOptions::default(),
    };
    let entries = fetch_range(ctx.store, ctx.key(), &spec, false, ctx.config)?;
    Ok(Reply::Array(
        entries
            .iter()
            .map(|entry| Reply::Bulk(entry.id.to_string()))
            .collect(),
    ))
}

fn point_query(
    command: &'static str,
    ctx: &CommandContext<'_>,
) -> Result<(EntryId, QueryOptions)> {
    if ctx.args.is_empty() {
        return Err(EngineError::argument(format!(
            "'{}' requires an entry id",
            command
        )));
    }
    let id = EntryId::parse(ctx.args[0], 0)?;
    let options = QueryOptions::parse(command, &ctx.args[1..], OptionMask::POINT)?;
    Ok((id, options))
}

fn expect_no_args(ctx: &CommandContext<'_>, command: &str) -> Result<()> {
    if !ctx.args.is_empty() {
        return Err(EngineError::argument(format!(
            "'{}' takes no arguments",
            command
        )));
    }
    Ok(())
}
