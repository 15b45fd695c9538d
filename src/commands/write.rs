//! Write-path commands: `add`, `bulk_add`, `del`, `trimlength`

use crate::error::{EngineError, Result};
use crate::reply::Reply;
use crate::types::{is_valid_field_name, EntryId};

use super::CommandContext;

/// `add K ts field value [field value]...` - append one entry.
///
/// The field list must be even and non-empty; a duplicate or regressive id
/// is rejected by the collaborator.
pub(crate) fn add(ctx: &CommandContext<'_>) -> Result<Reply> {
    let args = ctx.args;
    if args.len() < 3 {
        return Err(EngineError::argument(
            "'add' requires a timestamp and at least one field/value pair",
        ));
    }
    if (args.len() - 1) % 2 != 0 {
        return Err(EngineError::argument(
            "'add' requires an even number of field/value tokens",
        ));
    }

    let id = EntryId::parse(args[0], 0)?;
    let mut fields = Vec::with_capacity((args.len() - 1) / 2);
    for pair in args[1..].chunks(2) {
        let name = pair[0];
        if !is_valid_field_name(name) {
            return Err(EngineError::argument(format!(
                "invalid field name '{}'",
                name
            )));
        }
        fields.push((name.to_string(), pair[1].to_string()));
    }

    ctx.store.append(ctx.key(), id, &fields)?;
    Ok(Reply::Bulk(id.to_string()))
}

/// `bulk_add K (ts json_record)...` - append many entries.
///
/// Each record is a JSON object of scalars; fields keep document order. The
/// batch is not atomic across entries, but each entry is: a failure aborts
/// the command with earlier appends in place.
pub(crate) fn bulk_add(ctx: &CommandContext<'_>) -> Result<Reply> {
    let args = ctx.args;
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(EngineError::argument(
            "'bulk_add' requires (timestamp, record) pairs",
        ));
    }

    let pairs = args.len() / 2;
    if pairs > ctx.config.max_bulk_entries {
        return Err(EngineError::ResourceLimit(ctx.config.max_bulk_entries));
    }

    let mut added = 0i64;
    for chunk in args.chunks(2) {
        let id = EntryId::parse(chunk[0], 0)?;
        let record: serde_json::Value = serde_json::from_str(chunk[1]).map_err(|e| {
            EngineError::Serialization(format!("invalid record for id {}: {}", id, e))
        })?;
        let object = record.as_object().ok_or_else(|| {
            EngineError::argument(format!("record for id {} must be a JSON object", id))
        })?;
        if object.is_empty() {
            return Err(EngineError::argument(format!(
                "record for id {} has no fields",
                id
            )));
        }

        let mut fields = Vec::with_capacity(object.len());
        for (name, value) in object {
            if !is_valid_field_name(name) {
                return Err(EngineError::argument(format!(
                    "invalid field name '{}'",
                    name
                )));
            }
            let text = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(EngineError::argument(format!(
                        "field '{}' of record {} is not a scalar",
                        name, id
                    )))
                }
            };
            fields.push((name.clone(), text));
        }

        ctx.store.append(ctx.key(), id, &fields)?;
        added += 1;
    }

    Ok(Reply::Int(added))
}

/// `del K id...` - delete entries by id, returning how many went away
pub(crate) fn del(ctx: &CommandContext<'_>) -> Result<Reply> {
    if ctx.args.is_empty() {
        return Err(EngineError::argument("'del' requires at least one entry id"));
    }
    let ids = ctx
        .args
        .iter()
        .map(|token| EntryId::parse(token, 0))
        .collect::<Result<Vec<_>>>()?;
    let removed = ctx.store.delete(ctx.key(), &ids)?;
    Ok(Reply::Int(removed as i64))
}

/// `trimlength K n [approximate]` - retain only the newest `n` entries
pub(crate) fn trimlength(ctx: &CommandContext<'_>) -> Result<Reply> {
    let args = ctx.args;
    if args.is_empty() || args.len() > 2 {
        return Err(EngineError::argument(
            "'trimlength' requires a length and an optional approximate flag",
        ));
    }

    let keep = args[0]
        .parse::<u64>()
        .map_err(|_| EngineError::argument(format!("invalid length '{}'", args[0])))?;

    let approximate = match args.get(1) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case("approximate") => true,
        Some(flag) => {
            return Err(EngineError::argument(format!(
                "unexpected token '{}', expected 'approximate'",
                flag
            )))
        }
    };

    let removed = ctx.store.trim_to(ctx.key(), keep, approximate)?;
    Ok(Reply::Int(removed as i64))
}
