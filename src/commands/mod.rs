//! Command dispatcher
//!
//! The command surface is a process-wide static table built at first use: a
//! case-preserving primary index over the canonical (lower-case) names and a
//! lazily built case-folded secondary index, so `RANGE`, `Range` and `range`
//! all resolve to the same handler.
//!
//! One invocation is `(keys..., command_name, args...)`. Key arity is fixed per
//! command: `copy` consumes two keys (source, destination), `merge` three
//! (two sources and a destination), everything else one. Argument validation
//! errors abort the command before any effect; partial effects of the
//! best-effort writers (`copy`, `merge`, `bulk_add`) are the caller's
//! concern, as the whole invocation runs as one atomic script at the
//! collaborator level.

mod range;
mod read;
mod stats;
mod transfer;
mod write;

use lazy_static::lazy_static;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::reply::Reply;
use crate::store::SeriesStore;
use crate::types::{Entry, EntryId};

/// Execution context handed to every command handler
pub(crate) struct CommandContext<'a> {
    pub(crate) store: &'a dyn SeriesStore,
    pub(crate) config: &'a EngineConfig,
    pub(crate) keys: &'a [&'a str],
    pub(crate) args: &'a [&'a str],
}

impl CommandContext<'_> {
    /// First key of the invocation (arity is validated before dispatch)
    pub(crate) fn key(&self) -> &str {
        self.keys[0]
    }
}

type Handler = fn(&CommandContext<'_>) -> Result<Reply>;

struct CommandSpec {
    name: &'static str,
    key_arity: usize,
    handler: Handler,
}

static COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "add", key_arity: 1, handler: write::add },
    CommandSpec { name: "bulk_add", key_arity: 1, handler: write::bulk_add },
    CommandSpec { name: "del", key_arity: 1, handler: write::del },
    CommandSpec { name: "trimlength", key_arity: 1, handler: write::trimlength },
    CommandSpec { name: "size", key_arity: 1, handler: read::size },
    CommandSpec { name: "exists", key_arity: 1, handler: read::exists },
    CommandSpec { name: "span", key_arity: 1, handler: read::span },
    CommandSpec { name: "info", key_arity: 1, handler: read::info },
    CommandSpec { name: "get", key_arity: 1, handler: read::get },
    CommandSpec { name: "pop", key_arity: 1, handler: read::pop },
    CommandSpec { name: "count", key_arity: 1, handler: read::count },
    CommandSpec { name: "times", key_arity: 1, handler: read::times },
    CommandSpec { name: "range", key_arity: 1, handler: range::range },
    CommandSpec { name: "revrange", key_arity: 1, handler: range::revrange },
    CommandSpec { name: "poprange", key_arity: 1, handler: range::poprange },
    CommandSpec { name: "remrange", key_arity: 1, handler: range::remrange },
    CommandSpec { name: "copy", key_arity: 2, handler: transfer::copy },
    CommandSpec { name: "merge", key_arity: 3, handler: transfer::merge },
    CommandSpec { name: "distinct", key_arity: 1, handler: stats::distinct },
    CommandSpec { name: "count_distinct", key_arity: 1, handler: stats::count_distinct },
    CommandSpec { name: "basic_stats", key_arity: 1, handler: stats::basic_stats },
];

lazy_static! {
    static ref PRIMARY: HashMap<&'static str, &'static CommandSpec> =
        COMMANDS.iter().map(|spec| (spec.name, spec)).collect();
    static ref FOLDED: HashMap<String, &'static CommandSpec> = COMMANDS
        .iter()
        .map(|spec| (spec.name.to_ascii_lowercase(), spec))
        .collect();
}

/// Resolve and execute one command invocation
pub fn dispatch(
    store: &dyn SeriesStore,
    config: &EngineConfig,
    keys: &[&str],
    name: &str,
    args: &[&str],
) -> Result<Reply> {
    let spec = PRIMARY
        .get(name)
        .copied()
        .or_else(|| FOLDED.get(&name.to_ascii_lowercase()).copied())
        .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))?;

    if keys.len() != spec.key_arity {
        return Err(EngineError::argument(format!(
            "'{}' expects {} key(s), got {}",
            spec.name,
            spec.key_arity,
            keys.len()
        )));
    }

    debug!(
        command = spec.name,
        keys = keys.len(),
        args = args.len(),
        "dispatching"
    );

    (spec.handler)(&CommandContext {
        store,
        config,
        keys,
        args,
    })
}

/// Point lookup with the uniqueness invariant enforced.
///
/// A stream id is unique; more than one entry back from the collaborator is
/// storage corruption and aborts the command.
pub(crate) fn point_lookup(
    store: &dyn SeriesStore,
    key: &str,
    id: EntryId,
) -> Result<Option<Entry>> {
    let mut found = store.lookup(key, id)?;
    if found.len() > 1 {
        warn!(key, id = %id, matches = found.len(), "point lookup returned multiple entries");
        return Err(EngineError::Corruption(format!(
            "point lookup for id {} in '{}' returned {} entries",
            id,
            key,
            found.len()
        )));
    }
    Ok(found.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dispatch_on(
        store: &MemoryStore,
        keys: &[&str],
        name: &str,
        args: &[&str],
    ) -> Result<Reply> {
        dispatch(store, &EngineConfig::default(), keys, name, args)
    }

    #[test]
    fn test_lookup_is_case_folded() {
        let store = MemoryStore::new();
        dispatch_on(&store, &["k"], "add", &["1", "v", "1"]).unwrap();

        assert_eq!(
            dispatch_on(&store, &["k"], "SIZE", &[]).unwrap(),
            Reply::Int(1)
        );
        assert_eq!(
            dispatch_on(&store, &["k"], "Size", &[]).unwrap(),
            Reply::Int(1)
        );
    }

    #[test]
    fn test_unknown_command() {
        let store = MemoryStore::new();
        let err = dispatch_on(&store, &["k"], "explode", &[]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownCommand(_)));
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn test_key_arity_is_enforced() {
        let store = MemoryStore::new();
        let err = dispatch_on(&store, &["a", "b"], "size", &[]).unwrap_err();
        assert!(err.to_string().contains("expects 1 key(s)"));

        let err = dispatch_on(&store, &["a"], "copy", &["-", "+"]).unwrap_err();
        assert!(err.to_string().contains("expects 2 key(s)"));

        let err = dispatch_on(&store, &["a", "b"], "merge", &["-", "+"]).unwrap_err();
        assert!(err.to_string().contains("expects 3 key(s)"));
    }
}
