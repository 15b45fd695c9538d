//! Query option parser
//!
//! Consumes the token tail of a command invocation - everything after the
//! `(min, max)` bounds - and compiles it into a validated [`QuerySpec`].
//! Options are keyword-introduced, case-insensitive, may appear in any order
//! and each at most once:
//!
//! ```text
//! LIMIT count [offset]          scan cap (offset tolerated, discarded)
//! AGGREGATION bucket kind(f)+   aggregation plan
//! FILTER <conditions>           compiled predicate
//! LABELS name+                  projection include-set
//! REDACT name+                  projection exclude-set
//! FORMAT json                   output serialisation
//! STORAGE timeseries|hash       copy sink shape
//! ```
//!
//! Each command passes the subset of keywords it accepts as an
//! [`OptionMask`]; anything outside the subset is rejected up front.

use crate::aggregate::{AggregateKind, AggregateSpec};
use crate::error::{EngineError, Result};
use crate::query::filter::{self, Predicate};
use crate::query::projection::Projection;
use crate::reply::OutputFormat;
use crate::sink::SinkKind;
use crate::types::{is_valid_field_name, RangeBound};

// ============================================================================
// Keywords and Masks
// ============================================================================

const LIMIT_BIT: u8 = 1 << 0;
const AGGREGATION_BIT: u8 = 1 << 1;
const FILTER_BIT: u8 = 1 << 2;
const LABELS_BIT: u8 = 1 << 3;
const REDACT_BIT: u8 = 1 << 4;
const FORMAT_BIT: u8 = 1 << 5;
const STORAGE_BIT: u8 = 1 << 6;

/// Query option keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKeyword {
    /// `LIMIT count [offset]`
    Limit,
    /// `AGGREGATION bucket kind(field)+`
    Aggregation,
    /// `FILTER <conditions>`
    Filter,
    /// `LABELS name+`
    Labels,
    /// `REDACT name+`
    Redact,
    /// `FORMAT json`
    Format,
    /// `STORAGE timeseries|hash`
    Storage,
}

impl OptionKeyword {
    fn lookup(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "limit" => Some(OptionKeyword::Limit),
            "aggregation" => Some(OptionKeyword::Aggregation),
            "filter" => Some(OptionKeyword::Filter),
            "labels" => Some(OptionKeyword::Labels),
            "redact" => Some(OptionKeyword::Redact),
            "format" => Some(OptionKeyword::Format),
            "storage" => Some(OptionKeyword::Storage),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            OptionKeyword::Limit => "LIMIT",
            OptionKeyword::Aggregation => "AGGREGATION",
            OptionKeyword::Filter => "FILTER",
            OptionKeyword::Labels => "LABELS",
            OptionKeyword::Redact => "REDACT",
            OptionKeyword::Format => "FORMAT",
            OptionKeyword::Storage => "STORAGE",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            OptionKeyword::Limit => LIMIT_BIT,
            OptionKeyword::Aggregation => AGGREGATION_BIT,
            OptionKeyword::Filter => FILTER_BIT,
            OptionKeyword::Labels => LABELS_BIT,
            OptionKeyword::Redact => REDACT_BIT,
            OptionKeyword::Format => FORMAT_BIT,
            OptionKeyword::Storage => STORAGE_BIT,
        }
    }
}

/// Per-command set of accepted option keywords
#[derive(Debug, Clone, Copy)]
pub struct OptionMask(u8);

impl OptionMask {
    /// No options accepted
    pub const NONE: OptionMask = OptionMask(0);
    /// `get` / `pop`
    pub const POINT: OptionMask = OptionMask(LABELS_BIT | REDACT_BIT | FORMAT_BIT);
    /// `count`
    pub const COUNT: OptionMask = OptionMask(FILTER_BIT);
    /// `range` / `revrange` / `poprange`
    pub const RANGE: OptionMask = OptionMask(
        LIMIT_BIT | AGGREGATION_BIT | FILTER_BIT | LABELS_BIT | REDACT_BIT | FORMAT_BIT,
    );
    /// `remrange`
    pub const REMRANGE: OptionMask = OptionMask(LIMIT_BIT | FILTER_BIT);
    /// `copy` (no FORMAT: the result goes to a store, not to the caller)
    pub const COPY: OptionMask = OptionMask(
        LIMIT_BIT | AGGREGATION_BIT | FILTER_BIT | LABELS_BIT | REDACT_BIT | STORAGE_BIT,
    );
    /// `merge`
    pub const MERGE: OptionMask = OptionMask(LIMIT_BIT | FILTER_BIT | LABELS_BIT | REDACT_BIT);
    /// `distinct` / `count_distinct` / `basic_stats`
    pub const GROUPED: OptionMask = OptionMask(LABELS_BIT | FILTER_BIT | LIMIT_BIT);

    fn contains(self, keyword: OptionKeyword) -> bool {
        self.0 & keyword.bit() != 0
    }
}

// ============================================================================
// Parsed Forms
// ============================================================================

/// Compiled option tail of a query
#[derive(Debug, Default)]
pub struct QueryOptions {
    /// Scan cap from `LIMIT`
    pub count: Option<usize>,
    /// Compiled `FILTER` predicate
    pub filter: Option<Predicate>,
    /// `LABELS` / `REDACT` projection
    pub projection: Projection,
    /// `AGGREGATION` plan
    pub aggregate: Option<AggregateSpec>,
    /// `STORAGE` sink shape for `copy`
    pub storage: Option<SinkKind>,
    /// `FORMAT` output serialisation
    pub format: OutputFormat,
}

/// Compiled form of a full range query tail: bounds plus options
#[derive(Debug)]
pub struct QuerySpec {
    /// Lower bound (inclusive)
    pub min: RangeBound,
    /// Upper bound (inclusive)
    pub max: RangeBound,
    /// Everything after the bounds
    pub options: QueryOptions,
}

impl QuerySpec {
    /// Parse `min max [options...]` for `command`
    pub fn parse(command: &str, args: &[&str], allowed: OptionMask) -> Result<Self> {
        if args.len() < 2 {
            return Err(EngineError::argument(format!(
                "'{}' requires min and max range bounds",
                command
            )));
        }
        Ok(Self {
            min: RangeBound::parse_min(args[0])?,
            max: RangeBound::parse_max(args[1])?,
            options: QueryOptions::parse(command, &args[2..], allowed)?,
        })
    }
}

impl QueryOptions {
    /// Parse an option token tail for `command`
    pub fn parse(command: &str, tokens: &[&str], allowed: OptionMask) -> Result<Self> {
        let mut opts = QueryOptions::default();
        let mut seen: u8 = 0;
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            let keyword = OptionKeyword::lookup(token).ok_or_else(|| {
                EngineError::argument(format!("unknown option '{}'", token))
            })?;
            if !allowed.contains(keyword) {
                return Err(EngineError::argument(format!(
                    "option {} is not supported by '{}'",
                    keyword.name(),
                    command
                )));
            }
            if seen & keyword.bit() != 0 {
                return Err(EngineError::argument(format!(
                    "duplicate option {}",
                    keyword.name()
                )));
            }
            seen |= keyword.bit();
            i += 1;

            match keyword {
                OptionKeyword::Limit => i = parse_limit(tokens, i, &mut opts)?,
                OptionKeyword::Aggregation => i = parse_aggregation(tokens, i, &mut opts)?,
                OptionKeyword::Filter => i = parse_filter(tokens, i, &mut opts)?,
                OptionKeyword::Labels | OptionKeyword::Redact => {
                    i = parse_projection(tokens, i, keyword, &mut opts)?
                }
                OptionKeyword::Format => i = parse_format(tokens, i, &mut opts)?,
                OptionKeyword::Storage => i = parse_storage(tokens, i, &mut opts)?,
            }
        }

        Ok(opts)
    }
}

// ============================================================================
// Per-Option Payload Parsers
// ============================================================================

fn parse_limit(tokens: &[&str], mut i: usize, opts: &mut QueryOptions) -> Result<usize> {
    let token = tokens
        .get(i)
        .ok_or_else(|| EngineError::argument("LIMIT requires a count"))?;
    let count = token
        .parse::<i64>()
        .map_err(|_| EngineError::argument(format!("invalid LIMIT count '{}'", token)))?;
    if count <= 0 {
        return Err(EngineError::argument("LIMIT count must be positive"));
    }
    opts.count = Some(count as usize);
    i += 1;

    // A trailing numeric operand is the legacy offset: parsed, then discarded
    if let Some(next) = tokens.get(i) {
        if next.parse::<i64>().is_ok() {
            i += 1;
        }
    }
    Ok(i)
}

fn parse_aggregation(tokens: &[&str], mut i: usize, opts: &mut QueryOptions) -> Result<usize> {
    let token = tokens
        .get(i)
        .ok_or_else(|| EngineError::argument("AGGREGATION requires a bucket size"))?;
    let time_bucket = token
        .parse::<u64>()
        .map_err(|_| EngineError::argument(format!("invalid aggregation bucket '{}'", token)))?;
    if time_bucket == 0 {
        return Err(EngineError::argument("aggregation bucket must be positive"));
    }
    i += 1;

    let mut fields = Vec::new();
    while let Some(token) = tokens.get(i) {
        if OptionKeyword::lookup(token).is_some() || !token.contains('(') {
            break;
        }
        fields.push(parse_aggregate_field(token)?);
        i += 1;
    }
    if fields.is_empty() {
        return Err(EngineError::argument(
            "AGGREGATION requires at least one kind(field)",
        ));
    }

    opts.aggregate = Some(AggregateSpec {
        time_bucket,
        fields,
    });
    Ok(i)
}

fn parse_aggregate_field(token: &str) -> Result<(String, AggregateKind)> {
    let malformed = || {
        EngineError::argument(format!(
            "malformed aggregation spec '{}', expected kind(field)",
            token
        ))
    };

    let body = token.strip_suffix(')').ok_or_else(malformed)?;
    let (kind_name, field) = body.split_once('(').ok_or_else(malformed)?;
    if !is_valid_field_name(field) {
        return Err(malformed());
    }
    let kind = AggregateKind::parse(kind_name).ok_or_else(|| {
        EngineError::argument(format!("unknown aggregation kind '{}'", kind_name))
    })?;
    Ok((field.to_string(), kind))
}

fn parse_filter(tokens: &[&str], i: usize, opts: &mut QueryOptions) -> Result<usize> {
    let start = i;
    let mut end = i;
    while let Some(token) = tokens.get(end) {
        let is_joiner =
            token.eq_ignore_ascii_case("and") || token.eq_ignore_ascii_case("or");
        if !is_joiner && !filter::is_condition_token(token) {
            break;
        }
        end += 1;
    }
    if end == start {
        return Err(EngineError::argument(
            "FILTER requires at least one condition",
        ));
    }
    opts.filter = Some(filter::compile(&tokens[start..end])?);
    Ok(end)
}

fn parse_projection(
    tokens: &[&str],
    mut i: usize,
    keyword: OptionKeyword,
    opts: &mut QueryOptions,
) -> Result<usize> {
    if !opts.projection.is_none() {
        return Err(EngineError::argument(
            "LABELS and REDACT are mutually exclusive",
        ));
    }

    let mut names = Vec::new();
    while let Some(token) = tokens.get(i) {
        if OptionKeyword::lookup(token).is_some() || !is_valid_field_name(token) {
            break;
        }
        names.push(token.to_string());
        i += 1;
    }
    if names.is_empty() {
        return Err(EngineError::argument(format!(
            "{} requires at least one field name",
            keyword.name()
        )));
    }

    opts.projection = match keyword {
        OptionKeyword::Labels => Projection::Include(names),
        _ => Projection::Exclude(names),
    };
    Ok(i)
}

fn parse_format(tokens: &[&str], i: usize, opts: &mut QueryOptions) -> Result<usize> {
    let token = tokens
        .get(i)
        .ok_or_else(|| EngineError::argument("FORMAT requires a serialisation name"))?;
    if token.eq_ignore_ascii_case("json") {
        opts.format = OutputFormat::Json;
    } else if token.eq_ignore_ascii_case("msgpack") {
        return Err(EngineError::argument(
            "FORMAT msgpack is not supported, use json",
        ));
    } else {
        return Err(EngineError::argument(format!("unknown format '{}'", token)));
    }
    Ok(i + 1)
}

fn parse_storage(tokens: &[&str], i: usize, opts: &mut QueryOptions) -> Result<usize> {
    let token = tokens
        .get(i)
        .ok_or_else(|| EngineError::argument("STORAGE requires a sink name"))?;
    if token.eq_ignore_ascii_case("timeseries") {
        opts.storage = Some(SinkKind::Stream);
    } else if token.eq_ignore_ascii_case("hash") {
        opts.storage = Some(SinkKind::Hash);
    } else {
        return Err(EngineError::argument(format!(
            "unknown storage '{}', expected timeseries or hash",
            token
        )));
    }
    Ok(i + 1)
}

// ============================================================================
// Tests
// ============================================================================
