//! Reply shaping
//!
//! Commands return native replies - integers, bulk strings, arrays, null -
//! mirroring what the host transport hands back to the caller. `FORMAT json`
//! renders the same result shapes as one JSON bulk string with query-time
//! value coercion applied.
//!
//! Shapes:
//!
//! - plain ranges: a list of `[id, [field, value, ...]]` pairs, or JSON
//!   `[[id, {field: value}], ...]`
//! - aggregated ranges: a flat alternating `[bucket_ts, bucket_fields, ...]`
//!   list where `bucket_fields` is itself flat `[field, [kind, value, ...], ...]`,
//!   or JSON `[[bucket_ts, {field: [kind, value, ...]}], ...]`
//! - point lookups: `[field, value, ...]`, or the JSON record object

use serde_json::json;

use crate::aggregate::BucketRow;
use crate::error::{EngineError, Result};
use crate::types::Entry;
use crate::value::Value;

/// Output serialisation of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Native reply values
    #[default]
    Native,
    /// One JSON bulk string
    Json,
}

/// Native reply value
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Absent value / absent key
    Null,
    /// Integer reply
    Int(i64),
    /// Bulk string reply
    Bulk(String),
    /// Array reply
    Array(Vec<Reply>),
}

impl Reply {
    /// Render a coerced value as a native reply
    pub fn from_value(value: &Value) -> Reply {
        match value {
            Value::Int(i) => Reply::Int(*i),
            Value::Float(text) => Reply::Bulk(text.clone()),
            Value::Bool(b) => Reply::Bulk(b.to_string()),
            Value::Str(s) => Reply::Bulk(s.clone()),
        }
    }

    fn from_opt_value(value: &Option<Value>) -> Reply {
        match value {
            Some(v) => Reply::from_value(v),
            None => Reply::Null,
        }
    }
}

/// Flat `[field, value, ...]` reply for one record
pub fn fields_reply(fields: &[(String, String)]) -> Reply {
    let mut out = Vec::with_capacity(fields.len() * 2);
    for (name, value) in fields {
        out.push(Reply::Bulk(name.clone()));
        out.push(Reply::Bulk(value.clone()));
    }
    Reply::Array(out)
}

/// JSON object of one record with coerced values, in field order
pub fn record_json(fields: &[(String, String)]) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (name, value) in fields {
        object.insert(name.clone(), Value::coerce(value).to_json());
    }
    serde_json::Value::Object(object)
}

fn json_text(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| EngineError::Serialization(e.to_string()))
}

/// Shape a point-lookup record
pub fn record_reply(fields: &[(String, String)], format: OutputFormat) -> Result<Reply> {
    match format {
        OutputFormat::Native => Ok(fields_reply(fields)),
        OutputFormat::Json => Ok(Reply::Bulk(json_text(&record_json(fields))?)),
    }
}

/// Shape a plain (non-aggregated) range result
pub fn entries_reply(entries: &[Entry], format: OutputFormat) -> Result<Reply> {
    match format {
        OutputFormat::Native => Ok(Reply::Array(
            entries
                .iter()
                .map(|entry| {
                    Reply::Array(vec![
                        Reply::Bulk(entry.id.to_string()),
                        fields_reply(&entry.fields),
                    ])
                })
                .collect(),
        )),
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = entries
                .iter()
                .map(|entry| json!([entry.id.to_string(), record_json(&entry.fields)]))
                .collect();
            Ok(Reply::Bulk(json_text(&serde_json::Value::Array(rows))?))
        }
    }
}

/// Shape an aggregated range result
pub fn buckets_reply(buckets: &[BucketRow], format: OutputFormat) -> Result<Reply> {
    match format {
        OutputFormat::Native => {
            let mut out = Vec::with_capacity(buckets.len() * 2);
            for bucket in buckets {
                out.push(Reply::Int(bucket.key as i64));
                let mut fields = Vec::with_capacity(bucket.fields.len() * 2);
                for field in &bucket.fields {
                    fields.push(Reply::Bulk(field.name.clone()));
                    let mut pairs = Vec::with_capacity(field.outputs.len() * 2);
                    for (kind, value) in &field.outputs {
                        pairs.push(Reply::Bulk(kind.name().to_string()));
                        pairs.push(Reply::from_opt_value(value));
                    }
                    fields.push(Reply::Array(pairs));
                }
                out.push(Reply::Array(fields));
            }
            Ok(Reply::Array(out))
        }
        OutputFormat::Json => {
            let rows: Vec<serde_json::Value> = buckets
                .iter()
                .map(|bucket| {
                    let mut object = serde_json::Map::new();
                    for field in &bucket.fields {
                        let mut pairs: Vec<serde_json::Value> = Vec::new();
                        for (kind, value) in &field.outputs {
                            pairs.push(json!(kind.name()));
                            pairs.push(match value {
                                Some(v) => v.to_json(),
                                None => serde_json::Value::Null,
                            });
                        }
                        object.insert(field.name.clone(), serde_json::Value::Array(pairs));
                    }
                    json!([bucket.key, serde_json::Value::Object(object)])
                })
                .collect();
            Ok(Reply::Bulk(json_text(&serde_json::Value::Array(rows))?))
        }
    }
}
