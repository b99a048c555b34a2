//! Field extraction from raw topology records.
//!
//! A [`Field`] names a dot separated path into a raw JSON record, an optional
//! transform and the key under which the extracted value is filed in a
//! projected row. Paths are walked one segment at a time; a missing key, a
//! `null` or a non-object in the middle of the path ends the walk with
//! `Value::Null` instead of an error. Transforms only ever see resolved,
//! non-null values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SkynetError};

/// Reserved sub-object every topology record carries its attributes in.
pub const METADATA: &str = "Metadata";

/// Pure value transform applied after a path resolves.
pub type Transform = fn(&Value) -> std::result::Result<Value, String>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Root {
    /// The whole record.
    Record,
    /// The record's `Metadata` sub-object.
    Metadata,
}

#[derive(Clone)]
pub struct Field {
    root: Root,
    path: String,
    key: String,
    transform: Option<Transform>,
}

impl Field {
    /// A field resolved against the top level of the record.
    pub fn new(path: &str) -> Self {
        Self {
            root: Root::Record,
            path: path.to_string(),
            key: path.to_string(),
            transform: None,
        }
    }
    /// A field resolved against the record's `Metadata` sub-object.
    pub fn metadata(path: &str) -> Self {
        Self {
            root: Root::Metadata,
            ..Self::new(path)
        }
    }
    /// File the value under `key` instead of the path.
    pub fn key_name(mut self, key: &str) -> Self {
        self.key = key.to_string();
        self
    }
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn root(&self) -> Root {
        self.root
    }

    /// Extract this field's value from a raw record.
    pub fn value(&self, record: &Value) -> Result<Value> {
        let start = match self.root {
            Root::Record => Some(record),
            Root::Metadata => record.get(METADATA),
        };
        let resolved = match start {
            Some(start) => self.walk(start),
            None => {
                debug!(path = %self.path, "record has no Metadata");
                None
            }
        };
        match (resolved, self.transform) {
            (Some(value), Some(transform)) => {
                transform(value).map_err(|message| SkynetError::Projection {
                    field: self.key.clone(),
                    message,
                })
            }
            (Some(value), None) => Ok(value.clone()),
            (None, _) => Ok(Value::Null),
        }
    }

    fn walk<'v>(&self, start: &'v Value) -> Option<&'v Value> {
        let mut current = start;
        for segment in self.path.split('.') {
            current = match current {
                Value::Object(map) => match map.get(segment) {
                    Some(Value::Null) | None => {
                        debug!(path = %self.path, segment, "path not present");
                        return None;
                    }
                    Some(next) => next,
                },
                Value::Null => return None,
                other => {
                    warn!(
                        path = %self.path,
                        segment,
                        found = %kind(other),
                        "cannot descend into non-object"
                    );
                    return None;
                }
            };
        }
        Some(current)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("root", &self.root)
            .field("path", &self.path)
            .field("key", &self.key)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ------------- Transforms -------------

/// Epoch milliseconds (as Skydive stores them) to an RFC 3339 timestamp.
pub fn timestamp(value: &Value) -> std::result::Result<Value, String> {
    let millis = value
        .as_i64()
        .ok_or_else(|| format!("expected epoch milliseconds, found {value}"))?;
    let time = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| format!("timestamp out of range: {millis}"))?;
    Ok(Value::String(time.to_rfc3339()))
}

/// Integers stored as strings (ConfigMap data, mostly) to numbers.
pub fn integer(value: &Value) -> std::result::Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| format!("'{s}' is not an integer: {e}")),
        other => Err(format!("expected an integer, found {other}")),
    }
}
