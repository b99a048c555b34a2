//! The `key=value,key=value` filter grammar.
//!
//! Each entity declares a [`FilterSet`]: native filters, compiled into a
//! `Has(...)` step of the topology query, and post filters, evaluated in
//! process against the raw records once they are fetched. Post filters cover
//! what the query language cannot say, like membership of a typed match entry
//! in an OpenFlow rule's `Filters` list.
//!
//! Values run up to the next comma and may contain `=`. There is no escape
//! for a literal comma inside a value.
//!
//! Quoted literals go into the query verbatim: the traversal scanner reads a
//! quoted string up to the next quote and knows no escapes. Filter values
//! holding a `'` are therefore rejected.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SkynetError};

/// A literal as it appears inside a topology query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Str(String),
    Regex(String),
    /// Rendered verbatim.
    Raw(String),
}

impl Literal {
    pub fn string(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}
impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Str(s) => write!(f, "'{s}'"),
            Literal::Regex(r) => write!(f, "Regex('{r}')"),
            Literal::Raw(r) => f.write_str(r),
        }
    }
}

/// Values end up between single quotes, which cannot be escaped.
fn unquoted(value: &str) -> std::result::Result<&str, String> {
    if value.contains('\'') {
        return Err("single quotes are not allowed in query values".to_string());
    }
    Ok(value)
}

// ------------- Value transforms -------------

pub type ValueTransform = fn(&str) -> std::result::Result<Literal, String>;

/// Passes the value through untouched, as query syntax.
pub fn identity(value: &str) -> std::result::Result<Literal, String> {
    Ok(Literal::Raw(value.to_string()))
}

pub fn string(value: &str) -> std::result::Result<Literal, String> {
    Ok(Literal::string(unquoted(value)?))
}

/// Case insensitive "contains" match.
pub fn regex(value: &str) -> std::result::Result<Literal, String> {
    let value = unquoted(value)?;
    Regex::new(value).map_err(|e| e.to_string())?;
    Ok(Literal::Regex(format!("(?i).*{value}.*")))
}

/// Matches values starting with the given text, e.g. an abbreviated UUID.
pub fn prefix(value: &str) -> std::result::Result<Literal, String> {
    let pattern = format!("{}.*", unquoted(value)?);
    Regex::new(&pattern).map_err(|e| e.to_string())?;
    Ok(Literal::Regex(pattern))
}

pub fn integer(value: &str) -> std::result::Result<Literal, String> {
    value
        .trim()
        .parse::<i64>()
        .map(Literal::Int)
        .map_err(|e| e.to_string())
}

/// Hexadecimal with or without a `0x` prefix, e.g. an OpenFlow cookie.
pub fn hex(value: &str) -> std::result::Result<Literal, String> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    // int64 in the topology: cookies with the top bit set wrap to negative
    u64::from_str_radix(digits, 16)
        .map(|cookie| Literal::Int(cookie as i64))
        .map_err(|e| e.to_string())
}

pub type PostTransform = fn(&str) -> std::result::Result<Value, String>;

pub fn post_string(value: &str) -> std::result::Result<Value, String> {
    Ok(Value::String(value.to_string()))
}

pub fn post_integer(value: &str) -> std::result::Result<Value, String> {
    value
        .trim()
        .parse::<i64>()
        .map(Value::from)
        .map_err(|e| e.to_string())
}

// ------------- Specs -------------

#[derive(Clone, Debug)]
pub struct FilterSpec {
    name: &'static str,
    key: &'static str,
    transform: ValueTransform,
}

impl FilterSpec {
    /// A filter whose user facing name is also the record key.
    pub fn new(name: &'static str, transform: ValueTransform) -> Self {
        Self { name, key: name, transform }
    }
    pub fn key(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Decides whether a raw record matches the (transformed) filter value.
pub type PostPredicate = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct PostFilterSpec {
    name: &'static str,
    predicate: PostPredicate,
    transform: PostTransform,
}

impl PostFilterSpec {
    pub fn new(name: &'static str, predicate: PostPredicate, transform: PostTransform) -> Self {
        Self { name, predicate, transform }
    }
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for PostFilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostFilterSpec").field("name", &self.name).finish()
    }
}

/// The filters an entity understands.
#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    filters: Vec<FilterSpec>,
    post_filters: Vec<PostFilterSpec>,
}

impl FilterSet {
    pub fn new(filters: Vec<FilterSpec>, post_filters: Vec<PostFilterSpec>) -> Self {
        Self { filters, post_filters }
    }
    pub fn parse(&self, input: &str) -> Result<CompiledFilter> {
        parse(input, &self.filters, &self.post_filters)
    }
    /// Names accepted by this set, native ones first.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters
            .iter()
            .map(FilterSpec::name)
            .chain(self.post_filters.iter().map(PostFilterSpec::name))
            .collect()
    }
}

// ------------- Compilation -------------

#[derive(Clone, Default)]
pub struct CompiledFilter {
    predicates: Vec<(String, Literal)>,
    post_filters: Vec<(PostPredicate, Value)>,
}

/// Parse a filter string against the native and post filter specs.
///
/// A key resolves against `filters` first, then `post_filters`. The same native
/// key given twice keeps the last value. Any unknown key, malformed token or
/// rejected value fails the whole string.
pub fn parse(
    input: &str,
    filters: &[FilterSpec],
    post_filters: &[PostFilterSpec],
) -> Result<CompiledFilter> {
    let mut compiled = CompiledFilter::default();
    if input.trim().is_empty() {
        return Ok(compiled);
    }
    for token in input.split(',') {
        let (key, value) = match token.trim().split_once('=') {
            Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                (key.trim(), value.trim())
            }
            _ => {
                return Err(SkynetError::MalformedFilter { token: token.to_string() });
            }
        };
        let invalid = |reason: String| SkynetError::InvalidFilterValue {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };
        if let Some(spec) = filters.iter().find(|f| f.name == key) {
            let literal = (spec.transform)(value).map_err(invalid)?;
            compiled.insert(spec.key, literal);
        } else if let Some(spec) = post_filters.iter().find(|f| f.name == key) {
            let transformed = (spec.transform)(value).map_err(invalid)?;
            compiled.post_filters.push((Arc::clone(&spec.predicate), transformed));
        } else {
            return Err(SkynetError::UnknownFilter { key: key.to_string() });
        }
    }
    debug!(
        predicates = compiled.predicates.len(),
        post_filters = compiled.post_filters.len(),
        "compiled filter"
    );
    Ok(compiled)
}

impl CompiledFilter {
    fn insert(&mut self, key: &str, literal: Literal) {
        match self.predicates.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = literal,
            None => self.predicates.push((key.to_string(), literal)),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.post_filters.is_empty()
    }
    pub fn predicates(&self) -> &[(String, Literal)] {
        &self.predicates
    }
    pub fn predicate(&self, key: &str) -> Option<&Literal> {
        self.predicates.iter().find(|(k, _)| k == key).map(|(_, l)| l)
    }
    pub fn post_filter_count(&self) -> usize {
        self.post_filters.len()
    }

    /// The native predicates as one `.Has(...)` step, or nothing at all.
    pub fn to_query_predicate(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let pairs: Vec<String> = self
            .predicates
            .iter()
            .map(|(key, literal)| format!("'{key}', {literal}"))
            .collect();
        format!(".Has({})", pairs.join(", "))
    }

    /// True when every post filter accepts the record.
    pub fn accepts(&self, record: &Value) -> bool {
        self.post_filters
            .iter()
            .all(|(predicate, value)| predicate(record, value))
    }

    pub fn apply_post_filters(&self, records: Vec<Value>) -> Vec<Value> {
        if self.post_filters.is_empty() {
            return records;
        }
        let before = records.len();
        let kept: Vec<Value> = records.into_iter().filter(|r| self.accepts(r)).collect();
        debug!(before, after = kept.len(), "post filters applied");
        kept
    }
}

impl fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("predicates", &self.predicates)
            .field("post_filters", &self.post_filters.len())
            .finish()
    }
}
