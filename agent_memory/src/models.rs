//! Core data models for the memory store

use crate::error::StoreError;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Structured payload stored under a key
pub type ItemValue = Map<String, Value>;

//
// ================= Namespace =================
//

/// Hierarchical partition of the store, e.g. `["memories", "user-42"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Namespace(Vec<String>);

impl Namespace {
    /// Build a namespace, rejecting an empty path or empty segments
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();

        if segments.is_empty() {
            return Err(StoreError::InvalidNamespace(
                "namespace must contain at least one segment".to_string(),
            ));
        }

        if let Some(pos) = segments.iter().position(|s| s.is_empty()) {
            return Err(StoreError::InvalidNamespace(format!(
                "segment {} of {:?} is empty",
                pos, segments
            )));
        }

        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated namespace
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Segment-wise prefix test; a namespace starts with itself
    pub fn starts_with(&self, prefix: &Namespace) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Extend this namespace with one more segment
    pub fn child(&self, segment: impl Into<String>) -> Result<Self> {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// First `depth` segments, or the whole namespace if shorter.
    /// A depth of 0 is treated as 1 so the result stays a valid namespace.
    pub fn truncated(&self, depth: usize) -> Self {
        let depth = depth.max(1).min(self.0.len());
        Self(self.0[..depth].to_vec())
    }
}

impl TryFrom<Vec<String>> for Namespace {
    type Error = StoreError;

    fn try_from(segments: Vec<String>) -> Result<Self> {
        Self::new(segments)
    }
}

impl From<Namespace> for Vec<String> {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

//
// ================= Validation =================
//

pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

/// Values must be JSON objects
pub(crate) fn into_item_value(value: Value) -> Result<ItemValue> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidValue(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

//
// ================= Item =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub namespace: Namespace,
    pub key: String,
    pub value: ItemValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(namespace: Namespace, key: String, value: ItemValue) -> Self {
        let now = Utc::now();
        Self {
            namespace,
            key,
            value,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the payload in place, keeping `created_at`
    pub fn replace_value(&mut self, value: ItemValue) {
        self.value = value;
        self.updated_at = Utc::now();
    }

    /// Top-level field lookup
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    /// Every filter field must be present at the top level with an equal
    /// value, compared with `json_eq`
    pub fn matches_filter(&self, filter: &ItemValue) -> bool {
        filter.iter().all(|(field, expected)| {
            self.value
                .get(field)
                .map_or(false, |actual| json_eq(actual, expected))
        })
    }
}

/// Exact JSON equality, except numbers compare by numeric value (`1 == 1.0`)
/// as Postgres `jsonb` does. Arrays must match element for element and
/// objects key for key; no containment.
pub fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                x == y
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                x == y
            } else {
                match (x.as_f64(), y.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => false,
                }
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).map_or(false, |other| json_eq(v, other)))
        }
        _ => a == b,
    }
}

//
// ================= Queries =================
//

/// Prefix search refined by an optional filter and pagination
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub prefix: Namespace,
    pub filter: Option<ItemValue>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(prefix: Namespace) -> Self {
        Self {
            prefix,
            filter: None,
            offset: 0,
            limit: None,
        }
    }

    /// Filter must be a JSON object
    pub fn with_filter(mut self, filter: Value) -> Result<Self> {
        self.filter = Some(into_item_value(filter)?);
        Ok(self)
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn matches(&self, item: &Item) -> bool {
        item.namespace.starts_with(&self.prefix)
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| item.matches_filter(filter))
    }
}

/// Listing of namespaces currently holding items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceQuery {
    pub prefix: Option<Namespace>,
    pub max_depth: Option<usize>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl NamespaceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: Namespace) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Depth must be at least 1
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(StoreError::InvalidNamespace(
                "max_depth must be at least 1".to_string(),
            ));
        }
        self.max_depth = Some(max_depth);
        Ok(self)
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Apply prefix, depth, dedup, ordering and pagination to raw namespaces
    pub(crate) fn collect<I>(&self, namespaces: I) -> Vec<Namespace>
    where
        I: IntoIterator<Item = Namespace>,
    {
        let mut out: Vec<Namespace> = namespaces
            .into_iter()
            .filter(|ns| {
                self.prefix
                    .as_ref()
                    .map_or(true, |prefix| ns.starts_with(prefix))
            })
            .map(|ns| match self.max_depth {
                Some(depth) => ns.truncated(depth),
                None => ns,
            })
            .collect();

        out.sort();
        out.dedup();

        paginate(out, self.offset, self.limit)
    }
}

pub(crate) fn paginate<T>(items: Vec<T>, offset: usize, limit: Option<usize>) -> Vec<T> {
    let iter = items.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
