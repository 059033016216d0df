//! Index definitions and search operators.
//!
//! A bin's [`IndexDefinition`] declares the searchable keys: each key names
//! a JSON pointer into the document and the [`Operator`] used when a search
//! mentions that key.
//!
//! The wire format is a JSON object. A plain string value is shorthand for
//! an `eq` key on that path:
//!
//! ```json
//! {"title": "/title", "tags": {"path": "/tags", "type": "in_list"}}
//! ```

use crate::encoding::IndexValue;
use crate::{pattern, Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// How a search key compares the request value with indexed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// The path holds a list; one index entry is kept per element and
    /// searching tests membership.
    InList,
    /// Shell-style wildcards (`*`, `?`, `[...]`) on the dequoted value.
    Glob,
    /// SQL `LIKE` wildcards (`%`, `_`) on the dequoted value.
    Like,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Self::Eq,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::InList,
        Self::Glob,
        Self::Like,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::InList => "in_list",
            Self::Glob => "glob",
            Self::Like => "like",
        }
    }

    /// True for operators whose request value is a text pattern.
    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Glob | Self::Like)
    }

    /// Tests one stored index entry against a compiled request operand.
    ///
    /// Comparison operators read `stored <op> request` on the encoded
    /// sort keys. `in_list` matches like `eq`, since a list is indexed as
    /// one entry per element. Pattern operators match against the
    /// dequoted stored value.
    #[must_use]
    pub fn matches(self, stored: &IndexValue, operand: &Operand) -> bool {
        match (self, operand) {
            (Self::Glob, Operand::Pattern(p)) => pattern::glob_match(p, stored.dequoted()),
            (Self::Like, Operand::Pattern(p)) => pattern::like_match(p, stored.dequoted()),
            (_, Operand::Pattern(_)) | (Self::Glob | Self::Like, Operand::Value(_)) => false,
            (op, Operand::Value(request)) => {
                let (s, r) = (stored.sort_key(), request.sort_key());
                match op {
                    Self::Lt => s < r,
                    Self::Lte => s <= r,
                    Self::Gt => s > r,
                    Self::Gte => s >= r,
                    _ => s == r,
                }
            }
        }
    }
}

/// A request value prepared for one operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Encoded exactly like stored values, for ordered comparison.
    Value(IndexValue),
    /// Wildcard pattern text for `glob` and `like`.
    Pattern(String),
}

impl Operand {
    /// Prepares `value` as the operand of `op`.
    ///
    /// Pattern operators take string values verbatim and render any other
    /// value as JSON text.
    #[must_use]
    pub fn for_operator(op: Operator, value: &Value) -> Self {
        if op.is_pattern() {
            match value {
                Value::String(s) => Self::Pattern(s.clone()),
                other => Self::Pattern(other.to_string()),
            }
        } else {
            Self::Value(IndexValue::encode(Some(value)))
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownOperator(s.to_string()))
    }
}

/// One declared search key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexKey {
    /// Name used in search requests.
    pub name: String,
    /// JSON pointer into the document; empty addresses the whole document.
    pub path: String,
    pub operator: Operator,
}

impl IndexKey {
    pub fn new(name: impl Into<String>, path: impl Into<String>, operator: Operator) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            operator,
        }
    }

    fn to_json(&self) -> Value {
        serde_json::json!({"path": self.path, "type": self.operator.as_str()})
    }
}

/// The ordered set of search keys declared for a bin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDefinition {
    keys: Vec<IndexKey>,
}

impl IndexDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, replacing an earlier key of the same name.
    pub fn with_key(
        mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        operator: Operator,
    ) -> Self {
        self.push(IndexKey::new(name, path, operator));
        self
    }

    /// Adds a key, replacing an earlier key of the same name in place.
    pub fn push(&mut self, key: IndexKey) {
        match self.keys.iter_mut().find(|k| k.name == key.name) {
            Some(existing) => *existing = key,
            None => self.keys.push(key),
        }
    }

    /// Builds a definition from a list of keys, validating each one.
    pub fn from_keys(keys: impl IntoIterator<Item = IndexKey>) -> Result<Self> {
        let mut def = Self::new();
        for key in keys {
            validate_key(&key)?;
            def.push(key);
        }
        Ok(def)
    }

    /// Parses the JSON wire format.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidDefinition("expected a JSON object".into()))?;
        let mut keys = Vec::with_capacity(obj.len());
        for (name, spec) in obj {
            let key = match spec {
                Value::String(path) => IndexKey::new(name, path, Operator::Eq),
                Value::Object(fields) => {
                    let path = fields
                        .get("path")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            Error::InvalidDefinition(format!("key {name}: missing path"))
                        })?;
                    let operator = match fields.get("type") {
                        None | Some(Value::Null) => Operator::Eq,
                        Some(Value::String(op)) => op.parse()?,
                        Some(other) => {
                            return Err(Error::InvalidDefinition(format!(
                                "key {name}: type must be a string, got {other}"
                            )));
                        }
                    };
                    IndexKey::new(name, path, operator)
                }
                other => {
                    return Err(Error::InvalidDefinition(format!(
                        "key {name}: expected a path or an object, got {other}"
                    )));
                }
            };
            keys.push(key);
        }
        Self::from_keys(keys)
    }

    /// Renders the JSON wire format, always in the long form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .keys
            .iter()
            .map(|k| (k.name.clone(), k.to_json()))
            .collect();
        Value::Object(map)
    }

    /// Looks up a key by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IndexKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IndexKey> {
        self.keys.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<'a> IntoIterator for &'a IndexDefinition {
    type Item = &'a IndexKey;
    type IntoIter = std::slice::Iter<'a, IndexKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

fn validate_key(key: &IndexKey) -> Result<()> {
    if key.name.is_empty() {
        return Err(Error::InvalidDefinition("empty key name".into()));
    }
    if key.name == "and" || key.name == "or" {
        return Err(Error::InvalidDefinition(format!(
            "key name {:?} is reserved for connectives",
            key.name
        )));
    }
    if !key.path.is_empty() && !key.path.starts_with('/') {
        return Err(Error::InvalidDefinition(format!(
            "key {}: path {:?} must be empty or start with '/'",
            key.name, key.path
        )));
    }
    Ok(())
}

impl Serialize for IndexDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for IndexDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value).map_err(serde::de::Error::custom)
    }
}
