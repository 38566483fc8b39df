//! Tagged values and ordered records produced from CSV rows.
//!
//! A [`Record`] is an insertion-ordered mapping of field name to [`Value`].
//! Dotted headers such as `address.city` become nested mappings through
//! [`Record::insert_path`], and leaf strings are coerced to numbers with
//! [`try_parse_numeric`] when they look like plain decimal literals.

use std::{fmt, sync::OnceLock};

use indexmap::IndexMap;
use regex::Regex;
use serde::{Serialize, Serializer};

/// Largest magnitude that is still rendered without a fractional part.
const INTEGRAL_RENDER_LIMIT: f64 = 1e15;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Number(f64),
    String(String),
    Mapping(Record),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Record> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    /// `Null`, the empty string, and the empty mapping all count as "no value".
    pub fn is_empty_like(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Mapping(m) => m.is_empty(),
            Value::Number(_) => false,
        }
    }

    /// Builds a leaf from a trimmed CSV cell, coercing numeric-looking text.
    pub fn from_cell(raw: &str) -> Self {
        match try_parse_numeric(raw) {
            Some(number) => Value::Number(number),
            None => Value::String(raw.to_string()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Mapping(Record::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Mapping(m) => match serde_json::to_string(m) {
                Ok(json) => f.write_str(&json),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Number(n) => {
                if is_integral(*n) {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Mapping(m) => m.serialize(serializer),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Mapping(value)
    }
}

/// Insertion-ordered field mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes a field while keeping the order of the remaining fields.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Resolves a `.`-separated path through nested mappings.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            current = current.as_mapping()?.get(segment)?;
        }
        Some(current)
    }

    /// Assigns `value` at a dotted path, creating intermediate mappings.
    ///
    /// An intermediate level that currently holds a scalar is replaced by a
    /// fresh mapping, so the later header wins.
    pub fn insert_path(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        let (leaf, parents) = match segments.split_last() {
            Some(split) => split,
            None => return,
        };
        let mut current = self;
        for segment in parents {
            let slot = current
                .0
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Mapping(Record::new()));
            if !matches!(slot, Value::Mapping(_)) {
                *slot = Value::Mapping(Record::new());
            }
            let Value::Mapping(inner) = slot else {
                return;
            };
            current = inner;
        }
        current.insert(*leaf, value);
    }

    /// Removes the value at a dotted path and prunes parents left empty.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None => self.remove(path),
            Some((head, rest)) => {
                let removed = match self.0.get_mut(head) {
                    Some(Value::Mapping(inner)) => inner.remove_path(rest),
                    _ => None,
                };
                if removed.is_some()
                    && self
                        .get(head)
                        .and_then(Value::as_mapping)
                        .is_some_and(Record::is_empty)
                {
                    self.remove(head);
                }
                removed
            }
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn numeric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^-?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
            .expect("numeric literal pattern compiles")
    })
}

/// Parses a cell as a number when it is a plain decimal literal.
///
/// Empty text, any whitespace, a leading `+`, radix prefixes such as `0x`,
/// and spelled-out infinities are all rejected, as is any literal whose value
/// overflows to a non-finite float.
pub fn try_parse_numeric(raw: &str) -> Option<f64> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    if !numeric_pattern().is_match(raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < INTEGRAL_RENDER_LIMIT
}

/// Renders a number the way it appears in labels and SQL literals.
pub fn format_number(value: f64) -> String {
    if is_integral(value) {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}
