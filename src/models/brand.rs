use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{COUNT_KEYS, LABEL_KEYS};

/// Hit count as found in the page, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawCount {
    Integer(i64),
    Text(String),
}

impl RawCount {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(RawCount::Integer(i)),
                None => Some(RawCount::Text(n.to_string())),
            },
            Value::String(s) => Some(RawCount::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RawCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCount::Integer(i) => write!(f, "{}", i),
            RawCount::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A facet value candidate carrying a label and a hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub label: String,
    pub count: RawCount,
}

impl RawEntry {
    pub fn new(label: impl Into<String>, count: RawCount) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }

    /// Reads `label`/`name` and `hitCount`/`count` off a facet value object.
    pub fn from_object(object: &Map<String, Value>) -> Option<Self> {
        let label = LABEL_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str))?;

        let count = COUNT_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(RawCount::from_json))?;

        Some(Self::new(label, count))
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object().and_then(Self::from_object)
    }
}

/// A validated brand row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrandEntry {
    pub name: String,
    pub count: u64,
}

impl BrandEntry {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl fmt::Display for BrandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.name, self.count)
    }
}

/// Deduplicated, ordered brand rows. Built by [`crate::aggregate::aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandTable {
    rows: Vec<BrandEntry>,
}

impl BrandTable {
    pub(crate) fn from_sorted_rows(rows: Vec<BrandEntry>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[BrandEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrandEntry> {
        self.rows.iter()
    }

    /// Case-insensitive lookup by brand name.
    pub fn get(&self, name: &str) -> Option<&BrandEntry> {
        let wanted = name.to_lowercase();
        self.rows.iter().find(|row| row.name.to_lowercase() == wanted)
    }

    pub fn total_count(&self) -> u64 {
        self.rows.iter().fold(0u64, |acc, row| acc.saturating_add(row.count))
    }
}

impl<'a> IntoIterator for &'a BrandTable {
    type Item = &'a BrandEntry;
    type IntoIter = std::slice::Iter<'a, BrandEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
