//! The ordered chain of facet-extraction strategies.
//!
//! Each strategy looks at the script blocks of one page and either returns the
//! raw facet entries it found or `None`, letting the pipeline fall back to the
//! next, more permissive strategy.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::trace;

use crate::models::RawEntry;
use crate::normalize::Validation;
use crate::parsers::{enclosing_values, parse_whole, ScriptSet};

mod escaped;
mod flat_regex;
mod reference;
mod structured;

pub use escaped::EscapedPayload;
pub use flat_regex::FlatRegex;
pub use reference::ReferenceIndexed;
pub use structured::StructuredJson;

/// Attribute id of the brand refinement on Salesforce Commerce storefronts.
pub const BRAND_ATTRIBUTE_ID: &str = "c_brand";
const FACET_LABELS: &[&str] = &["brand", "brands", "designer", "designers"];
const FACET_KEYS: &[&str] = &["brand", "designer"];
const VALUE_FIELDS: &[&str] = &["values", "options"];

// Text positions worth parsing around
static FACET_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)"attributeId"\s*:\s*"c_brand"|"label"\s*:\s*"(?:brands?|designers?)"|"key"\s*:\s*"(?:brand|designer)""#,
    )
    .expect("Invalid facet anchor regex")
});

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(\d+)$").expect("Invalid reference regex"));

pub trait FacetStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn try_extract(&self, scripts: &ScriptSet) -> Option<Extraction>;
}

/// What one strategy pulled out of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub entries: Vec<RawEntry>,
    pub validation: Validation,
    /// Referenced entries whose definition was not in the page.
    pub missing_definitions: usize,
    /// Facet values without a usable label or count.
    pub malformed: usize,
}

impl Extraction {
    pub fn new(validation: Validation) -> Self {
        Self {
            entries: Vec::new(),
            validation,
            missing_definitions: 0,
            malformed: 0,
        }
    }

    pub fn from_values(values: &[Value]) -> Self {
        let mut extraction = Self::new(Validation::Standard);
        for value in values {
            match RawEntry::from_value(value) {
                Some(entry) => extraction.entries.push(entry),
                None => extraction.malformed += 1,
            }
        }
        extraction
    }
}

/// The values side of a located facet.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetValues {
    Entries(Vec<Value>),
    /// Numeric key of a definition elsewhere in the page (`"$62"` → `"62"`).
    Reference(String),
}

pub fn default_strategies() -> Vec<Box<dyn FacetStrategy>> {
    vec![
        Box::new(StructuredJson),
        Box::new(ReferenceIndexed),
        Box::new(EscapedPayload),
        Box::new(FlatRegex),
    ]
}

/// Key of a `"$<digits>"` reference.
pub fn reference_key(value: &str) -> Option<&str> {
    REFERENCE
        .captures(value)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

fn is_facet_object(object: &Map<String, Value>) -> bool {
    let text = |key: &str| object.get(key).and_then(Value::as_str);

    text("attributeId") == Some(BRAND_ATTRIBUTE_ID)
        || text("label").is_some_and(|l| FACET_LABELS.contains(&l.trim().to_lowercase().as_str()))
        || text("key").is_some_and(|k| FACET_KEYS.contains(&k))
}

fn facet_values(object: &Map<String, Value>) -> Option<FacetValues> {
    VALUE_FIELDS.iter().find_map(|field| match object.get(*field)? {
        Value::Array(items) if items.iter().any(Value::is_object) => {
            Some(FacetValues::Entries(items.clone()))
        }
        Value::String(s) => reference_key(s).map(|key| FacetValues::Reference(key.to_string())),
        _ => None,
    })
}

/// Depth-first search of a parsed value for brand facets, in document order.
pub fn find_facets(value: &Value) -> Vec<FacetValues> {
    let mut found = Vec::new();
    collect_facets(value, &mut found);
    found
}

fn collect_facets(value: &Value, found: &mut Vec<FacetValues>) {
    match value {
        Value::Object(object) => {
            if is_facet_object(object) {
                if let Some(values) = facet_values(object) {
                    found.push(values);
                }
            }
            for child in object.values() {
                collect_facets(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_facets(item, found);
            }
        }
        _ => {}
    }
}

/// Facets in one script: the whole text as JSON when it parses, otherwise
/// the objects enclosing each facet anchor.
pub fn locate_facets(text: &str) -> Vec<FacetValues> {
    if let Some(value) = parse_whole(text) {
        let found = find_facets(&value);
        if !found.is_empty() {
            return found;
        }
    }

    let mut found = Vec::new();
    for anchor in FACET_ANCHOR.find_iter(text) {
        // innermost enclosing object that contains a facet wins
        let facets = enclosing_values(text, anchor.start())
            .map(|value| find_facets(&value))
            .find(|facets| !facets.is_empty());
        match facets {
            Some(facets) => {
                for facet in facets {
                    if !found.contains(&facet) {
                        found.push(facet);
                    }
                }
            }
            None => trace!("No parseable facet around offset {}", anchor.start()),
        }
    }
    found
}
