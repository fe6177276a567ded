use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{locate_facets, reference_key, Extraction, FacetStrategy, FacetValues};
use crate::models::RawEntry;
use crate::normalize::Validation;
use crate::parsers::{parse_at, ScriptSet};

// Facet objects that do not parse as a whole still expose their reference
static FACET_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""attributeId"\s*:\s*"c_brand"[^{}]{0,400}?"values"\s*:\s*"\$(\d+)"|"values"\s*:\s*"\$(\d+)"[^{}]{0,400}?"attributeId"\s*:\s*"c_brand""#,
    )
    .expect("Invalid facet reference regex")
});

// `"62":[` inside JSON, or `62:[` at the start of an RSC line
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[,{\s])"?(\d+)"?\s*:\s*([\[{])"#).expect("Invalid definition regex")
});

/// Facets whose `values` is a `"$<digits>"` back-reference into keyed
/// definitions elsewhere in the page, as serialized by React Server Components.
pub struct ReferenceIndexed;

impl FacetStrategy for ReferenceIndexed {
    fn name(&self) -> &'static str {
        "reference-indexed"
    }

    fn try_extract(&self, scripts: &ScriptSet) -> Option<Extraction> {
        let keys = facet_reference_keys(scripts);
        if keys.is_empty() {
            return None;
        }
        debug!("Brand facet references: {:?}", keys);

        let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
        let lists = find_definitions(scripts, &wanted);

        for key in &keys {
            let Some(Value::Array(items)) = lists.get(key) else {
                debug!("Reference ${} has no list definition", key);
                continue;
            };
            return Some(resolve_items(scripts, items));
        }

        warn!("Brand facet references {:?} but none resolve to a list", keys);
        None
    }
}

/// Distinct reference keys of brand facets, in document order.
fn facet_reference_keys(scripts: &ScriptSet) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: &str| {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };

    for block in scripts.iter() {
        for facet in locate_facets(&block.text) {
            if let FacetValues::Reference(key) = facet {
                push(&key);
            }
        }
        for cap in FACET_REFERENCE.captures_iter(&block.text) {
            if let Some(key) = cap.get(1).or_else(|| cap.get(2)) {
                push(key.as_str());
            }
        }
    }

    keys
}

/// First parseable definition of every wanted key, across all blocks.
fn find_definitions(scripts: &ScriptSet, wanted: &HashSet<&str>) -> HashMap<String, Value> {
    let mut found: HashMap<String, Value> = HashMap::new();
    if wanted.is_empty() {
        return found;
    }

    for text in scripts.texts() {
        for cap in DEFINITION.captures_iter(text) {
            let (Some(key), Some(open)) = (cap.get(1), cap.get(2)) else {
                continue;
            };
            if !wanted.contains(key.as_str()) || found.contains_key(key.as_str()) {
                continue;
            }
            if let Some(value) = parse_at(text, open.start()) {
                found.insert(key.as_str().to_string(), value);
            }
        }
        if found.len() == wanted.len() {
            break;
        }
    }

    found
}

fn resolve_items(scripts: &ScriptSet, items: &[Value]) -> Extraction {
    let item_keys: HashSet<&str> = items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(reference_key)
        .collect();
    let definitions = find_definitions(scripts, &item_keys);

    let mut extraction = Extraction::new(Validation::Standard);
    for item in items {
        let resolved = match item {
            Value::String(s) => match reference_key(s) {
                Some(key) => match definitions.get(key) {
                    Some(definition) => RawEntry::from_value(definition),
                    None => {
                        extraction.missing_definitions += 1;
                        continue;
                    }
                },
                None => None,
            },
            Value::Object(object) => RawEntry::from_object(object),
            _ => None,
        };

        match resolved {
            Some(entry) => extraction.entries.push(entry),
            None => extraction.malformed += 1,
        }
    }

    if extraction.missing_definitions > 0 {
        warn!(
            "{} of {} referenced brand entries have no definition in the page",
            extraction.missing_definitions,
            items.len()
        );
    }
    extraction
}
