use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Extraction, FacetStrategy};
use crate::models::{RawCount, RawEntry};
use crate::normalize::Validation;
use crate::parsers::{decode_literal, ScriptSet};

// Optional backslashes before quotes so escaped payloads match too. `[^{}]`
// keeps a pair from spanning two objects. The label body keeps its escapes
// (`\u0026`) up to the closing quote and is decoded afterwards.
static HIT_THEN_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\bhitCount\\*"\s*:\s*\\*"?(\d+)\\*"?\s*,[^{}]{0,200}?\blabel\\*"\s*:\s*\\*"((?:[^"\\]|\\[^"])+?)\\*""#,
    )
    .expect("Invalid hitCount/label regex")
});

static LABEL_THEN_HIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\blabel\\*"\s*:\s*\\*"((?:[^"\\]|\\[^"])+?)\\*"\s*,[^{}]{0,200}?\bhitCount\\*"\s*:\s*\\*"?(\d+)"#,
    )
    .expect("Invalid label/hitCount regex")
});

/// Last resort: harvest `hitCount`/`label` pairs straight from the raw text,
/// without needing any valid JSON.
pub struct FlatRegex;

impl FacetStrategy for FlatRegex {
    fn name(&self) -> &'static str {
        "flat-regex"
    }

    fn try_extract(&self, scripts: &ScriptSet) -> Option<Extraction> {
        let mut extraction = Extraction::new(Validation::Heuristic);

        for block in scripts.iter() {
            let mut pairs: Vec<(usize, RawEntry)> = Vec::new();

            for cap in HIT_THEN_LABEL.captures_iter(&block.text) {
                if let (Some(all), Some(count), Some(label)) = (cap.get(0), cap.get(1), cap.get(2)) {
                    pairs.push((all.start(), entry(label.as_str(), count.as_str())));
                }
            }
            for cap in LABEL_THEN_HIT.captures_iter(&block.text) {
                if let (Some(all), Some(label), Some(count)) = (cap.get(0), cap.get(1), cap.get(2)) {
                    pairs.push((all.start(), entry(label.as_str(), count.as_str())));
                }
            }

            if !pairs.is_empty() {
                debug!("Script #{}: flat regex matched {} pairs", block.index, pairs.len());
            }
            // keep text order within a block
            pairs.sort_by_key(|(offset, _)| *offset);
            extraction.entries.extend(pairs.into_iter().map(|(_, entry)| entry));
        }

        if extraction.entries.is_empty() {
            None
        } else {
            Some(extraction)
        }
    }
}

fn entry(label: &str, count: &str) -> RawEntry {
    RawEntry::new(decode_literal(label), RawCount::Text(count.to_string()))
}
