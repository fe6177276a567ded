use std::collections::BTreeMap;
use std::fmt;

use crate::config::ExtractionConfig;
use crate::models::{BrandEntry, RawCount, RawEntry};
use crate::parsers::clean_text;

/// How strictly a raw label is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Entries read from a located facet structure.
    Standard,
    /// Entries scraped by the flat regex; must also look like a brand token.
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rejection {
    EmptyName,
    NoLetter,
    Sentinel,
    InvalidCount,
    NotBrandLike,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyName => write!(f, "empty name"),
            Rejection::NoLetter => write!(f, "no letter in name"),
            Rejection::Sentinel => write!(f, "sentinel value"),
            Rejection::InvalidCount => write!(f, "invalid count"),
            Rejection::NotBrandLike => write!(f, "does not look like a brand"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub entries: Vec<BrandEntry>,
    pub rejected: BTreeMap<Rejection, usize>,
}

impl NormalizedBatch {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    sentinels: Vec<String>,
    strict_uppercase: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            sentinels: vec!["no".to_string(), "yes".to_string()],
            strict_uppercase: true,
        }
    }
}

impl Normalizer {
    pub fn new(sentinels: &[String], strict_uppercase: bool) -> Self {
        Self {
            sentinels: sentinels.iter().map(|s| s.trim().to_lowercase()).collect(),
            strict_uppercase,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.sentinels, config.strict_brand_heuristic)
    }

    pub fn normalize(&self, raw: &RawEntry, validation: Validation) -> Result<BrandEntry, Rejection> {
        let name = clean_text(&raw.label);

        if name.is_empty() {
            return Err(Rejection::EmptyName);
        }
        if !name.chars().any(char::is_alphabetic) {
            return Err(Rejection::NoLetter);
        }
        let lower = name.to_lowercase();
        if self.sentinels.iter().any(|s| *s == lower) {
            return Err(Rejection::Sentinel);
        }
        if validation == Validation::Heuristic && !self.looks_like_brand(&name) {
            return Err(Rejection::NotBrandLike);
        }

        let count = parse_count(&raw.count).ok_or(Rejection::InvalidCount)?;

        Ok(BrandEntry { name, count })
    }

    pub fn normalize_all(&self, raws: &[RawEntry], validation: Validation) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for raw in raws {
            match self.normalize(raw, validation) {
                Ok(entry) => batch.entries.push(entry),
                Err(reason) => *batch.rejected.entry(reason).or_insert(0) += 1,
            }
        }
        batch
    }

    // Known limitation: rejects lowercase and numeric brands such as "3INA".
    fn looks_like_brand(&self, name: &str) -> bool {
        if name.chars().any(|c| c.is_ascii_digit()) {
            return false;
        }
        if self.strict_uppercase {
            let mut cased = name.chars().filter(|c| c.is_lowercase() || c.is_uppercase());
            let first = cased.next();
            return first.is_some_and(char::is_uppercase) && cased.all(char::is_uppercase);
        }
        true
    }
}

fn parse_count(count: &RawCount) -> Option<u64> {
    match count {
        RawCount::Integer(i) => u64::try_from(*i).ok(),
        RawCount::Text(s) => s.trim().parse::<u64>().ok(),
    }
}
