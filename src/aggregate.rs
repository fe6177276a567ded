use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::models::{BrandEntry, BrandTable};

/// How repeated observations of one brand are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Duplicates are redundant renderings of the same count.
    #[default]
    Max,
    FirstWins,
    /// Duplicates are disjoint partitions.
    Sum,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Max => write!(f, "max"),
            MergePolicy::FirstWins => write!(f, "first-wins"),
            MergePolicy::Sum => write!(f, "sum"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    CaseInsensitive,
    CaseSensitive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub table: BrandTable,
    /// Observations folded into an existing row.
    pub merged: usize,
}

/// Collapses entries to one row per brand (case-insensitive key, first spelling kept)
/// and sorts the rows. Ties keep encounter order.
pub fn aggregate(entries: Vec<BrandEntry>, policy: MergePolicy, order: SortOrder) -> Aggregation {
    let mut rows: Vec<BrandEntry> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut merged = 0;

    for entry in entries {
        let key = entry.name.to_lowercase();
        match positions.get(&key) {
            Some(&idx) => {
                let existing = &mut rows[idx];
                existing.count = match policy {
                    MergePolicy::Max => existing.count.max(entry.count),
                    MergePolicy::FirstWins => existing.count,
                    MergePolicy::Sum => existing.count.saturating_add(entry.count),
                };
                merged += 1;
            }
            None => {
                positions.insert(key, rows.len());
                rows.push(entry);
            }
        }
    }

    // sort_by is stable
    match order {
        SortOrder::CaseInsensitive => {
            rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        }
        SortOrder::CaseSensitive => rows.sort_by(|a, b| a.name.cmp(&b.name)),
    }

    Aggregation {
        table: BrandTable::from_sorted_rows(rows),
        merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entries(rows: &[(&str, u64)]) -> Vec<BrandEntry> {
        rows.iter().map(|(n, c)| BrandEntry::new(*n, *c)).collect()
    }

    fn pairs(table: &BrandTable) -> Vec<(String, u64)> {
        table.iter().map(|e| (e.name.clone(), e.count)).collect()
    }

    #[test]
    fn max_policy_keeps_largest_count() {
        let result = aggregate(
            entries(&[("ACME", 3), ("acme", 12), ("ACME", 7)]),
            MergePolicy::Max,
            SortOrder::CaseInsensitive,
        );
        assert_eq!(pairs(&result.table), vec![("ACME".to_string(), 12)]);
        assert_eq!(result.merged, 2);
    }

    #[test]
    fn first_wins_ignores_later_counts() {
        let result = aggregate(
            entries(&[("ACME", 3), ("ACME", 12)]),
            MergePolicy::FirstWins,
            SortOrder::CaseInsensitive,
        );
        assert_eq!(pairs(&result.table), vec![("ACME".to_string(), 3)]);
    }

    #[test]
    fn sum_adds_counts() {
        let result = aggregate(
            entries(&[("ACME", 3), ("ACME", 12)]),
            MergePolicy::Sum,
            SortOrder::CaseInsensitive,
        );
        assert_eq!(pairs(&result.table), vec![("ACME".to_string(), 15)]);
    }

    #[test]
    fn case_insensitive_order_interleaves_cases() {
        let result = aggregate(
            entries(&[("benefit", 1), ("Anastasia", 2), ("CLINIQUE", 3)]),
            MergePolicy::Max,
            SortOrder::CaseInsensitive,
        );
        let names: Vec<_> = result.table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Anastasia", "benefit", "CLINIQUE"]);
    }

    #[test]
    fn case_sensitive_order_puts_uppercase_first() {
        let result = aggregate(
            entries(&[("benefit", 1), ("Anastasia", 2), ("CLINIQUE", 3)]),
            MergePolicy::Max,
            SortOrder::CaseSensitive,
        );
        let names: Vec<_> = result.table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Anastasia", "CLINIQUE", "benefit"]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = entries(&[("B", 1), ("A", 2), ("b", 4)]);
        let first = aggregate(input.clone(), MergePolicy::Max, SortOrder::CaseInsensitive);
        let second = aggregate(input, MergePolicy::Max, SortOrder::CaseInsensitive);
        assert_eq!(first, second);

        let again = aggregate(
            first.table.rows().to_vec(),
            MergePolicy::Max,
            SortOrder::CaseInsensitive,
        );
        assert_eq!(again.table, first.table);
        assert_eq!(again.merged, 0);
    }
}
