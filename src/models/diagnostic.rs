use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
}

/// Something a run wants the user to know about, collected instead of shown inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    DecodedWithFallback { encoding: String },
    PermissiveParse { scripts: usize },
    StrategyFailed { strategy: &'static str, reason: String },
    MissingDefinitions { strategy: &'static str, count: usize },
    MalformedEntries { strategy: &'static str, count: usize },
    RejectedEntries { strategy: &'static str, count: usize },
    DuplicatesMerged { count: usize, policy: String },
    FacetNotFound { scripts: usize },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::DecodedWithFallback { .. }
            | Diagnostic::PermissiveParse { .. }
            | Diagnostic::StrategyFailed { .. }
            | Diagnostic::RejectedEntries { .. }
            | Diagnostic::DuplicatesMerged { .. } => Severity::Info,
            Diagnostic::MissingDefinitions { .. }
            | Diagnostic::MalformedEntries { .. }
            | Diagnostic::FacetNotFound { .. } => Severity::Warning,
        }
    }

    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Diagnostic::FacetNotFound { .. } => Some(
                "Re-save the page after it has fully loaded (scroll once so the filters render), \
                 then pass the saved .html file. The brand list may also be loaded by a later API call \
                 that a saved page does not contain.",
            ),
            Diagnostic::MissingDefinitions { .. } => Some(
                "Some brand entries live in script fragments that were not in the page. \
                 Re-save the complete page (\"Web page, complete\") and try again.",
            ),
            Diagnostic::DecodedWithFallback { .. } => {
                Some("Save the page as UTF-8 if brand names look garbled.")
            }
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DecodedWithFallback { encoding } => {
                write!(f, "page was not valid UTF-8, decoded as {}", encoding)
            }
            Diagnostic::PermissiveParse { scripts } => write!(
                f,
                "HTML parser found no script elements, permissive scan recovered {} script(s)",
                scripts
            ),
            Diagnostic::StrategyFailed { strategy, reason } => {
                write!(f, "{}: {}", strategy, reason)
            }
            Diagnostic::MissingDefinitions { strategy, count } => write!(
                f,
                "{}: {} referenced brand entr{} had no definition in the page and {} dropped",
                strategy,
                count,
                if *count == 1 { "y" } else { "ies" },
                if *count == 1 { "was" } else { "were" }
            ),
            Diagnostic::MalformedEntries { strategy, count } => write!(
                f,
                "{}: {} facet value(s) lacked a label or a hit count",
                strategy, count
            ),
            Diagnostic::RejectedEntries { strategy, count } => write!(
                f,
                "{}: {} entr{} rejected as not a brand",
                strategy,
                count,
                if *count == 1 { "y" } else { "ies" }
            ),
            Diagnostic::DuplicatesMerged { count, policy } => write!(
                f,
                "{} duplicate brand observation(s) merged using the {} policy",
                count, policy
            ),
            Diagnostic::FacetNotFound { scripts } => write!(
                f,
                "no brand facet found in {} script block(s)",
                scripts
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_definitions_message_reports_count() {
        let diagnostic = Diagnostic::MissingDefinitions {
            strategy: "reference-indexed",
            count: 1,
        };
        assert_eq!(
            diagnostic.to_string(),
            "reference-indexed: 1 referenced brand entry had no definition in the page and was dropped"
        );
        assert_eq!(diagnostic.severity(), Severity::Warning);
        assert!(diagnostic.remediation().is_some());
    }

    #[test]
    fn not_found_carries_remediation() {
        let diagnostic = Diagnostic::FacetNotFound { scripts: 4 };
        assert!(diagnostic.remediation().unwrap().contains("fully loaded"));
    }
}
