//! Sequencing of one extraction run.
//!
//! ```text
//! START → FETCHED → PARSED → {FACET_FOUND | FACET_NOT_FOUND}
//! FACET_FOUND → NORMALIZED → {NONEMPTY_RESULT → DONE | EMPTY_RESULT → FALLBACK}
//! FACET_NOT_FOUND → FALLBACK
//! FALLBACK → PARSED (next strategy), or FAILED once the list is exhausted
//! ```

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, MergePolicy, SortOrder};
use crate::config::ExtractionConfig;
use crate::error::{ExtractError, ParseError};
use crate::models::{BrandTable, Diagnostic, RawDocument};
use crate::normalize::Normalizer;
use crate::parsers::{parse_document, ScriptSet};
use crate::strategies::{default_strategies, FacetStrategy};
use crate::utils::decode::decode_document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Start,
    Fetched,
    Parsed,
    FacetFound,
    FacetNotFound,
    Normalized,
    NonEmptyResult,
    EmptyResult,
    Fallback,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done {
        table: BrandTable,
        strategy: &'static str,
    },
    Failed,
}

/// Everything a run produced, consumed once by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
    pub trace: Vec<RunState>,
}

impl ExtractionResult {
    pub fn table(&self) -> Option<&BrandTable> {
        match &self.outcome {
            Outcome::Done { table, .. } => Some(table),
            Outcome::Failed => None,
        }
    }

    pub fn strategy(&self) -> Option<&'static str> {
        match &self.outcome {
            Outcome::Done { strategy, .. } => Some(strategy),
            Outcome::Failed => None,
        }
    }

    pub fn missing_definitions(&self) -> usize {
        self.diagnostics
            .iter()
            .map(|d| match d {
                Diagnostic::MissingDefinitions { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }
}

struct RunTrace {
    states: Vec<RunState>,
}

impl RunTrace {
    fn new() -> Self {
        Self {
            states: vec![RunState::Start],
        }
    }

    fn enter(&mut self, state: RunState) {
        debug!(
            "{:?} -> {:?}",
            self.states.last().copied().unwrap_or(RunState::Start),
            state
        );
        self.states.push(state);
    }
}

pub struct Pipeline {
    strategies: Vec<Box<dyn FacetStrategy>>,
    normalizer: Normalizer,
    merge_policy: MergePolicy,
    sort_order: SortOrder,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
            normalizer: Normalizer::default(),
            merge_policy: MergePolicy::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl Pipeline {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(config: &ExtractionConfig, strategies: Vec<Box<dyn FacetStrategy>>) -> Self {
        Self {
            strategies,
            normalizer: Normalizer::from_config(config),
            merge_policy: config.merge_policy,
            sort_order: config.sort_order,
        }
    }

    /// Decode, parse and extract a fetched document.
    pub fn run(&self, document: &RawDocument) -> Result<ExtractionResult, ExtractError> {
        let mut trace = RunTrace::new();
        trace.enter(RunState::Fetched);
        let mut diagnostics = Vec::new();

        let decoded = decode_document(document)?;
        if decoded.fallback {
            diagnostics.push(Diagnostic::DecodedWithFallback {
                encoding: decoded.encoding.to_string(),
            });
        }

        self.extract_into(&decoded.text, trace, diagnostics)
            .map_err(ExtractError::from)
    }

    /// Parse and extract already decoded HTML.
    pub fn extract_html(&self, html: &str) -> Result<ExtractionResult, ParseError> {
        let mut trace = RunTrace::new();
        trace.enter(RunState::Fetched);
        self.extract_into(html, trace, Vec::new())
    }

    fn extract_into(
        &self,
        html: &str,
        mut trace: RunTrace,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Result<ExtractionResult, ParseError> {
        let parsed = parse_document(html)?;
        if parsed.permissive {
            diagnostics.push(Diagnostic::PermissiveParse {
                scripts: parsed.scripts.len(),
            });
        }
        info!("Searching {} script blocks for the brand facet", parsed.scripts.len());

        let outcome = self.extract_scripts(&parsed.scripts, &mut trace, &mut diagnostics);
        Ok(ExtractionResult {
            outcome,
            diagnostics,
            trace: trace.states,
        })
    }

    /// Runs the strategy chain over the scripts. Starts in `Parsed`.
    fn extract_scripts(
        &self,
        scripts: &ScriptSet,
        trace: &mut RunTrace,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Outcome {
        trace.enter(RunState::Parsed);

        for (position, strategy) in self.strategies.iter().enumerate() {
            if position > 0 {
                trace.enter(RunState::Parsed);
            }
            let name = strategy.name();

            let Some(extraction) = strategy.try_extract(scripts) else {
                debug!("Strategy {} found no brand facet", name);
                trace.enter(RunState::FacetNotFound);
                diagnostics.push(Diagnostic::StrategyFailed {
                    strategy: name,
                    reason: "no brand facet found".to_string(),
                });
                trace.enter(RunState::Fallback);
                continue;
            };
            trace.enter(RunState::FacetFound);

            if extraction.missing_definitions > 0 {
                diagnostics.push(Diagnostic::MissingDefinitions {
                    strategy: name,
                    count: extraction.missing_definitions,
                });
            }
            if extraction.malformed > 0 {
                diagnostics.push(Diagnostic::MalformedEntries {
                    strategy: name,
                    count: extraction.malformed,
                });
            }

            let batch = self
                .normalizer
                .normalize_all(&extraction.entries, extraction.validation);
            trace.enter(RunState::Normalized);

            let rejected = batch.rejected_total();
            if rejected > 0 {
                debug!("Strategy {} rejected entries: {:?}", name, batch.rejected);
                diagnostics.push(Diagnostic::RejectedEntries {
                    strategy: name,
                    count: rejected,
                });
            }

            if batch.entries.is_empty() {
                trace.enter(RunState::EmptyResult);
                diagnostics.push(Diagnostic::StrategyFailed {
                    strategy: name,
                    reason: format!(
                        "{} raw entries, none valid",
                        extraction.entries.len()
                    ),
                });
                trace.enter(RunState::Fallback);
                continue;
            }
            trace.enter(RunState::NonEmptyResult);

            let aggregation = aggregate(batch.entries, self.merge_policy, self.sort_order);
            if aggregation.merged > 0 {
                diagnostics.push(Diagnostic::DuplicatesMerged {
                    count: aggregation.merged,
                    policy: self.merge_policy.to_string(),
                });
            }

            info!(
                "Strategy {} extracted {} brands (merge policy: {})",
                name,
                aggregation.table.len(),
                self.merge_policy
            );
            trace.enter(RunState::Done);
            return Outcome::Done {
                table: aggregation.table,
                strategy: name,
            };
        }

        warn!("No strategy found the brand facet");
        trace.enter(RunState::Failed);
        diagnostics.push(Diagnostic::FacetNotFound {
            scripts: scripts.len(),
        });
        Outcome::Failed
    }
}
