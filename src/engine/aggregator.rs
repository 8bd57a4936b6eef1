use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::{Result, failure_kind};
use crate::model::{
    ComparisonResult, ErrorRecord, EvaluationSummary, MetricSet, NonMatchRecord,
};
use crate::results_log::append_result;
use crate::util::seconds_since;

use super::config::EvaluatorConfig;
use super::state::EngineState;

/// What happened to one document handed to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// The comparison result was folded into the running totals.
    Accumulated,
    /// The comparison failed; an error was recorded and the document counted as a miss.
    Failed,
    /// The comparison failed and error bookkeeping is disabled.
    Elided,
}

/// Owns the running evaluation state for one target schema.
///
/// Not meant for concurrent use: run one aggregator per worker and combine the
/// partial states with [`EvaluationAggregator::merge_state`].
#[derive(Debug, Clone)]
pub struct EvaluationAggregator {
    config: EvaluatorConfig,
    state: EngineState,
    non_matches: Vec<NonMatchRecord>,
}

impl EvaluationAggregator {
    pub fn new(target_schema: impl Into<String>, config: EvaluatorConfig) -> Self {
        let state = EngineState::new(target_schema);
        debug!(
            target_schema = %state.target_schema,
            results_log = ?config.results_log,
            "initialized evaluation aggregator"
        );
        Self {
            config,
            state,
            non_matches: Vec::new(),
        }
    }

    pub fn target_schema(&self) -> &str {
        &self.state.target_schema
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn processed_count(&self) -> u64 {
        self.state.processed_count
    }

    pub fn non_matches(&self) -> &[NonMatchRecord] {
        &self.non_matches
    }

    /// Clears counters, errors, non-matches and restarts the clock.
    pub fn reset(&mut self) {
        self.state = EngineState::new(self.state.target_schema.clone());
        self.non_matches.clear();
        debug!(target_schema = %self.state.target_schema, "reset evaluator state");
    }

    /// Identifier used for documents submitted without one.
    pub fn next_doc_id(&self) -> String {
        format!("doc_{}", self.state.processed_count)
    }

    /// Applies one document's comparison outcome.
    ///
    /// Success records non-matches, appends to the results log when
    /// configured, and accumulates the confusion matrix. Failure only touches
    /// the error list and the overall `fn` counter.
    pub fn ingest(
        &mut self,
        doc_id: &str,
        outcome: anyhow::Result<ComparisonResult>,
    ) -> DocumentOutcome {
        match outcome {
            Ok(result) => {
                self.accumulate_result(doc_id, &result);
                DocumentOutcome::Accumulated
            }
            Err(err) => self.record_failure(doc_id, &err),
        }
    }

    fn accumulate_result(&mut self, doc_id: &str, result: &ComparisonResult) {
        if self.config.document_non_matches {
            self.non_matches
                .extend(result.non_matches.iter().map(|non_match| NonMatchRecord {
                    doc_id: doc_id.to_string(),
                    non_match: non_match.clone(),
                }));
        }

        if let Some(path) = &self.config.results_log {
            // Best-effort: a failed write never blocks accumulation.
            if let Err(err) = append_result(path, doc_id, result) {
                warn!(doc_id, path = %path.display(), error = %err, "failed to append results log");
            }
        }

        self.state.confusion_matrix.accumulate(&result.confusion_matrix);
        self.state.processed_count = self.state.processed_count.saturating_add(1);

        let interval = self.config.progress_interval;
        if interval > 0 && self.state.processed_count % interval == 0 {
            info!(
                processed = self.state.processed_count,
                elapsed_seconds = seconds_since(self.state.start_time),
                "evaluation progress"
            );
        }
    }

    fn record_failure(&mut self, doc_id: &str, err: &anyhow::Error) -> DocumentOutcome {
        let error_kind = failure_kind(err);
        let message = format!("{err:#}");
        warn!(doc_id, error_kind, error = %message, "document comparison failed");

        if self.config.elide_errors {
            return DocumentOutcome::Elided;
        }

        self.state.errors.push(ErrorRecord {
            doc_id: doc_id.to_string(),
            error_kind: error_kind.to_string(),
            message,
        });
        // A document that cannot be compared counts as a total miss.
        let overall = &mut self.state.confusion_matrix.overall;
        overall.r#fn = overall.r#fn.saturating_add(1);
        DocumentOutcome::Failed
    }

    /// Summary of everything accumulated so far; state is left untouched.
    pub fn current_summary(&self) -> EvaluationSummary {
        let accumulator = &self.state.confusion_matrix;
        let field_metrics = accumulator
            .fields
            .iter()
            .map(|(path, counters)| (path.clone(), MetricSet::from(*counters)))
            .collect::<BTreeMap<String, MetricSet>>();

        EvaluationSummary {
            document_count: self.state.processed_count,
            overall: MetricSet::from(accumulator.overall),
            field_metrics,
            errors: self.state.errors.clone(),
            non_matches: self
                .config
                .document_non_matches
                .then(|| self.non_matches.clone()),
            elapsed_seconds: seconds_since(self.state.start_time),
        }
    }

    /// Same summary as [`Self::current_summary`], logged as the final result.
    pub fn compute(&self) -> EvaluationSummary {
        let summary = self.current_summary();
        info!(
            documents = summary.document_count,
            elapsed_seconds = summary.elapsed_seconds,
            accuracy = summary.overall.derived.accuracy,
            f1 = summary.overall.derived.f1,
            errors = summary.errors.len(),
            "evaluation computed"
        );
        summary
    }

    /// Independent copy of the running state.
    pub fn get_state(&self) -> EngineState {
        self.state.clone()
    }

    /// Replaces counters, errors, processed count and start time wholesale.
    pub fn restore_state(&mut self, state: EngineState) -> Result<()> {
        state.ensure_schema(&self.state.target_schema)?;
        state.validate()?;

        self.state = state;
        info!(
            processed = self.state.processed_count,
            "restored evaluator state"
        );
        Ok(())
    }

    /// Adds another engine's partial state into this one.
    pub fn merge_state(&mut self, other: &EngineState) -> Result<()> {
        self.state.merge(other)?;
        info!(
            merged = other.processed_count,
            processed = self.state.processed_count,
            "merged evaluator state"
        );
        Ok(())
    }
}
