use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{ComparisonResult, EvaluationSummary};
use crate::util::read_to_string;

use super::aggregator::{DocumentOutcome, EvaluationAggregator};
use super::config::EvaluatorConfig;
use super::state::EngineState;

/// External structured-document comparison.
///
/// Implementations compare one ground-truth document against one prediction
/// and report a confusion-matrix tree. `target_schema` identifies the document
/// schema; checkpoints are only interchangeable between equal identities.
pub trait DocumentComparator {
    type Document: ?Sized;

    fn target_schema(&self) -> &str;

    fn compare(
        &self,
        ground_truth: &Self::Document,
        prediction: &Self::Document,
        document_non_matches: bool,
    ) -> anyhow::Result<ComparisonResult>;
}

impl<C: DocumentComparator + ?Sized> DocumentComparator for &C {
    type Document = C::Document;

    fn target_schema(&self) -> &str {
        (**self).target_schema()
    }

    fn compare(
        &self,
        ground_truth: &Self::Document,
        prediction: &Self::Document,
        document_non_matches: bool,
    ) -> anyhow::Result<ComparisonResult> {
        (**self).compare(ground_truth, prediction, document_non_matches)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchCounts {
    pub accumulated: usize,
    pub failed: usize,
    pub elided: usize,
}

impl BatchCounts {
    fn record(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Accumulated => self.accumulated += 1,
            DocumentOutcome::Failed => self.failed += 1,
            DocumentOutcome::Elided => self.elided += 1,
        }
    }
}

/// Stateful evaluator that drives a [`DocumentComparator`] document by
/// document and keeps the running totals in an [`EvaluationAggregator`].
#[derive(Debug, Clone)]
pub struct BulkEvaluator<C> {
    comparator: C,
    aggregator: EvaluationAggregator,
}

impl<C: DocumentComparator> BulkEvaluator<C> {
    pub fn new(comparator: C, config: EvaluatorConfig) -> Self {
        let aggregator = EvaluationAggregator::new(comparator.target_schema(), config);
        Self {
            comparator,
            aggregator,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn aggregator(&self) -> &EvaluationAggregator {
        &self.aggregator
    }

    pub fn target_schema(&self) -> &str {
        self.aggregator.target_schema()
    }

    pub fn processed_count(&self) -> u64 {
        self.aggregator.processed_count()
    }

    pub fn reset(&mut self) {
        self.aggregator.reset();
    }

    /// Compares one document pair and folds the outcome into the totals.
    pub fn update(
        &mut self,
        ground_truth: &C::Document,
        prediction: &C::Document,
        doc_id: Option<&str>,
    ) -> DocumentOutcome {
        let doc_id = doc_id
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| self.aggregator.next_doc_id());

        let outcome = self.comparator.compare(
            ground_truth,
            prediction,
            self.aggregator.config().document_non_matches,
        );
        self.aggregator.ingest(&doc_id, outcome)
    }

    pub fn update_batch<'a, I>(&mut self, batch: I) -> BatchCounts
    where
        I: IntoIterator<Item = (&'a C::Document, &'a C::Document, Option<&'a str>)>,
        C::Document: 'a,
    {
        let mut counts = BatchCounts::default();
        for (ground_truth, prediction, doc_id) in batch {
            counts.record(self.update(ground_truth, prediction, doc_id));
        }

        debug!(
            accumulated = counts.accumulated,
            failed = counts.failed,
            elided = counts.elided,
            "processed batch"
        );
        counts
    }

    pub fn current_summary(&self) -> EvaluationSummary {
        self.aggregator.current_summary()
    }

    pub fn compute(&self) -> EvaluationSummary {
        self.aggregator.compute()
    }

    pub fn get_state(&self) -> EngineState {
        self.aggregator.get_state()
    }

    pub fn restore_state(&mut self, state: EngineState) -> Result<()> {
        self.aggregator.restore_state(state)
    }

    pub fn merge_state(&mut self, other: &EngineState) -> Result<()> {
        self.aggregator.merge_state(other)
    }
}

#[derive(Debug, Deserialize)]
struct PairRow {
    #[serde(default)]
    doc_id: Option<String>,
    expected: Value,
    predicted: Value,
}

impl<C: DocumentComparator<Document = Value>> BulkEvaluator<C> {
    /// Resets, then evaluates a JSON-lines file of
    /// `{"doc_id"?, "expected", "predicted"}` rows.
    ///
    /// `expected`/`predicted` may be documents or JSON-encoded strings. Rows
    /// that fail to parse are skipped with a warning.
    pub fn evaluate_pairs_file(&mut self, path: &Path) -> Result<EvaluationSummary> {
        let raw = read_to_string(path)?;
        self.reset();

        let mut skipped = 0_usize;
        for (index, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let row = match parse_pair_row(line) {
                Ok(row) => row,
                Err(err) => {
                    warn!(row = index, error = %err, "skipping unparseable pair row");
                    skipped += 1;
                    continue;
                }
            };

            let doc_id = row.doc_id.unwrap_or_else(|| format!("row_{index}"));
            self.update(&row.expected, &row.predicted, Some(doc_id.as_str()));
        }

        info!(
            path = %path.display(),
            processed = self.processed_count(),
            skipped,
            "evaluated pair file"
        );
        Ok(self.compute())
    }
}

fn parse_pair_row(line: &str) -> serde_json::Result<PairRow> {
    let mut row = serde_json::from_str::<PairRow>(line)?;
    row.expected = decode_document(row.expected)?;
    row.predicted = decode_document(row.predicted)?;
    Ok(row)
}

fn decode_document(value: Value) -> serde_json::Result<Value> {
    match value {
        Value::String(encoded) => serde_json::from_str(&encoded),
        other => Ok(other),
    }
}
