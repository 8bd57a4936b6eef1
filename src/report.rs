//! Metrics report files and the plain-text summary.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::EvaluatorConfig;
use crate::error::Result;
use crate::model::{ErrorRecord, EvaluationSummary, MetricSet};
use crate::util::{now_utc_string, write_json_pretty};

const RULE_WIDTH: usize = 80;
const SECTION_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub total_documents_processed: u64,
    pub total_evaluation_time: f64,
    pub documents_per_second: f64,
    pub error_count: usize,
    pub error_rate: f64,
    pub target_schema: String,
}

impl RunStatistics {
    pub fn from_summary(summary: &EvaluationSummary, target_schema: &str) -> Self {
        let processed = summary.document_count;
        let elapsed = summary.elapsed_seconds;
        Self {
            total_documents_processed: processed,
            total_evaluation_time: elapsed,
            documents_per_second: if elapsed > 0.0 {
                processed as f64 / elapsed
            } else {
                0.0
            },
            error_count: summary.errors.len(),
            error_rate: if processed > 0 {
                summary.errors.len() as f64 / processed as f64
            } else {
                0.0
            },
            target_schema: target_schema.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub saved_at: String,
    pub evaluator_config: EvaluatorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub overall_metrics: MetricSet,
    pub field_metrics: BTreeMap<String, MetricSet>,
    pub evaluation_summary: RunStatistics,
    pub errors: Vec<ErrorRecord>,
    pub metadata: ReportMetadata,
}

impl MetricsReport {
    pub fn new(summary: &EvaluationSummary, target_schema: &str, config: &EvaluatorConfig) -> Self {
        Self {
            overall_metrics: summary.overall,
            field_metrics: summary.field_metrics.clone(),
            evaluation_summary: RunStatistics::from_summary(summary, target_schema),
            errors: summary.errors.clone(),
            metadata: ReportMetadata {
                saved_at: now_utc_string(),
                evaluator_config: config.clone(),
            },
        }
    }
}

pub fn save_metrics(
    path: &Path,
    summary: &EvaluationSummary,
    target_schema: &str,
    config: &EvaluatorConfig,
) -> Result<MetricsReport> {
    let report = MetricsReport::new(summary, target_schema, config);
    write_json_pretty(path, &report)?;
    info!(
        path = %path.display(),
        documents = summary.document_count,
        errors = summary.errors.len(),
        "wrote metrics report"
    );
    Ok(report)
}

/// Human-readable rendering of an [`EvaluationSummary`].
pub struct SummaryReport<'a> {
    pub summary: &'a EvaluationSummary,
    pub target_schema: &'a str,
    pub config: &'a EvaluatorConfig,
}

pub fn render_summary(
    summary: &EvaluationSummary,
    target_schema: &str,
    config: &EvaluatorConfig,
) -> String {
    SummaryReport {
        summary,
        target_schema,
        config,
    }
    .to_string()
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        let heavy_rule = "=".repeat(RULE_WIDTH);
        let light_rule = "-".repeat(SECTION_WIDTH);

        writeln!(f, "{heavy_rule}")?;
        writeln!(f, "BULK EVALUATION RESULTS - {}", self.target_schema)?;
        writeln!(f, "{heavy_rule}")?;

        writeln!(f, "\nOVERALL METRICS:")?;
        writeln!(f, "{light_rule}")?;
        writeln!(f, "Documents Processed: {}", summary.document_count)?;
        writeln!(f, "Evaluation Time: {:.2}s", summary.elapsed_seconds)?;
        if summary.elapsed_seconds > 0.0 {
            writeln!(
                f,
                "Processing Rate: {:.1} docs/sec",
                summary.document_count as f64 / summary.elapsed_seconds
            )?;
        } else {
            writeln!(f, "Processing Rate: N/A")?;
        }

        let counters = summary.overall.counters;
        writeln!(f, "\nCONFUSION MATRIX:")?;
        writeln!(f, "  True Positives (TP):   {}", counters.tp)?;
        writeln!(f, "  False Positives (FP):  {}", counters.fp)?;
        writeln!(f, "  True Negatives (TN):   {}", counters.tn)?;
        writeln!(f, "  False Negatives (FN):  {}", counters.r#fn)?;
        writeln!(f, "  False Discovery (FD):  {}", counters.fd)?;
        writeln!(f, "  False Alarm (FA):      {}", counters.fa)?;

        let derived = summary.overall.derived;
        writeln!(f, "\nDERIVED METRICS:")?;
        writeln!(f, "  Precision:  {:.4}", derived.precision)?;
        writeln!(f, "  Recall:     {:.4}", derived.recall)?;
        writeln!(f, "  F1 Score:   {:.4}", derived.f1)?;
        writeln!(f, "  Accuracy:   {:.4}", derived.accuracy)?;

        let active_fields = ranked_fields(&summary.field_metrics);
        if !active_fields.is_empty() {
            writeln!(f, "\nFIELD-LEVEL METRICS:")?;
            writeln!(f, "{light_rule}")?;
            for (path, metrics) in active_fields {
                writeln!(
                    f,
                    "  {path:30} P: {:.3} | R: {:.3} | F1: {:.3} | TP: {} | FP: {} | FN: {}",
                    metrics.derived.precision,
                    metrics.derived.recall,
                    metrics.derived.f1,
                    metrics.counters.tp,
                    metrics.counters.fp,
                    metrics.counters.r#fn,
                )?;
            }
        }

        if !summary.errors.is_empty() {
            writeln!(f, "\nERROR SUMMARY:")?;
            writeln!(f, "{light_rule}")?;
            writeln!(f, "Total Errors: {}", summary.errors.len())?;
            if summary.document_count > 0 {
                writeln!(
                    f,
                    "Error Rate: {:.2}%",
                    summary.errors.len() as f64 / summary.document_count as f64 * 100.0
                )?;
            } else {
                writeln!(f, "Error Rate: N/A")?;
            }
            writeln!(f, "Error Types:")?;
            for (kind, count) in errors_by_kind(&summary.errors) {
                writeln!(f, "  {kind}: {count}")?;
            }
        }

        writeln!(f, "\nCONFIGURATION:")?;
        writeln!(f, "{light_rule}")?;
        writeln!(f, "Target Schema: {}", self.target_schema)?;
        writeln!(
            f,
            "Document Non-matches: {}",
            yes_no(self.config.document_non_matches)
        )?;
        writeln!(f, "Elide Errors: {}", yes_no(self.config.elide_errors))?;
        if let Some(path) = &self.config.results_log {
            writeln!(f, "Results Log: {}", path.display())?;
        }
        write!(f, "{heavy_rule}")
    }
}

/// Fields with activity, best F1 first; ties by path.
fn ranked_fields(field_metrics: &BTreeMap<String, MetricSet>) -> Vec<(&str, &MetricSet)> {
    let mut fields = field_metrics
        .iter()
        .filter(|(_, metrics)| metrics.counters.has_activity())
        .map(|(path, metrics)| (path.as_str(), metrics))
        .collect::<Vec<_>>();
    fields.sort_by(|(left_path, left), (right_path, right)| {
        right
            .derived
            .f1
            .total_cmp(&left.derived.f1)
            .then_with(|| left_path.cmp(right_path))
    });
    fields
}

/// Error counts per kind, most frequent first.
fn errors_by_kind(errors: &[ErrorRecord]) -> Vec<(&str, usize)> {
    let mut counts = BTreeMap::<&str, usize>::new();
    for error in errors {
        *counts.entry(error.error_kind.as_str()).or_default() += 1;
    }
    let mut counts = counts.into_iter().collect::<Vec<_>>();
    counts.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(right.0)));
    counts
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}
