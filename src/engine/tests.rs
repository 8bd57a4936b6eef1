use std::collections::BTreeSet;

use anyhow::bail;
use serde_json::{Value, json};

use super::*;
use crate::error::Error;
use crate::model::{
    ComparisonResult, ConfusionCounters, ConfusionMatrixResult, NonMatch, ResultNode,
};

/// Compares top-level keys of two JSON objects by equality.
struct FlatComparator {
    schema: &'static str,
}

impl FlatComparator {
    fn invoice() -> Self {
        Self { schema: "Invoice" }
    }
}

impl DocumentComparator for FlatComparator {
    type Document = Value;

    fn target_schema(&self) -> &str {
        self.schema
    }

    fn compare(
        &self,
        ground_truth: &Value,
        prediction: &Value,
        document_non_matches: bool,
    ) -> anyhow::Result<ComparisonResult> {
        let (Some(expected), Some(predicted)) = (ground_truth.as_object(), prediction.as_object())
        else {
            bail!("documents must be JSON objects");
        };

        let mut matrix = ConfusionMatrixResult::default();
        let mut non_matches = Vec::new();
        let keys = expected
            .keys()
            .chain(predicted.keys())
            .collect::<BTreeSet<&String>>();

        for key in keys {
            let (counters, kind) = match (expected.get(key), predicted.get(key)) {
                (Some(left), Some(right)) if left == right => {
                    (ConfusionCounters::new(1, 0, 0, 0, 0, 0), None)
                }
                (Some(_), Some(_)) => (ConfusionCounters::new(0, 1, 0, 0, 0, 1), Some("false_alarm")),
                (Some(_), None) => (ConfusionCounters::new(0, 0, 0, 1, 0, 0), Some("false_negative")),
                (None, Some(_)) => (ConfusionCounters::new(0, 1, 0, 0, 1, 0), Some("false_discovery")),
                (None, None) => continue,
            };

            if let Some(kind) = kind {
                non_matches.push(NonMatch {
                    field_path: key.clone(),
                    non_match_type: kind.to_string(),
                    ground_truth_value: expected.get(key).cloned().unwrap_or(Value::Null),
                    prediction_value: predicted.get(key).cloned().unwrap_or(Value::Null),
                    similarity_score: None,
                });
            }
            matrix.overall += counters;
            matrix.fields.insert(key.clone(), ResultNode::leaf(counters));
        }

        if !document_non_matches {
            non_matches.clear();
        }
        Ok(ComparisonResult::new(matrix).with_non_matches(non_matches))
    }
}

/// Replays a prepared result or error for every document.
struct FixedComparator {
    result: Option<ComparisonResult>,
}

impl DocumentComparator for FixedComparator {
    type Document = ();

    fn target_schema(&self) -> &str {
        "Invoice"
    }

    fn compare(&self, _: &(), _: &(), _: bool) -> anyhow::Result<ComparisonResult> {
        match &self.result {
            Some(result) => Ok(result.clone()),
            None => Err(Error::invalid_input("unsupported currency").into()),
        }
    }
}

fn evaluator() -> BulkEvaluator<FlatComparator> {
    BulkEvaluator::new(FlatComparator::invoice(), EvaluatorConfig::default())
}

fn nested_city_result() -> ComparisonResult {
    serde_json::from_value(json!({
        "confusion_matrix": {
            "overall": {"tp": 1},
            "fields": {"address": {"fields": {"city": {"tp": 1}}}}
        }
    }))
    .expect("fixture should parse")
}

#[test]
fn successful_update_accumulates_overall_and_field_counters() {
    let mut engine = evaluator();
    let outcome = engine.update(
        &json!({"number": "INV-1", "total": "10.00"}),
        &json!({"number": "INV-1", "total": "12.00"}),
        Some("inv-1"),
    );

    assert_eq!(outcome, DocumentOutcome::Accumulated);
    let summary = engine.current_summary();
    assert_eq!(summary.document_count, 1);
    assert_eq!(summary.overall.counters, ConfusionCounters::new(1, 1, 0, 0, 0, 1));
    assert_eq!(summary.field_metrics["number"].counters.tp, 1);
    assert_eq!(summary.field_metrics["total"].counters.fa, 1);
}

#[test]
fn failed_comparison_is_recorded_as_a_miss() {
    let mut engine = evaluator();
    let outcome = engine.update(&json!("not an object"), &json!({}), Some("broken"));

    assert_eq!(outcome, DocumentOutcome::Failed);
    let summary = engine.current_summary();
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].doc_id, "broken");
    assert_eq!(summary.errors[0].error_kind, "ComparisonFailure");
    assert!(summary.errors[0].message.contains("JSON objects"));
    assert_eq!(summary.overall.counters.r#fn, 1);
    assert_eq!(summary.document_count, 0);
    assert!(summary.field_metrics.is_empty());
}

#[test]
fn elided_failures_leave_no_trace() {
    let mut engine = BulkEvaluator::new(
        FlatComparator::invoice(),
        EvaluatorConfig::default().with_elide_errors(true),
    );
    let outcome = engine.update(&json!(null), &json!({}), None);

    assert_eq!(outcome, DocumentOutcome::Elided);
    let summary = engine.current_summary();
    assert!(summary.errors.is_empty());
    assert_eq!(summary.overall.counters, ConfusionCounters::default());
}

#[test]
fn crate_errors_from_the_comparator_keep_their_kind() {
    let mut engine = BulkEvaluator::new(FixedComparator { result: None }, EvaluatorConfig::default());
    engine.update(&(), &(), Some("eur"));

    let state = engine.get_state();
    assert_eq!(state.errors[0].error_kind, "InvalidInput");
    assert!(state.errors[0].message.contains("unsupported currency"));
}

#[test]
fn missing_doc_ids_default_to_processed_position() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 2}), None);
    engine.update(&json!({"a": 1}), &json!({"b": 1}), None);

    let summary = engine.current_summary();
    let non_matches = summary.non_matches.expect("non-matches are documented by default");
    let doc_ids = non_matches
        .iter()
        .map(|record| record.doc_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(doc_ids, vec!["doc_0", "doc_1", "doc_1"]);
    assert_eq!(non_matches[1].non_match.non_match_type, "false_negative");
}

#[test]
fn non_matches_are_omitted_when_not_documented() {
    let mut engine = BulkEvaluator::new(
        FlatComparator::invoice(),
        EvaluatorConfig::default().with_document_non_matches(false),
    );
    engine.update(&json!({"a": 1}), &json!({"a": 2}), None);

    assert!(engine.current_summary().non_matches.is_none());
}

#[test]
fn nested_paths_accumulate_across_updates() {
    let mut engine = BulkEvaluator::new(
        FixedComparator {
            result: Some(nested_city_result()),
        },
        EvaluatorConfig::default(),
    );
    engine.update(&(), &(), None);
    engine.update(&(), &(), None);

    let summary = engine.compute();
    assert_eq!(summary.field_metrics["address.city"].counters.tp, 2);
    assert!(!summary.field_metrics.contains_key("address"));
}

#[test]
fn results_log_receives_one_line_per_successful_document() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let log_path = dir.path().join("results.jsonl");
    let mut engine = BulkEvaluator::new(
        FlatComparator::invoice(),
        EvaluatorConfig::default().with_results_log(&log_path),
    );

    engine.update(&json!({"a": 1}), &json!({"a": 1}), Some("first"));
    engine.update(&json!(1), &json!(2), Some("failed"));
    engine.update(&json!({"a": 1}), &json!({"a": 3}), Some("second"));

    let entries = crate::results_log::read_results(&log_path).expect("log should parse");
    let ids = entries
        .iter()
        .map(|entry| entry.doc_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["first", "second"]);
    assert_eq!(entries[1].comparison_result.non_matches.len(), 1);
}

#[test]
fn results_log_failures_do_not_block_accumulation() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let mut engine = BulkEvaluator::new(
        FlatComparator::invoice(),
        EvaluatorConfig::default().with_results_log(dir.path()),
    );

    let outcome = engine.update(&json!({"a": 1}), &json!({"a": 1}), None);

    assert_eq!(outcome, DocumentOutcome::Accumulated);
    assert_eq!(engine.processed_count(), 1);
    assert_eq!(engine.current_summary().overall.counters.tp, 1);
}

#[test]
fn returned_state_is_independent_of_the_engine() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 1}), None);

    let mut snapshot = engine.get_state();
    snapshot.processed_count = 99;
    snapshot.confusion_matrix.add_path("a", ConfusionCounters::new(5, 0, 0, 0, 0, 0));
    snapshot.errors.clear();

    let live = engine.get_state();
    assert_eq!(live.processed_count, 1);
    assert_eq!(live.confusion_matrix.fields["a"].tp, 1);
}

#[test]
fn restoring_a_snapshot_round_trips_the_state() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1, "b": 2}), &json!({"a": 1}), Some("one"));
    engine.update(&json!(false), &json!({}), Some("bad"));
    let snapshot = engine.get_state();

    engine.update(&json!({"c": 1}), &json!({"c": 1}), Some("two"));
    engine
        .restore_state(snapshot.clone())
        .expect("same-schema restore should succeed");

    assert_eq!(engine.get_state(), snapshot);
}

#[test]
fn restore_rejects_a_foreign_schema_without_changes() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 1}), None);
    let before = engine.get_state();

    let mut foreign = before.clone();
    foreign.target_schema = "Receipt".to_string();
    foreign.processed_count = 10;

    let error = engine
        .restore_state(foreign)
        .expect_err("foreign schema should be rejected");
    assert!(matches!(error, Error::SchemaMismatch { .. }));
    assert_eq!(engine.get_state(), before);
}

#[test]
fn restore_rejects_malformed_field_paths() {
    let mut engine = evaluator();
    let mut state = engine.get_state();
    state
        .confusion_matrix
        .add_path("address..city", ConfusionCounters::new(1, 0, 0, 0, 0, 0));

    let error = engine
        .restore_state(state)
        .expect_err("malformed path should be rejected");
    assert_eq!(error.kind(), "InvalidInput");
    assert_eq!(engine.processed_count(), 0);
}

#[test]
fn merge_is_associative_and_commutative_over_counters() {
    let mut a = evaluator();
    a.update(&json!({"x": 1, "y": 2}), &json!({"x": 1}), None);
    let mut b = evaluator();
    b.update(&json!({"x": 1}), &json!({"x": 2, "z": 3}), None);
    b.update(&json!(0), &json!(0), Some("b-bad"));
    let mut c = evaluator();
    c.update(&json!({"y": 2}), &json!({"y": 2}), None);

    let (a, b, c) = (a.get_state(), b.get_state(), c.get_state());

    let mut left = a.clone();
    left.merge(&b).expect("merge a+b");
    left.merge(&c).expect("merge (a+b)+c");

    let mut bc = b.clone();
    bc.merge(&c).expect("merge b+c");
    let mut right = a.clone();
    right.merge(&bc).expect("merge a+(b+c)");

    let mut shuffled = c.clone();
    shuffled.merge(&a).expect("merge c+a");
    shuffled.merge(&b).expect("merge (c+a)+b");

    assert_eq!(left.confusion_matrix, right.confusion_matrix);
    assert_eq!(left.confusion_matrix, shuffled.confusion_matrix);
    assert_eq!(left.processed_count, 3);
    assert_eq!(shuffled.processed_count, 3);
    assert_eq!(left.errors.len(), 1);
}

#[test]
fn engine_merge_matches_sequential_processing() {
    let documents = [
        (json!({"a": 1}), json!({"a": 1})),
        (json!({"a": 1, "b": 2}), json!({"b": 3})),
        (json!({"c": 1}), json!({})),
    ];

    let mut sequential = evaluator();
    for (gt, pred) in &documents {
        sequential.update(gt, pred, None);
    }

    let mut first = evaluator();
    first.update(&documents[0].0, &documents[0].1, None);
    let mut second = evaluator();
    second.update(&documents[1].0, &documents[1].1, None);
    second.update(&documents[2].0, &documents[2].1, None);

    first
        .merge_state(&second.get_state())
        .expect("same-schema merge should succeed");

    assert_eq!(
        first.get_state().confusion_matrix,
        sequential.get_state().confusion_matrix
    );
    assert_eq!(first.processed_count(), 3);
}

#[test]
fn merge_rejects_a_foreign_schema_without_changes() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 1}), None);
    let before = engine.get_state();

    let other = BulkEvaluator::new(
        FlatComparator { schema: "Receipt" },
        EvaluatorConfig::default(),
    );
    let error = engine
        .merge_state(&other.get_state())
        .expect_err("foreign schema should be rejected");

    assert_eq!(error.kind(), "SchemaMismatch");
    assert_eq!(engine.get_state(), before);
}

#[test]
fn reset_clears_everything() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 2}), None);
    engine.update(&json!(1), &json!(1), None);

    engine.reset();

    let summary = engine.current_summary();
    assert_eq!(summary.document_count, 0);
    assert!(summary.errors.is_empty());
    assert_eq!(summary.non_matches, Some(Vec::new()));
    assert_eq!(summary.overall.counters, ConfusionCounters::default());
    assert!(summary.field_metrics.is_empty());
    assert_eq!(engine.target_schema(), "Invoice");
}

#[test]
fn compute_does_not_clear_state() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 1}), None);

    let first = engine.compute();
    let second = engine.current_summary();

    assert_eq!(first.document_count, second.document_count);
    assert_eq!(first.overall, second.overall);
    assert_eq!(first.field_metrics, second.field_metrics);
}

#[test]
fn update_batch_applies_each_document_in_order() {
    let gt = [json!({"a": 1}), json!("bad"), json!({"b": 1})];
    let pred = [json!({"a": 1}), json!({}), json!({"b": 1})];

    let mut engine = evaluator();
    let counts = engine.update_batch(
        gt.iter()
            .zip(pred.iter())
            .map(|(gt, pred)| (gt, pred, None)),
    );

    assert_eq!(
        counts,
        BatchCounts {
            accumulated: 2,
            failed: 1,
            elided: 0
        }
    );
    assert_eq!(engine.processed_count(), 2);
    assert_eq!(engine.get_state().errors[0].doc_id, "doc_1");
}

#[test]
fn pair_file_evaluation_skips_bad_rows_and_resets_first() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("pairs.jsonl");
    let rows = [
        json!({"doc_id": "a", "expected": {"x": 1}, "predicted": {"x": 1}}).to_string(),
        "not json".to_string(),
        json!({"expected": "{\"x\": 2}", "predicted": "{\"x\": 3}"}).to_string(),
        json!({"expected": "{broken", "predicted": {}}).to_string(),
    ];
    std::fs::write(&path, rows.join("\n")).expect("fixture write");

    let mut engine = evaluator();
    engine.update(&json!({"stale": 1}), &json!({"stale": 1}), None);

    let summary = engine
        .evaluate_pairs_file(&path)
        .expect("pair file should evaluate");

    assert_eq!(summary.document_count, 2);
    assert!(!summary.field_metrics.contains_key("stale"));
    assert_eq!(summary.field_metrics["x"].counters, ConfusionCounters::new(1, 1, 0, 0, 0, 1));
    let non_matches = summary.non_matches.expect("non-matches documented");
    assert_eq!(non_matches[0].doc_id, "row_2");
}

#[test]
fn engine_state_json_round_trip_preserves_everything() {
    let mut engine = evaluator();
    engine.update(&json!({"a": 1}), &json!({"a": 2}), Some("x"));
    engine.update(&json!(1), &json!(2), Some("y"));
    let state = engine.get_state();

    let raw = serde_json::to_string(&state).expect("state should serialize");
    let restored = EngineState::from_json_str(&raw).expect("state should parse");

    assert_eq!(restored, state);
}

#[test]
fn malformed_state_json_is_invalid_input() {
    let error = EngineState::from_json_str("{\"target_schema\": \"Invoice\"}")
        .expect_err("incomplete state should fail");
    assert_eq!(error.kind(), "InvalidInput");
}

fn saturated_state() -> EngineState {
    let mut state = EngineState::new("Invoice");
    state.confusion_matrix.overall = ConfusionCounters::new(u64::MAX, 1, 0, 0, 0, 0);
    state
        .confusion_matrix
        .add_path("total", ConfusionCounters::new(u64::MAX, 0, u64::MAX, 1, 0, 0));
    state.processed_count = 3;
    state
}

#[test]
fn summaries_of_saturated_counters_do_not_overflow() {
    let mut engine = evaluator();
    engine
        .restore_state(saturated_state())
        .expect("large counters are structurally valid");

    let summary = engine.current_summary();

    assert_eq!(summary.overall.counters.tp, u64::MAX);
    assert!(summary.overall.derived.precision > 0.99);
    assert!(summary.field_metrics["total"].derived.accuracy > 0.99);
}

#[test]
fn failures_after_saturation_keep_the_miss_counter_pinned() {
    let mut engine = evaluator();
    let mut state = saturated_state();
    state.confusion_matrix.overall.r#fn = u64::MAX;
    engine.restore_state(state).expect("restore should succeed");

    engine.update(&json!(1), &json!(1), Some("late"));

    assert_eq!(engine.get_state().confusion_matrix.overall.r#fn, u64::MAX);
}

#[test]
fn overflowing_merge_is_rejected_without_changes() {
    let mut engine = evaluator();
    engine
        .restore_state(saturated_state())
        .expect("restore should succeed");
    let before = engine.get_state();

    let mut other = EngineState::new("Invoice");
    other
        .confusion_matrix
        .add_path("total", ConfusionCounters::new(1, 0, 0, 0, 0, 0));
    other.processed_count = 1;

    let error = engine
        .merge_state(&other)
        .expect_err("overflowing merge should fail");

    assert_eq!(error.kind(), "InvalidInput");
    assert!(error.to_string().contains("\"total\""));
    assert_eq!(engine.get_state(), before);
}

#[test]
fn overflowing_processed_count_is_rejected() {
    let mut state = EngineState::new("Invoice");
    state.processed_count = u64::MAX;
    let mut other = EngineState::new("Invoice");
    other.processed_count = 1;
    let before = state.clone();

    let error = state.merge(&other).expect_err("overflowing count should fail");

    assert_eq!(error.kind(), "InvalidInput");
    assert_eq!(state, before);
}
