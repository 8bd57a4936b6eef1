//! Bulk evaluation of structured-extraction results.
//!
//! Two pieces: an assignment-based list matcher that pairs items from two
//! lists one-to-one under a similarity function, and a stateful engine that
//! folds per-document confusion-matrix trees into running totals keyed by
//! dotted field path, with checkpoint/restore and merge of partial states.

pub mod accumulator;
pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;
pub mod results_log;
pub mod similarity;
pub mod util;

pub use accumulator::FieldMetricsAccumulator;
pub use checkpoint::{load_checkpoint, save_checkpoint};
pub use engine::{
    BulkEvaluator, DocumentComparator, DocumentOutcome, EngineState, EvaluationAggregator,
    EvaluatorConfig,
};
pub use error::{Error, Result};
pub use matcher::{AssignmentMatcher, ListMatchMetrics, MatcherConfig, SimilarityMatrix};
pub use model::{
    ComparisonResult, ConfusionCounters, ConfusionMatrixResult, EvaluationSummary, MetricSet,
    ResultNode,
};
pub use normalize::{FieldValue, ValueNormalizer};
pub use report::{render_summary, save_metrics};
pub use similarity::{ExactMatch, FieldSimilarity, Similarity};
