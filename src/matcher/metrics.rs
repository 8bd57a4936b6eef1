use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{f1_score, ratio_or_zero};
use crate::normalize::{FieldValue, ValueNormalizer};
use crate::similarity::{Similarity, checked_score};

use super::assignment::{Assignment, MatchedPair, SimilarityMatrix, optimal_assignment};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.7;
pub const DEFAULT_SIZE_WARNING_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum assigned score that counts as a true positive.
    pub match_threshold: f64,
    /// Matrix size (`rows * columns`) above which a warning is logged.
    pub size_warning_threshold: usize,
    /// Canonicalize primitive values before comparison.
    pub normalize_values: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            size_warning_threshold: DEFAULT_SIZE_WARNING_THRESHOLD,
            normalize_values: true,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.match_threshold.is_finite() || !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(Error::invalid_input(format!(
                "match threshold {} must be within [0, 1]",
                self.match_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListMatchMetrics {
    pub matched_pairs: Vec<MatchedPair>,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub r#fn: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ListMatchMetrics {
    fn all_matched() -> Self {
        Self {
            matched_pairs: Vec::new(),
            tp: 0,
            fp: 0,
            r#fn: 0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        }
    }

    fn only_predicted(count: usize) -> Self {
        Self {
            matched_pairs: Vec::new(),
            tp: 0,
            fp: count,
            r#fn: 0,
            precision: 0.0,
            recall: 1.0,
            f1: 0.0,
        }
    }

    fn only_expected(count: usize) -> Self {
        Self {
            matched_pairs: Vec::new(),
            tp: 0,
            fp: 0,
            r#fn: count,
            precision: 0.0,
            recall: 0.0,
            f1: 0.0,
        }
    }

    fn from_assignment(pairs: Assignment, tp: usize, left_len: usize, right_len: usize) -> Self {
        let fp = right_len - tp;
        let r#fn = left_len - tp;
        let precision = ratio_or_zero(tp as u64, (tp + fp) as u64);
        let recall = ratio_or_zero(tp as u64, (tp + r#fn) as u64);

        Self {
            matched_pairs: pairs,
            tp,
            fp,
            r#fn,
            precision,
            recall,
            f1: f1_score(precision, recall),
        }
    }
}

/// Optimal one-to-one list matcher over a pluggable similarity.
///
/// `left` is the ground-truth side and `right` the predicted side throughout.
#[derive(Debug, Clone)]
pub struct AssignmentMatcher<S> {
    similarity: S,
    config: MatcherConfig,
    normalizer: ValueNormalizer,
}

impl<S> AssignmentMatcher<S> {
    pub fn new(similarity: S) -> Self {
        Self {
            similarity,
            config: MatcherConfig::default(),
            normalizer: ValueNormalizer::default(),
        }
    }

    pub fn with_config(similarity: S, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            similarity,
            config,
            normalizer: ValueNormalizer::new(config.normalize_values),
        })
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &ValueNormalizer {
        &self.normalizer
    }

    /// Builds the full similarity matrix, then solves the assignment.
    pub fn match_lists<T>(&self, left: &[T], right: &[T]) -> Result<(Assignment, SimilarityMatrix)>
    where
        S: Similarity<T>,
    {
        if left.is_empty() || right.is_empty() {
            return Ok((Vec::new(), SimilarityMatrix::empty()));
        }

        let size = left.len() * right.len();
        if size > self.config.size_warning_threshold {
            warn!(
                rows = left.len(),
                columns = right.len(),
                size,
                threshold = self.config.size_warning_threshold,
                "large similarity matrix for assignment"
            );
        }

        let matrix = SimilarityMatrix::build(left, right, &self.similarity)?;
        let assignment = optimal_assignment(&matrix)?;
        Ok((assignment, matrix))
    }

    /// Metrics over already-prepared items.
    pub fn calculate_item_metrics<T>(&self, left: &[T], right: &[T]) -> Result<ListMatchMetrics>
    where
        S: Similarity<T>,
    {
        match (left.len(), right.len()) {
            (1, 1) => self.score_singletons(&left[0], &right[0]),
            (0, 0) => Ok(ListMatchMetrics::all_matched()),
            (0, right_len) => Ok(ListMatchMetrics::only_predicted(right_len)),
            (left_len, 0) => Ok(ListMatchMetrics::only_expected(left_len)),
            (left_len, right_len) => {
                let (assignment, _) = self.match_lists(left, right)?;
                let tp = assignment
                    .iter()
                    .filter(|pair| pair.score >= self.config.match_threshold)
                    .count();
                debug!(left_len, right_len, tp, "list assignment scored");
                Ok(ListMatchMetrics::from_assignment(
                    assignment, tp, left_len, right_len,
                ))
            }
        }
    }

    /// Normalizes both sides (a scalar is a one-item list) and scores them.
    pub fn calculate_metrics(&self, left: &Value, right: &Value) -> Result<ListMatchMetrics>
    where
        S: Similarity<FieldValue>,
    {
        let left = self.normalizer.prepare(left);
        let right = self.normalizer.prepare(right);
        self.calculate_item_metrics(&left, &right)
    }

    /// `(tp, fp)` view of [`Self::calculate_metrics`].
    pub fn binary_compare(&self, left: &Value, right: &Value) -> Result<(usize, usize)>
    where
        S: Similarity<FieldValue>,
    {
        let metrics = self.calculate_metrics(left, right)?;
        Ok((metrics.tp, metrics.fp))
    }

    // Single items match on any positive score; the threshold is not consulted.
    fn score_singletons<T>(&self, left: &T, right: &T) -> Result<ListMatchMetrics>
    where
        S: Similarity<T>,
    {
        let score = checked_score(self.similarity.similarity(left, right)?)?;
        if score > 0.0 {
            Ok(ListMatchMetrics {
                matched_pairs: vec![MatchedPair {
                    left: 0,
                    right: 0,
                    score,
                }],
                tp: 1,
                fp: 0,
                r#fn: 0,
                precision: 1.0,
                recall: 1.0,
                f1: 1.0,
            })
        } else {
            Ok(ListMatchMetrics {
                matched_pairs: Vec::new(),
                tp: 0,
                fp: 1,
                r#fn: 1,
                precision: 0.0,
                recall: 0.0,
                f1: 0.0,
            })
        }
    }
}
