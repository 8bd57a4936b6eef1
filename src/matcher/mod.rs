//! Optimal fuzzy matching between two lists.
//!
//! Every pair is scored into a [`SimilarityMatrix`], the matrix is solved as a
//! rectangular assignment problem (Kuhn-Munkres over `1 - similarity`), and
//! true/false positive counts are derived from the assigned scores.

mod assignment;
mod metrics;

pub use self::assignment::{
    Assignment, COST_SCALE, MatchedPair, SimilarityMatrix, optimal_assignment,
};
pub use self::metrics::{
    AssignmentMatcher, DEFAULT_MATCH_THRESHOLD, DEFAULT_SIZE_WARNING_THRESHOLD,
    ListMatchMetrics, MatcherConfig,
};
