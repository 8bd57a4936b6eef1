//! Stateful accumulation of per-document comparison results.
//!
//! [`EvaluationAggregator`] owns the running [`EngineState`] and the
//! success/failure bookkeeping; [`BulkEvaluator`] adds an external
//! [`DocumentComparator`] in front of it. Partial states from independent
//! engines combine with `merge_state`, which is the only coordination point
//! for parallel evaluation.

mod aggregator;
mod config;
mod evaluator;
mod state;

pub use self::aggregator::{DocumentOutcome, EvaluationAggregator};
pub use self::config::{DEFAULT_PROGRESS_INTERVAL, EvaluatorConfig};
pub use self::evaluator::{BatchCounts, BulkEvaluator, DocumentComparator};
pub use self::state::EngineState;

#[cfg(test)]
mod tests;
