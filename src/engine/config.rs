use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Keep per-document non-match details for the summary.
    pub document_non_matches: bool,
    /// Drop failed documents entirely instead of recording them as a miss.
    pub elide_errors: bool,
    /// Append every raw comparison result to this JSON-lines file.
    pub results_log: Option<PathBuf>,
    /// Log progress every N processed documents; 0 disables.
    pub progress_interval: u64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            document_non_matches: true,
            elide_errors: false,
            results_log: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl EvaluatorConfig {
    pub fn with_results_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_log = Some(path.into());
        self
    }

    pub fn with_elide_errors(mut self, elide_errors: bool) -> Self {
        self.elide_errors = elide_errors;
        self
    }

    pub fn with_document_non_matches(mut self, document_non_matches: bool) -> Self {
        self.document_non_matches = document_non_matches;
        self
    }
}
