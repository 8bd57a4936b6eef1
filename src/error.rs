//! Error types for fieldscore.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for fieldscore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kind label recorded for collaborator failures that are not fieldscore errors.
pub const COMPARISON_FAILURE_KIND: &str = "ComparisonFailure";

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A checkpoint or partial state belongs to a different target schema.
    #[error("schema mismatch: engine expects {expected}, state carries {found}")]
    SchemaMismatch { expected: String, found: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The similarity capability failed or returned an unusable score.
    #[error("similarity failed: {0}")]
    Similarity(String),

    #[error("failed to {action} {}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn similarity(msg: impl Into<String>) -> Self {
        Error::Similarity(msg.into())
    }

    pub fn schema_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Error::Json {
            context: context.into(),
            source,
        }
    }

    /// Stable label used in error records and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SchemaMismatch { .. } => "SchemaMismatch",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Similarity(_) => "Similarity",
            Error::Io { .. } => "Io",
            Error::Json { .. } => "Json",
        }
    }
}

/// Classifies a collaborator failure for bookkeeping.
pub fn failure_kind(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<Error>())
        .map(Error::kind)
        .unwrap_or(COMPARISON_FAILURE_KIND)
}
