//! Append-only JSON-lines log of raw per-document comparison results.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::ComparisonResult;
use crate::util::{append_json_line, read_to_string};

#[derive(Serialize)]
struct ResultLine<'a> {
    doc_id: &'a str,
    comparison_result: &'a ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultLogEntry {
    pub doc_id: String,
    pub comparison_result: ComparisonResult,
}

pub fn append_result(path: &Path, doc_id: &str, result: &ComparisonResult) -> Result<()> {
    append_json_line(
        path,
        &ResultLine {
            doc_id,
            comparison_result: result,
        },
    )
}

/// Reads every entry; blank lines are skipped, a malformed line is an error
/// naming its 1-based line number.
pub fn read_results(path: &Path) -> Result<Vec<ResultLogEntry>> {
    let raw = read_to_string(path)?;

    let mut entries = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str::<ResultLogEntry>(line).map_err(|err| {
            Error::json(
                format!("parse results log line {} of {}", index + 1, path.display()),
                err,
            )
        })?;
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfusionCounters, ConfusionMatrixResult, ResultNode};
    use serde_json::json;

    #[test]
    fn appended_results_read_back_in_order() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("results.jsonl");

        let mut matrix = ConfusionMatrixResult::default();
        matrix.overall = ConfusionCounters::new(1, 0, 0, 0, 0, 0);
        matrix
            .fields
            .insert("total".to_string(), ResultNode::leaf(ConfusionCounters::new(1, 0, 0, 0, 0, 0)));
        let result = ComparisonResult::new(matrix);

        append_result(&path, "doc-a", &result).expect("first append");
        append_result(&path, "doc-b", &result).expect("second append");

        let entries = read_results(&path).expect("log should parse");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].doc_id, "doc-a");
        assert_eq!(entries[1].comparison_result, result);
    }

    #[test]
    fn each_line_has_doc_id_and_comparison_result_keys() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("results.jsonl");

        append_result(&path, "doc-a", &ComparisonResult::default()).expect("append");

        let raw = read_to_string(&path).expect("log should be readable");
        let line: serde_json::Value =
            serde_json::from_str(raw.trim_end()).expect("line should be json");
        assert_eq!(line["doc_id"], json!("doc-a"));
        assert!(line["comparison_result"]["confusion_matrix"].is_object());
    }

    #[test]
    fn malformed_line_reports_its_position() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("results.jsonl");
        std::fs::write(&path, "\n{\"doc_id\": \"x\"}\n").expect("fixture write");

        let error = read_results(&path).expect_err("missing result should fail");
        assert!(error.to_string().contains("line 2"), "unexpected error: {error}");
    }
}
