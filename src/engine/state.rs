use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accumulator::FieldMetricsAccumulator;
use crate::error::{Error, Result};
use crate::model::ErrorRecord;

/// Serializable snapshot of an aggregator's running totals.
///
/// Used for checkpoint/restore and for combining partial results from
/// independent engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub target_schema: String,
    pub confusion_matrix: FieldMetricsAccumulator,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    pub processed_count: u64,
    pub start_time: DateTime<Utc>,
}

impl EngineState {
    pub fn new(target_schema: impl Into<String>) -> Self {
        Self {
            target_schema: target_schema.into(),
            confusion_matrix: FieldMetricsAccumulator::default(),
            errors: Vec::new(),
            processed_count: 0,
            start_time: Utc::now(),
        }
    }

    pub fn ensure_schema(&self, expected: &str) -> Result<()> {
        if self.target_schema == expected {
            Ok(())
        } else {
            Err(Error::schema_mismatch(expected, self.target_schema.clone()))
        }
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        if self.target_schema.trim().is_empty() {
            return Err(Error::invalid_input("state has an empty target schema"));
        }
        for path in self.confusion_matrix.fields.keys() {
            if path.is_empty() || path.split('.').any(str::is_empty) {
                return Err(Error::invalid_input(format!(
                    "state has a malformed field path: {path:?}"
                )));
            }
        }
        Ok(())
    }

    /// Adds `other` into `self`. Counters and processed counts are summed,
    /// errors appended; `start_time` stays this state's own. An overflowing
    /// sum is `InvalidInput` and nothing changes.
    pub fn merge(&mut self, other: &EngineState) -> Result<()> {
        other.ensure_schema(&self.target_schema)?;
        other.validate()?;

        let processed_count = self
            .processed_count
            .checked_add(other.processed_count)
            .ok_or_else(|| Error::invalid_input("merge overflows the processed count"))?;
        self.confusion_matrix.merge(&other.confusion_matrix)?;

        self.errors.extend(other.errors.iter().cloned());
        self.processed_count = processed_count;
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let state = serde_json::from_str::<EngineState>(raw)
            .map_err(|err| Error::invalid_input(format!("malformed engine state: {err}")))?;
        state.validate()?;
        Ok(state)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let state = serde_json::from_value::<EngineState>(value)
            .map_err(|err| Error::invalid_input(format!("malformed engine state: {err}")))?;
        state.validate()?;
        Ok(state)
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|err| Error::json("serialize engine state", err))
    }
}
