use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{ConfusionCounters, ConfusionMatrixResult, FieldPathTree, ResultNode};

/// Running overall and per-path counters folded from per-document results.
///
/// Additions are commutative and associative per path, so documents may be
/// accumulated in any order and partial accumulators merged freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetricsAccumulator {
    #[serde(default)]
    pub overall: ConfusionCounters,
    #[serde(default)]
    pub fields: FieldPathTree,
}

impl FieldMetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overall(&self) -> &ConfusionCounters {
        &self.overall
    }

    pub fn fields(&self) -> &FieldPathTree {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&ConfusionCounters> {
        self.fields.get(path)
    }

    pub fn accumulate(&mut self, result: &ConfusionMatrixResult) {
        self.overall += result.overall;
        self.accumulate_fields(&result.fields, "");
    }

    pub fn add_overall(&mut self, counters: ConfusionCounters) {
        self.overall += counters;
    }

    pub fn add_path(&mut self, path: &str, counters: ConfusionCounters) {
        *self.fields.entry(path.to_string()).or_default() += counters;
    }

    // Containers without counters of their own leave their path absent.
    fn add_rollup(&mut self, path: &str, counters: ConfusionCounters) {
        if !counters.is_zero() {
            self.add_path(path, counters);
        }
    }

    /// Adds `other` into `self`. A counter that would overflow rejects the
    /// whole merge and leaves `self` unchanged.
    pub fn merge(&mut self, other: &FieldMetricsAccumulator) -> Result<()> {
        let overall = self
            .overall
            .checked_add(&other.overall)
            .ok_or_else(|| Error::invalid_input("merge overflows the overall counters"))?;

        let mut fields = self.fields.clone();
        for (path, counters) in &other.fields {
            let entry = fields.entry(path.clone()).or_default();
            *entry = entry.checked_add(counters).ok_or_else(|| {
                Error::invalid_input(format!("merge overflows the counters of {path:?}"))
            })?;
        }

        self.overall = overall;
        self.fields = fields;
        Ok(())
    }

    fn accumulate_fields(&mut self, fields: &BTreeMap<String, ResultNode>, prefix: &str) {
        for (name, node) in fields {
            let path = join_path(prefix, name);
            self.accumulate_node(node, &path);
        }
    }

    fn accumulate_node(&mut self, node: &ResultNode, path: &str) {
        match node {
            ResultNode::Leaf(counters) => self.add_path(path, *counters),
            ResultNode::Object { overall, fields } => {
                self.add_rollup(path, *overall);
                self.accumulate_fields(fields, path);
            }
            // List items were already flattened per sub-field by the comparator.
            ResultNode::ListOfObjects {
                counters,
                nested_fields,
            } => {
                self.add_rollup(path, *counters);
                for (name, nested) in nested_fields {
                    self.add_path(&join_path(path, name), *nested);
                }
            }
        }
    }
}

pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
