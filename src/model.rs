use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

pub const COUNTER_KEYS: [&str; 6] = ["tp", "fp", "tn", "fn", "fd", "fa"];

/// Running counts for one field path, or for a whole document.
///
/// `fd` counts extra values (false discovery), `fa` counts wrong values
/// (false alarm). Counters only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfusionCounters {
    pub tp: u64,
    pub fp: u64,
    pub tn: u64,
    #[serde(rename = "fn")]
    pub r#fn: u64,
    pub fd: u64,
    pub fa: u64,
}

impl ConfusionCounters {
    pub fn new(tp: u64, fp: u64, tn: u64, r#fn: u64, fd: u64, fa: u64) -> Self {
        Self {
            tp,
            fp,
            tn,
            r#fn,
            fd,
            fa,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }

    /// True when the path has seen a positive or a miss.
    pub fn has_activity(&self) -> bool {
        self.tp > 0 || self.fp > 0 || self.r#fn > 0
    }

    /// Field-wise sum, or `None` when any counter would overflow.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        Some(Self {
            tp: self.tp.checked_add(other.tp)?,
            fp: self.fp.checked_add(other.fp)?,
            tn: self.tn.checked_add(other.tn)?,
            r#fn: self.r#fn.checked_add(other.r#fn)?,
            fd: self.fd.checked_add(other.fd)?,
            fa: self.fa.checked_add(other.fa)?,
        })
    }

    pub fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("tp", self.tp),
            ("fp", self.fp),
            ("tn", self.tn),
            ("fn", self.r#fn),
            ("fd", self.fd),
            ("fa", self.fa),
        ]
    }

    pub fn derived(&self) -> DerivedMetrics {
        DerivedMetrics::from_counters(self)
    }
}

// Saturates at u64::MAX; merges that must not lose counts use `checked_add`.
impl AddAssign for ConfusionCounters {
    fn add_assign(&mut self, other: Self) {
        self.tp = self.tp.saturating_add(other.tp);
        self.fp = self.fp.saturating_add(other.fp);
        self.tn = self.tn.saturating_add(other.tn);
        self.r#fn = self.r#fn.saturating_add(other.r#fn);
        self.fd = self.fd.saturating_add(other.fd);
        self.fa = self.fa.saturating_add(other.fa);
    }
}

impl Add for ConfusionCounters {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Dotted field path -> counters. Paths are never removed once present.
pub type FieldPathTree = BTreeMap<String, ConfusionCounters>;

pub fn ratio_or_zero(numerator: u64, denominator: u64) -> f64 {
    fraction_or_zero(numerator as f64, denominator as f64)
}

fn fraction_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

impl DerivedMetrics {
    pub fn from_counters(counters: &ConfusionCounters) -> Self {
        // Sums in f64 so counters near u64::MAX cannot overflow.
        let tp = counters.tp as f64;
        let fp = counters.fp as f64;
        let tn = counters.tn as f64;
        let r#fn = counters.r#fn as f64;

        let precision = fraction_or_zero(tp, tp + fp);
        let recall = fraction_or_zero(tp, tp + r#fn);

        Self {
            precision,
            recall,
            f1: f1_score(precision, recall),
            accuracy: fraction_or_zero(tp + tn, tp + tn + fp + r#fn),
        }
    }
}

/// Counters plus the metrics derived from them at read time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    #[serde(flatten)]
    pub counters: ConfusionCounters,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
}

impl From<ConfusionCounters> for MetricSet {
    fn from(counters: ConfusionCounters) -> Self {
        Self {
            counters,
            derived: counters.derived(),
        }
    }
}

/// One node of a per-document comparison tree.
///
/// On the wire a leaf is a bare counter object, an object field is
/// `{"overall": .., "fields": ..}` and a list of structured items is a counter
/// object with a `nested_fields` map whose entries are already aggregated
/// across list items.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "WireNode")]
pub enum ResultNode {
    Leaf(ConfusionCounters),
    Object {
        overall: ConfusionCounters,
        fields: BTreeMap<String, ResultNode>,
    },
    ListOfObjects {
        counters: ConfusionCounters,
        nested_fields: BTreeMap<String, ConfusionCounters>,
    },
}

impl ResultNode {
    pub fn leaf(counters: ConfusionCounters) -> Self {
        ResultNode::Leaf(counters)
    }

    pub fn object(
        overall: ConfusionCounters,
        fields: impl IntoIterator<Item = (String, ResultNode)>,
    ) -> Self {
        ResultNode::Object {
            overall,
            fields: fields.into_iter().collect(),
        }
    }

    pub fn list_of_objects(
        counters: ConfusionCounters,
        nested_fields: impl IntoIterator<Item = (String, ConfusionCounters)>,
    ) -> Self {
        ResultNode::ListOfObjects {
            counters,
            nested_fields: nested_fields.into_iter().collect(),
        }
    }

    /// Counters this node contributes to its own path.
    pub fn own_counters(&self) -> ConfusionCounters {
        match self {
            ResultNode::Leaf(counters) => *counters,
            ResultNode::Object { overall, .. } => *overall,
            ResultNode::ListOfObjects { counters, .. } => *counters,
        }
    }
}

#[derive(Deserialize)]
struct WireNode {
    #[serde(flatten)]
    counters: ConfusionCounters,
    #[serde(default)]
    overall: Option<ConfusionCounters>,
    #[serde(default)]
    fields: Option<BTreeMap<String, ResultNode>>,
    #[serde(default)]
    nested_fields: Option<BTreeMap<String, ConfusionCounters>>,
}

impl TryFrom<WireNode> for ResultNode {
    type Error = String;

    fn try_from(wire: WireNode) -> Result<Self, Self::Error> {
        // Direct counters and an `overall` rollup both land on the node's own path.
        let mut counters = wire.counters;
        if let Some(overall) = wire.overall {
            counters += overall;
        }

        match (wire.fields, wire.nested_fields) {
            (Some(_), Some(_)) => {
                Err("result node carries both `fields` and `nested_fields`".to_string())
            }
            (Some(fields), None) => Ok(ResultNode::Object {
                overall: counters,
                fields,
            }),
            (None, Some(nested_fields)) => Ok(ResultNode::ListOfObjects {
                counters,
                nested_fields,
            }),
            (None, None) => Ok(ResultNode::Leaf(counters)),
        }
    }
}

impl Serialize for ResultNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ResultNode::Leaf(counters) => counters.serialize(serializer),
            ResultNode::Object { overall, fields } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("overall", overall)?;
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            ResultNode::ListOfObjects {
                counters,
                nested_fields,
            } => {
                let mut map = serializer.serialize_map(Some(COUNTER_KEYS.len() + 1))?;
                for (key, value) in counters.entries() {
                    map.serialize_entry(key, &value)?;
                }
                map.serialize_entry("nested_fields", nested_fields)?;
                map.end()
            }
        }
    }
}

/// The `confusion_matrix` portion of a comparison result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrixResult {
    #[serde(default)]
    pub overall: ConfusionCounters,
    #[serde(default)]
    pub fields: BTreeMap<String, ResultNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonMatch {
    pub field_path: String,
    pub non_match_type: String,
    #[serde(default)]
    pub ground_truth_value: Value,
    #[serde(default)]
    pub prediction_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

/// What the comparison collaborator returns for one document pair.
///
/// Keys other than `confusion_matrix` and `non_matches` are kept verbatim so
/// the results log holds the tree exactly as produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub confusion_matrix: ConfusionMatrixResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_matches: Vec<NonMatch>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ComparisonResult {
    pub fn new(confusion_matrix: ConfusionMatrixResult) -> Self {
        Self {
            confusion_matrix,
            ..Self::default()
        }
    }

    pub fn with_non_matches(mut self, non_matches: Vec<NonMatch>) -> Self {
        self.non_matches = non_matches;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonMatchRecord {
    pub doc_id: String,
    #[serde(flatten)]
    pub non_match: NonMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub doc_id: String,
    pub error_kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub document_count: u64,
    pub overall: MetricSet,
    pub field_metrics: BTreeMap<String, MetricSet>,
    pub errors: Vec<ErrorRecord>,
    pub non_matches: Option<Vec<NonMatchRecord>>,
    pub elapsed_seconds: f64,
}
