use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A list item ready for comparison.
///
/// Primitives become text; objects and arrays are structured values that carry
/// their own comparison semantics and are never canonicalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Structured(Value),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Structured(_) => None,
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, FieldValue::Structured(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueNormalizer {
    canonicalize: bool,
}

impl Default for ValueNormalizer {
    fn default() -> Self {
        Self { canonicalize: true }
    }
}

impl ValueNormalizer {
    pub fn new(canonicalize: bool) -> Self {
        Self { canonicalize }
    }

    pub fn canonicalizes(&self) -> bool {
        self.canonicalize
    }

    pub fn normalize(&self, value: &Value) -> FieldValue {
        let text = match value {
            Value::Object(_) | Value::Array(_) => return FieldValue::Structured(value.clone()),
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
        };

        if self.canonicalize {
            FieldValue::Text(canonicalize_text(&text))
        } else {
            FieldValue::Text(text)
        }
    }

    /// Turns either side of a list comparison into normalized items.
    pub fn prepare(&self, value: &Value) -> Vec<FieldValue> {
        as_sequence(value)
            .iter()
            .map(|item| self.normalize(item))
            .collect()
    }
}

/// Lowercases, trims, and collapses internal whitespace runs to one space.
pub fn canonicalize_text(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Views a value as a sequence: arrays as-is, bracketed strings that parse as
/// a JSON or Python-literal list as their elements, anything else as a
/// one-element list.
pub fn as_sequence(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(text) if looks_like_array(text) => {
            parse_bracketed_list(text).unwrap_or_else(|| vec![value.clone()])
        }
        other => vec![other.clone()],
    }
}

fn looks_like_array(text: &str) -> bool {
    text.starts_with('[') && text.ends_with(']')
}

fn parse_bracketed_list(text: &str) -> Option<Vec<Value>> {
    let parsed = serde_json::from_str::<Value>(text)
        .ok()
        .or_else(|| serde_json::from_str::<Value>(&python_literal_to_json(text)?).ok());
    match parsed {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    }
}

/// Rewrites a Python list literal (`['a', "b", None, True]`) as JSON text.
///
/// Both quote styles become JSON strings and `None`/`True`/`False` become
/// their JSON keywords. Any other bare word, or an unterminated string,
/// yields `None`.
fn python_literal_to_json(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                loop {
                    match chars.next()? {
                        '\\' => match chars.next()? {
                            '\'' => out.push('\''),
                            escaped => {
                                out.push('\\');
                                out.push(escaped);
                            }
                        },
                        ch if ch == c => break,
                        '"' => out.push_str("\\\""),
                        ch => out.push(ch),
                    }
                }
                out.push('"');
            }
            // Exponent markers such as the `e` in `1e5` belong to the number.
            c if c.is_ascii_alphabetic() && out.ends_with(|prev: char| prev.is_ascii_digit()) => {
                out.push(c);
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !next.is_ascii_alphanumeric() && next != '_' {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    _ => return None,
                });
            }
            other => out.push(other),
        }
    }

    Some(out)
}
