//! Pluggable pairwise similarity.
//!
//! Concrete comparators (edit distance, numeric tolerance, embedding services)
//! live outside this crate and plug in through [`Similarity`].

use crate::error::{Error, Result};
use crate::normalize::FieldValue;

/// Scores a pair of values in `[0, 1]`. Failures propagate to the caller.
pub trait Similarity<T: ?Sized> {
    fn similarity(&self, left: &T, right: &T) -> Result<f64>;
}

impl<T: ?Sized, S: Similarity<T> + ?Sized> Similarity<T> for &S {
    fn similarity(&self, left: &T, right: &T) -> Result<f64> {
        (**self).similarity(left, right)
    }
}

impl<T: ?Sized, S: Similarity<T> + ?Sized> Similarity<T> for Box<S> {
    fn similarity(&self, left: &T, right: &T) -> Result<f64> {
        (**self).similarity(left, right)
    }
}

/// `1.0` for equal values, `0.0` otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExactMatch;

impl<T: PartialEq + ?Sized> Similarity<T> for ExactMatch {
    fn similarity(&self, left: &T, right: &T) -> Result<f64> {
        Ok(if left == right { 1.0 } else { 0.0 })
    }
}

/// Adapts an infallible scoring closure.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityFn<F>(pub F);

pub fn similarity_fn<T: ?Sized, F>(f: F) -> SimilarityFn<F>
where
    F: Fn(&T, &T) -> f64,
{
    SimilarityFn(f)
}

impl<T: ?Sized, F> Similarity<T> for SimilarityFn<F>
where
    F: Fn(&T, &T) -> f64,
{
    fn similarity(&self, left: &T, right: &T) -> Result<f64> {
        Ok((self.0)(left, right))
    }
}

/// Adapts a fallible scoring closure.
#[derive(Debug, Clone, Copy)]
pub struct TrySimilarityFn<F>(pub F);

impl<T: ?Sized, F> Similarity<T> for TrySimilarityFn<F>
where
    F: Fn(&T, &T) -> Result<f64>,
{
    fn similarity(&self, left: &T, right: &T) -> Result<f64> {
        (self.0)(left, right)
    }
}

/// Routes text pairs to `primitive` and structured pairs to `structured`.
/// A text item never matches a structured one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSimilarity<P, S> {
    pub primitive: P,
    pub structured: S,
}

impl<P, S> FieldSimilarity<P, S> {
    pub fn new(primitive: P, structured: S) -> Self {
        Self {
            primitive,
            structured,
        }
    }
}

impl<P, S> Similarity<FieldValue> for FieldSimilarity<P, S>
where
    P: Similarity<str>,
    S: Similarity<serde_json::Value>,
{
    fn similarity(&self, left: &FieldValue, right: &FieldValue) -> Result<f64> {
        match (left, right) {
            (FieldValue::Text(left), FieldValue::Text(right)) => {
                self.primitive.similarity(left.as_str(), right.as_str())
            }
            (FieldValue::Structured(left), FieldValue::Structured(right)) => {
                self.structured.similarity(left, right)
            }
            _ => Ok(0.0),
        }
    }
}

/// Rejects scores the assignment step cannot use.
pub fn checked_score(score: f64) -> Result<f64> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(Error::similarity(format!(
            "score {score} is not a finite value in [0, 1]"
        )))
    }
}
