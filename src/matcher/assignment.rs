use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::similarity::{Similarity, checked_score};

/// Fixed-point scale applied to `1 - similarity` before solving; scores closer
/// than `1 / COST_SCALE` are treated as ties.
pub const COST_SCALE: f64 = 1_000_000_000.0;

/// Dense `rows x columns` matrix of pairwise similarity scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimilarityMatrix {
    rows: usize,
    columns: usize,
    scores: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scores every `(left[i], right[j])` pair up front.
    pub fn build<T, S>(left: &[T], right: &[T], similarity: &S) -> Result<Self>
    where
        S: Similarity<T> + ?Sized,
    {
        if left.is_empty() || right.is_empty() {
            return Ok(Self::empty());
        }

        let mut scores = Vec::with_capacity(left.len() * right.len());
        for (i, item_left) in left.iter().enumerate() {
            for (j, item_right) in right.iter().enumerate() {
                let score = similarity.similarity(item_left, item_right)?;
                let score = checked_score(score).map_err(|_| {
                    Error::similarity(format!(
                        "pair ({i}, {j}) scored {score}, expected a finite value in [0, 1]"
                    ))
                })?;
                scores.push(score);
            }
        }

        Ok(Self {
            rows: left.len(),
            columns: right.len(),
            scores,
        })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let row_count = rows.len();
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        if columns == 0 {
            return Ok(Self::empty());
        }

        let mut scores = Vec::with_capacity(row_count * columns);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns {
                return Err(Error::invalid_input(format!(
                    "similarity matrix row {i} has {} columns, expected {columns}",
                    row.len()
                )));
            }
            for score in row {
                scores.push(checked_score(score)?);
            }
        }

        Ok(Self {
            rows: row_count,
            columns,
            scores,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.rows && column < self.columns {
            self.scores.get(row * self.columns + column).copied()
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.rows {
            Some(&self.scores[row * self.columns..(row + 1) * self.columns])
        } else {
            None
        }
    }

    /// Integer cost matrix with no more rows than columns, as the solver
    /// requires. Returns whether the matrix was transposed.
    fn cost_matrix(&self) -> Result<(Matrix<i64>, bool)> {
        let transposed = self.rows > self.columns;
        let (rows, columns) = if transposed {
            (self.columns, self.rows)
        } else {
            (self.rows, self.columns)
        };

        let mut costs = Vec::with_capacity(rows * columns);
        for r in 0..rows {
            for c in 0..columns {
                let (i, j) = if transposed { (c, r) } else { (r, c) };
                let score = self.scores[i * self.columns + j];
                costs.push(((1.0 - score) * COST_SCALE).round() as i64);
            }
        }

        let matrix = Matrix::from_vec(rows, columns, costs).map_err(|err| {
            Error::invalid_input(format!("failed to shape cost matrix: {err:?}"))
        })?;
        Ok((matrix, transposed))
    }
}

/// One assigned `(left, right)` index pair and its similarity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub left: usize,
    pub right: usize,
    pub score: f64,
}

/// One-to-one pairs ordered by left index.
pub type Assignment = Vec<MatchedPair>;

/// Minimum-total-cost assignment over `cost = 1 - similarity`.
///
/// Produces exactly `min(rows, columns)` pairs for a non-empty matrix, using
/// each row and column at most once.
pub fn optimal_assignment(matrix: &SimilarityMatrix) -> Result<Assignment> {
    if matrix.is_empty() {
        return Ok(Vec::new());
    }

    let (costs, transposed) = matrix.cost_matrix()?;
    let (_, solution) = kuhn_munkres_min(&costs);

    let mut pairs = solution
        .into_iter()
        .enumerate()
        .map(|(r, c)| {
            let (left, right) = if transposed { (c, r) } else { (r, c) };
            MatchedPair {
                left,
                right,
                score: matrix.scores[left * matrix.columns + right],
            }
        })
        .collect::<Assignment>();

    pairs.sort_by_key(|pair| pair.left);
    Ok(pairs)
}
