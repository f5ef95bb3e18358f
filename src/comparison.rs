//! Tolerance-based matrix comparison.
//!
//! Two equal-shaped matrices are compared element by element with the combined
//! tolerance `max(abs_tol, rel_tol * max(|a|, |b|))` (the NumPy `allclose`
//! convention, symmetric in `a` and `b`). Besides the pass/fail verdict the
//! result carries the error statistics a report needs: max/mean absolute and
//! relative error, RMS error, failure count and rate, and the location and
//! values of the single worst element.

use serde::{Deserialize, Serialize};

use crate::config::Tolerances;
use crate::matrix::Matrix;

/// The element with the largest absolute error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorstElement {
    pub row: usize,
    pub col: usize,
    /// Value in the matrix `compare` was called on.
    pub this: f64,
    /// Value in the matrix passed as `other`.
    pub other: f64,
}

impl WorstElement {
    pub fn difference(&self) -> f64 {
        self.this - self.other
    }
}

/// Summary of a comparison between two matrices. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// `true` iff shapes match and no element exceeded its tolerance.
    pub passed: bool,
    pub max_abs_error: f64,
    pub mean_abs_error: f64,
    pub max_rel_error: f64,
    pub mean_rel_error: f64,
    pub rms_error: f64,
    pub num_elements: usize,
    pub num_failures: usize,
    /// Percentage of failing elements, `0.0..=100.0`.
    pub failure_rate: f64,
    /// `None` when no element differs (or shapes mismatch).
    pub worst: Option<WorstElement>,
    pub tolerances: Tolerances,
}

impl ComparisonResult {
    /// Failing result with zeroed statistics, used when shapes differ.
    pub fn shape_mismatch(tolerances: Tolerances) -> Self {
        Self {
            passed: false,
            ..Self::empty(tolerances)
        }
    }

    fn empty(tolerances: Tolerances) -> Self {
        Self {
            passed: true,
            max_abs_error: 0.0,
            mean_abs_error: 0.0,
            max_rel_error: 0.0,
            mean_rel_error: 0.0,
            rms_error: 0.0,
            num_elements: 0,
            num_failures: 0,
            failure_rate: 0.0,
            worst: None,
            tolerances,
        }
    }

    /// Compares `this` against `other`.
    ///
    /// For each element pair `(a, b)`:
    /// - absolute error `e = |a - b|`
    /// - scale `s = max(|a|, |b|)`, relative error `e / s` (0 when `s == 0`)
    /// - the element fails when `e > max(abs_tol, rel_tol * s)`, so a NaN
    ///   error never fails and `compare(A, A)` always passes.
    ///
    /// The worst element is tracked with a strict `>` so the first occurrence
    /// in row-major order wins ties. The maximum relative error is tracked
    /// independently of it.
    pub fn compute(this: &Matrix, other: &Matrix, tolerances: Tolerances) -> Self {
        if this.dims() != other.dims() {
            return Self::shape_mismatch(tolerances);
        }

        let mut result = Self::empty(tolerances);
        result.num_elements = this.len();

        let mut sum_abs = 0.0;
        let mut sum_rel = 0.0;
        let mut sum_sq = 0.0;
        let cols = this.cols();

        for (idx, (&a, &b)) in this.as_slice().iter().zip(other.as_slice()).enumerate() {
            let abs_error = (a - b).abs();
            let scale = a.abs().max(b.abs());
            let rel_error = if scale > 0.0 { abs_error / scale } else { 0.0 };

            let tolerance = tolerances.abs.max(tolerances.rel * scale);
            if abs_error > tolerance {
                result.num_failures += 1;
            }

            sum_abs += abs_error;
            sum_rel += rel_error;
            sum_sq += abs_error * abs_error;

            if abs_error > result.max_abs_error {
                result.max_abs_error = abs_error;
                result.worst = Some(WorstElement {
                    row: idx / cols,
                    col: idx % cols,
                    this: a,
                    other: b,
                });
            }
            if rel_error > result.max_rel_error {
                result.max_rel_error = rel_error;
            }
        }

        if result.num_elements > 0 {
            let n = result.num_elements as f64;
            result.mean_abs_error = sum_abs / n;
            result.mean_rel_error = sum_rel / n;
            result.rms_error = (sum_sq / n).sqrt();
            result.failure_rate = 100.0 * result.num_failures as f64 / n;
        }
        result.passed = result.num_failures == 0;
        result
    }
}
