//! Dense row-major matrix container.
//!
//! [`Matrix`] owns one contiguous `Vec<f64>` laid out row by row, so element
//! `(r, c)` lives at `r * cols + c`. It carries exactly the arithmetic the
//! multiplication strategies need: elementwise addition and subtraction,
//! submatrix extraction and insertion for Strassen's quadrant split, and the
//! padding/cropping used for odd sizes.
//!
//! ## Ownership
//!
//! `Clone` is a deep copy. Moving out with [`Matrix::take`] hands the buffer
//! to the caller and leaves an empty `0 x 0` matrix behind. There is no shared
//! ownership; a matrix is freed when its owner goes out of scope.

use std::fmt;
use std::ops::{Index, IndexMut};

use ndarray::Array2;
use rand::Rng;

use crate::comparison::ComparisonResult;
use crate::config::Tolerances;
use crate::error::{dimension_mismatch, invalid_config, MatmulError, Result};

/// Shape of a matrix as `rows x cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dims {
    pub rows: usize,
    pub cols: usize,
}

impl Dims {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a zero-filled `rows x cols` matrix.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Alias of [`Matrix::new`], reads better next to [`Matrix::identity`].
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::new(rows, cols)
    }

    /// Creates a `rows x cols` matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Creates the `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::new(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// Wraps an existing row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`MatmulError::DimensionMismatch`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(dimension_mismatch(
                "from_vec",
                Dims::new(rows, cols),
                Dims::new(1, data.len()),
            ));
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from nested rows. All rows must have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(dimension_mismatch(
                    "from_rows",
                    Dims::new(1, cols),
                    Dims::new(1, row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Creates a matrix with values drawn uniformly from `[min, max)`.
    pub fn random<R: Rng>(
        rows: usize,
        cols: usize,
        min: f64,
        max: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let mut m = Self::new(rows, cols);
        m.randomize(min, max, rng)?;
        Ok(m)
    }

    /// Overwrites every element with a value drawn uniformly from `[min, max)`.
    ///
    /// # Errors
    ///
    /// Returns [`MatmulError::InvalidConfig`] unless `min < max` and both are finite.
    pub fn randomize<R: Rng>(&mut self, min: f64, max: f64, rng: &mut R) -> Result<()> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(invalid_config(format!(
                "random range must satisfy min < max, got [{min}, {max})"
            )));
        }
        for value in self.data.iter_mut() {
            *value = rng.random_range(min..max);
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> Dims {
        Dims::new(self.rows, self.cols)
    }

    /// Number of elements, `rows * cols`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    #[inline(always)]
    fn index_of(&self, row: usize, col: usize) -> usize {
        debug_assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}",
            self.dims()
        );
        row * self.cols + col
    }

    /// Reads element `(row, col)`. The caller guarantees the bounds.
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.index_of(row, col)]
    }

    /// Writes element `(row, col)`. The caller guarantees the bounds.
    #[inline(always)]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.index_of(row, col);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Row `i` as a contiguous slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Moves the buffer out, leaving `self` as an empty `0 x 0` matrix.
    pub fn take(&mut self) -> Matrix {
        std::mem::take(self)
    }

    /// Deep copy of the half-open region `[row_start, row_end) x [col_start, col_end)`.
    pub fn submatrix(
        &self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Matrix {
        debug_assert!(row_start <= row_end && row_end <= self.rows);
        debug_assert!(col_start <= col_end && col_end <= self.cols);

        let sub_cols = col_end - col_start;
        let mut data = Vec::with_capacity((row_end - row_start) * sub_cols);
        for r in row_start..row_end {
            let start = r * self.cols + col_start;
            data.extend_from_slice(&self.data[start..start + sub_cols]);
        }
        Matrix {
            rows: row_end - row_start,
            cols: sub_cols,
            data,
        }
    }

    /// Contiguous block of whole rows `[row_start, row_start + count)`.
    pub fn row_slice(&self, row_start: usize, count: usize) -> Matrix {
        let start = row_start * self.cols;
        Matrix {
            rows: count,
            cols: self.cols,
            data: self.data[start..start + count * self.cols].to_vec(),
        }
    }

    /// Overwrites the region starting at `(row_start, col_start)` with `sub`.
    pub fn set_submatrix(&mut self, row_start: usize, col_start: usize, sub: &Matrix) {
        debug_assert!(row_start + sub.rows <= self.rows);
        debug_assert!(col_start + sub.cols <= self.cols);

        for r in 0..sub.rows {
            let dst = (row_start + r) * self.cols + col_start;
            self.data[dst..dst + sub.cols].copy_from_slice(sub.row(r));
        }
    }

    /// Copies `self` into the top-left corner of a zero `rows x cols` matrix.
    pub fn padded(&self, rows: usize, cols: usize) -> Matrix {
        let mut out = Matrix::new(rows, cols);
        out.set_submatrix(0, 0, self);
        out
    }

    /// Top-left `rows x cols` region.
    pub fn cropped(&self, rows: usize, cols: usize) -> Matrix {
        self.submatrix(0, 0, rows, cols)
    }

    fn check_same_shape(&self, other: &Matrix, op: &'static str) -> Result<()> {
        if self.dims() != other.dims() {
            return Err(dimension_mismatch(op, self.dims(), other.dims()));
        }
        Ok(())
    }

    /// Elementwise `self + other` as a new matrix.
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "add")?;
        Ok(self.zip_map(other, |a, b| a + b))
    }

    /// Elementwise `self - other` as a new matrix.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "sub")?;
        Ok(self.zip_map(other, |a, b| a - b))
    }

    /// In-place `self += other`.
    pub fn add_assign_checked(&mut self, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "add")?;
        self.data
            .iter_mut()
            .zip(&other.data)
            .for_each(|(a, b)| *a += b);
        Ok(())
    }

    /// In-place `self -= other`.
    pub fn sub_assign_checked(&mut self, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "sub")?;
        self.data
            .iter_mut()
            .zip(&other.data)
            .for_each(|(a, b)| *a -= b);
        Ok(())
    }

    fn zip_map(&self, other: &Matrix, f: impl Fn(f64, f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Plain absolute check: same shape and every `|a - b| <= epsilon`.
    pub fn equals(&self, other: &Matrix, epsilon: f64) -> bool {
        self.dims() == other.dims()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).abs() <= epsilon)
    }

    /// Tolerance-based comparison with full error statistics.
    ///
    /// Never fails: a shape mismatch yields a failing result with zeroed
    /// statistics. See [`ComparisonResult`] for the metric definitions.
    pub fn compare(&self, other: &Matrix, tolerances: Tolerances) -> ComparisonResult {
        ComparisonResult::compute(self, other, tolerances)
    }

    /// Copies into an `ndarray` array in standard layout.
    pub fn to_array(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.rows, self.cols), |(r, c)| self.get(r, c))
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline(always)]
    fn index(&self, (row, col): (usize, usize)) -> &Self::Output {
        &self.data[self.index_of(row, col)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline(always)]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Self::Output {
        let idx = self.index_of(row, col);
        &mut self.data[idx]
    }
}

impl From<Array2<f64>> for Matrix {
    fn from(array: Array2<f64>) -> Self {
        let (rows, cols) = array.dim();
        // `iter` walks in logical row-major order whatever the memory layout.
        let data = array.iter().copied().collect();
        Matrix { rows, cols, data }
    }
}

impl TryFrom<Vec<Vec<f64>>> for Matrix {
    type Error = MatmulError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Matrix::from_rows(&rows)
    }
}
