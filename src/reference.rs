//! Ground-truth product from an external optimized GEMM.
//!
//! The reference engine wraps `ndarray`'s `general_mat_mul` (row-major, no
//! transpose, `alpha = 1`, `beta = 0`) over views of the operands' buffers.
//! It is the oracle every other variant is validated against, so it shares no
//! code with them.

use ndarray::linalg::general_mat_mul;
use ndarray::{ArrayView2, ArrayViewMut2};

use crate::error::{dimension_mismatch, Result};
use crate::matrix::Matrix;

/// `C = A * B` through the external primitive.
///
/// # Errors
///
/// [`crate::MatmulError::DimensionMismatch`] when `a.cols != b.rows`.
pub fn multiply(a: &Matrix, b: &Matrix) -> Result<Matrix> {
    if a.cols() != b.rows() {
        return Err(dimension_mismatch("reference multiply", a.dims(), b.dims()));
    }
    let mut c = Matrix::new(a.rows(), b.cols());

    let shape_error = || dimension_mismatch("reference multiply", a.dims(), b.dims());
    let lhs = ArrayView2::from_shape((a.rows(), a.cols()), a.as_slice()).map_err(|_| shape_error())?;
    let rhs = ArrayView2::from_shape((b.rows(), b.cols()), b.as_slice()).map_err(|_| shape_error())?;
    let (rows, cols) = (c.rows(), c.cols());
    let mut out =
        ArrayViewMut2::from_shape((rows, cols), c.as_mut_slice()).map_err(|_| shape_error())?;

    general_mat_mul(1.0, &lhs, &rhs, 0.0, &mut out);
    Ok(c)
}
