//! Strassen's seven-product multiplication.
//!
//! An `n x n` product is split into quadrants and computed from seven
//! half-size products:
//!
//! ```text
//! M1 = (A11 + A22)(B11 + B22)    C11 = M1 + M4 - M5 + M7
//! M2 = (A21 + A22) B11           C12 = M3 + M5
//! M3 = A11 (B12 - B22)           C21 = M2 + M4
//! M4 = A22 (B21 - B11)           C22 = M1 - M2 + M3 + M6
//! M5 = (A11 + A12) B22
//! M6 = (A21 - A11)(B11 + B12)
//! M7 = (A12 - A22)(B21 + B22)
//! ```
//!
//! Recursion stops at [`OptimizationOptions::strassen_threshold`] and hands
//! the block to the naive family of the same parallelism tier. An odd size
//! above the threshold is zero-padded to `n + 1`, multiplied, and cropped back;
//! deeper levels pad again whenever a half size is odd.
//!
//! Only square operands of equal size are accepted.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::comm::{row_partitioned, Communicator};
use crate::config::OptimizationOptions;
use crate::error::{invalid_config, non_square, Result};
use crate::matrix::Matrix;
use crate::naive;
use crate::pool::WorkerPool;

/// Checks that both operands are square and of equal size.
pub(crate) fn check_square(a: &Matrix, b: &Matrix) -> Result<()> {
    if !a.is_square() || !b.is_square() || a.rows() != b.rows() {
        return Err(non_square(a.dims(), b.dims()));
    }
    Ok(())
}

/// Operand pairs of the seven products, in `M1..M7` order.
fn operand_pairs(a: &Matrix, b: &Matrix) -> Result<Vec<(Matrix, Matrix)>> {
    let n = a.rows();
    let half = n / 2;

    let a11 = a.submatrix(0, 0, half, half);
    let a12 = a.submatrix(0, half, half, n);
    let a21 = a.submatrix(half, 0, n, half);
    let a22 = a.submatrix(half, half, n, n);

    let b11 = b.submatrix(0, 0, half, half);
    let b12 = b.submatrix(0, half, half, n);
    let b21 = b.submatrix(half, 0, n, half);
    let b22 = b.submatrix(half, half, n, n);

    Ok(vec![
        (a11.add(&a22)?, b11.add(&b22)?),
        (a21.add(&a22)?, b11.clone()),
        (a11.clone(), b12.sub(&b22)?),
        (a22.clone(), b21.sub(&b11)?),
        (a11.add(&a12)?, b22.clone()),
        (a21.sub(&a11)?, b11.add(&b12)?),
        (a12.sub(&a22)?, b21.add(&b22)?),
    ])
}

/// Assembles `C` from the seven products.
fn combine(m: &[Matrix], n: usize) -> Result<Matrix> {
    debug_assert_eq!(m.len(), 7);
    let half = n / 2;

    let mut c11 = m[0].add(&m[3])?;
    c11.sub_assign_checked(&m[4])?;
    c11.add_assign_checked(&m[6])?;

    let c12 = m[2].add(&m[4])?;
    let c21 = m[1].add(&m[3])?;

    let mut c22 = m[0].sub(&m[1])?;
    c22.add_assign_checked(&m[2])?;
    c22.add_assign_checked(&m[5])?;

    let mut c = Matrix::new(n, n);
    c.set_submatrix(0, 0, &c11);
    c.set_submatrix(0, half, &c12);
    c.set_submatrix(half, 0, &c21);
    c.set_submatrix(half, half, &c22);
    Ok(c)
}

/// Multiplies at size `n + 1` and crops the result back to `n x n`.
fn with_padding<F>(a: &Matrix, b: &Matrix, multiply: F) -> Result<Matrix>
where
    F: FnOnce(&Matrix, &Matrix) -> Result<Matrix>,
{
    let n = a.rows();
    debug!(n, padded = n + 1, "padding odd Strassen operands");
    let c = multiply(&a.padded(n + 1, n + 1), &b.padded(n + 1, n + 1))?;
    Ok(c.cropped(n, n))
}

fn recurse_sequential(a: &Matrix, b: &Matrix, options: &OptimizationOptions) -> Result<Matrix> {
    let n = a.rows();
    if n <= options.strassen_threshold {
        return Ok(naive::compute_sequential(a, b, options));
    }
    if n % 2 != 0 {
        return with_padding(a, b, |a, b| recurse_sequential(a, b, options));
    }

    let products = operand_pairs(a, b)?
        .iter()
        .map(|(x, y)| recurse_sequential(x, y, options))
        .collect::<Result<Vec<_>>>()?;
    combine(&products, n)
}

/// Recursion with a worker budget.
///
/// With more than one worker the seven products run as independent tasks on
/// the current pool, each with a budget of `budget / 7 + 1`. A budget of one
/// recurses sequentially.
fn recurse_shared(
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
    budget: usize,
) -> Result<Matrix> {
    let n = a.rows();
    if n <= options.strassen_threshold {
        return Ok(if budget > 1 {
            naive::compute_parallel(a, b, options)
        } else {
            naive::compute_sequential(a, b, options)
        });
    }
    if n % 2 != 0 {
        return with_padding(a, b, |a, b| recurse_shared(a, b, options, budget));
    }

    let pairs = operand_pairs(a, b)?;
    let products = if budget > 1 {
        let child = budget / 7 + 1;
        pairs
            .into_par_iter()
            .map(|(x, y)| recurse_shared(&x, &y, options, child))
            .collect::<Result<Vec<_>>>()?
    } else {
        pairs
            .iter()
            .map(|(x, y)| recurse_shared(x, y, options, 1))
            .collect::<Result<Vec<_>>>()?
    };
    combine(&products, n)
}

/// # Errors
///
/// [`crate::MatmulError::NonSquareInput`] unless both operands are square and
/// of equal size.
pub fn sequential(a: &Matrix, b: &Matrix, options: &OptimizationOptions) -> Result<Matrix> {
    options.validate()?;
    check_square(a, b)?;
    recurse_sequential(a, b, options)
}

/// Strassen with the seven sub-products fanned out over `threads` workers.
pub fn shared(
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
    threads: usize,
) -> Result<Matrix> {
    options.validate()?;
    check_square(a, b)?;
    let pool = WorkerPool::new(threads)?;
    pool.install(|| recurse_shared(a, b, options, threads))
}

/// Row-partitioned Strassen.
///
/// The input is partitioned once at the top level. A rank whose slice holds
/// every row (a group of one) runs sequential Strassen; any other slice is
/// rectangular and goes through the naive kernel instead.
pub fn distributed<C: Communicator + ?Sized>(
    comm: &C,
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
) -> Result<Matrix> {
    options.validate()?;
    row_partitioned(comm, a, b, check_square, |a_local, b_full| {
        if a_local.rows() == b_full.rows() {
            recurse_sequential(a_local, b_full, options)
        } else {
            debug!(rows = a_local.rows(), "rectangular slice, using naive kernel");
            Ok(naive::compute_sequential(a_local, b_full, options))
        }
    })
}

/// Row-partitioned Strassen with a pool of `threads` workers on every rank.
pub fn hybrid<C: Communicator + ?Sized>(
    comm: &C,
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
    threads: usize,
) -> Result<Matrix> {
    options.validate()?;
    if threads == 0 {
        return Err(invalid_config("thread count must be positive"));
    }
    row_partitioned(comm, a, b, check_square, |a_local, b_full| {
        let pool = WorkerPool::new(threads)?;
        pool.install(|| {
            if a_local.rows() == b_full.rows() {
                recurse_shared(a_local, b_full, options, threads)
            } else {
                Ok(naive::compute_parallel(a_local, b_full, options))
            }
        })
    })
}
