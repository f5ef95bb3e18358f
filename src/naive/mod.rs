//! Triple-loop multiplication in all four execution modes.
//!
//! Every variant computes `C = A * B` for `A: M x K`, `B: K x N` and accepts
//! rectangular operands. [`OptimizationOptions::cache_blocking`] switches the
//! inner traversal to the `ii, jj, kk` blocked order.
//!
//! - [`sequential`]: one thread.
//! - [`shared`]: rows of `C` spread over a worker pool.
//! - [`distributed`]: rows of `A` partitioned across ranks, each rank runs the
//!   sequential kernel on its slice against the full `B`.
//! - [`hybrid`]: as distributed, with a worker pool inside every rank.

mod kernels;

use tracing::trace;

use crate::comm::{row_partitioned, Communicator};
use crate::config::OptimizationOptions;
use crate::error::{dimension_mismatch, invalid_config, Result};
use crate::matrix::Matrix;
use crate::pool::WorkerPool;

/// Checks `a.cols == b.rows`.
pub(crate) fn check_dims(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.cols() != b.rows() {
        return Err(dimension_mismatch("multiply", a.dims(), b.dims()));
    }
    Ok(())
}

/// Single-threaded product. Operands must already be checked.
pub(crate) fn compute_sequential(a: &Matrix, b: &Matrix, options: &OptimizationOptions) -> Matrix {
    let (m, n, k) = (a.rows(), b.cols(), a.cols());
    let mut c = Matrix::new(m, n);
    match options.block() {
        Some(block) => kernels::blocked_band(a.as_slice(), b.as_slice(), c.as_mut_slice(), m, n, k, block),
        None => kernels::triple_loop(a.as_slice(), b.as_slice(), c.as_mut_slice(), m, n, k),
    }
    c
}

/// Product parallelized over the current rayon pool. Operands must already be
/// checked.
pub(crate) fn compute_parallel(a: &Matrix, b: &Matrix, options: &OptimizationOptions) -> Matrix {
    let (m, n, k) = (a.rows(), b.cols(), a.cols());
    let mut c = Matrix::new(m, n);
    match options.block() {
        Some(block) => {
            kernels::par_blocked(a.as_slice(), b.as_slice(), c.as_mut_slice(), m, n, k, block)
        }
        None => kernels::par_triple_loop(a.as_slice(), b.as_slice(), c.as_mut_slice(), m, n, k),
    }
    c
}

/// # Errors
///
/// [`crate::MatmulError::DimensionMismatch`] when `a.cols != b.rows`.
pub fn sequential(a: &Matrix, b: &Matrix, options: &OptimizationOptions) -> Result<Matrix> {
    options.validate()?;
    check_dims(a, b)?;
    trace!(lhs = %a.dims(), rhs = %b.dims(), blocked = options.cache_blocking, "naive sequential");
    Ok(compute_sequential(a, b, options))
}

/// Shared-memory product on a pool of `threads` workers.
pub fn shared(
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
    threads: usize,
) -> Result<Matrix> {
    options.validate()?;
    check_dims(a, b)?;
    let pool = WorkerPool::new(threads)?;
    trace!(lhs = %a.dims(), rhs = %b.dims(), threads, "naive shared-memory");
    Ok(pool.install(|| compute_parallel(a, b, options)))
}

/// Row-partitioned product. Every rank of `comm` must call this; only the
/// root's operands are significant and every rank returns the full result.
pub fn distributed<C: Communicator + ?Sized>(
    comm: &C,
    a: &Matrix,
    b: &Matrix,
    options: &OptimizationOptions,
) -> Result<Matrix> {
    options.validate()?;
    row_partitioned(comm, a, b, check_dims, |a_local, b_full| {
        Ok(compute_sequential(a_local, b_full, options))
    })
}

/// Row-partitioned product with a pool of `threads` workers on every rank.
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
    row_partitioned(comm, a, b, check_dims, |a_local, b_full| {
        let pool = WorkerPool::new(threads)?;
        Ok(pool.install(|| compute_parallel(a_local, b_full, options)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalCluster, SelfComm, ROOT_RANK};
    use crate::error::MatmulError;

    fn sample() -> (Matrix, Matrix) {
        let a = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        let b = Matrix::from_rows(&[[7.0, 8.0], [9.0, 10.0], [11.0, 12.0]]).unwrap();
        (a, b)
    }

    fn product() -> Matrix {
        Matrix::from_rows(&[[58.0, 64.0], [139.0, 154.0]]).unwrap()
    }

    #[test]
    fn test_sequential_rectangular() {
        let (a, b) = sample();
        assert_eq!(sequential(&a, &b, &OptimizationOptions::default()).unwrap(), product());
        assert_eq!(sequential(&a, &b, &OptimizationOptions::blocked(2)).unwrap(), product());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = Matrix::new(2, 3);
        let b = Matrix::new(2, 3);
        let err = sequential(&a, &b, &OptimizationOptions::default()).unwrap_err();
        assert!(matches!(err, MatmulError::DimensionMismatch { .. }));
        assert!(shared(&a, &b, &OptimizationOptions::default(), 2).is_err());
        assert!(distributed(&SelfComm, &a, &b, &OptimizationOptions::default()).is_err());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let (a, b) = sample();
        let options = OptimizationOptions::blocked(0);
        assert!(matches!(
            sequential(&a, &b, &options),
            Err(MatmulError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_identity() {
        let a = Matrix::from_vec(3, 3, (1..=9).map(|v| v as f64).collect()).unwrap();
        let c = sequential(&a, &Matrix::identity(3), &OptimizationOptions::default()).unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_shared_matches_sequential() {
        let (a, b) = sample();
        for threads in [1, 2, 4] {
            assert_eq!(shared(&a, &b, &OptimizationOptions::default(), threads).unwrap(), product());
            assert_eq!(shared(&a, &b, &OptimizationOptions::blocked(1), threads).unwrap(), product());
        }
    }

    #[test]
    fn test_block_larger_than_matrix() {
        let a = Matrix::from_vec(3, 3, (1..=9).map(|v| v as f64).collect()).unwrap();
        let id = Matrix::identity(3);
        let options = OptimizationOptions::blocked(usize::MAX);
        assert_eq!(sequential(&a, &id, &options).unwrap(), a);
        assert_eq!(shared(&a, &id, &options, 2).unwrap(), a);

        let results = LocalCluster::new(2).run(|comm| {
            let (a_in, b_in) = if comm.rank() == ROOT_RANK {
                (a.clone(), id.clone())
            } else {
                (Matrix::default(), Matrix::default())
            };
            hybrid(comm, &a_in, &b_in, &options, 2).unwrap()
        });
        for c in results {
            assert_eq!(c, a);
        }
    }

    #[test]
    fn test_distributed_and_hybrid_on_every_rank() {
        let (a, b) = sample();
        for ranks in [1, 2, 3] {
            let results = LocalCluster::new(ranks).run(|comm| {
                let (a_in, b_in) = if comm.rank() == ROOT_RANK {
                    (a.clone(), b.clone())
                } else {
                    (Matrix::default(), Matrix::default())
                };
                let options = OptimizationOptions::default();
                (
                    distributed(comm, &a_in, &b_in, &options).unwrap(),
                    hybrid(comm, &a_in, &b_in, &options, 2).unwrap(),
                )
            });
            for (dist, hyb) in results {
                assert_eq!(dist, product());
                assert_eq!(hyb, product());
            }
        }
    }

    #[test]
    fn test_distributed_mismatch_fails_on_every_rank() {
        let results = LocalCluster::new(3).run(|comm| {
            let a = Matrix::new(4, 3);
            let b = Matrix::new(4, 3);
            distributed(comm, &a, &b, &OptimizationOptions::default())
        });
        assert!(results.iter().all(|r| r.is_err()));
    }

    #[test]
    fn test_empty_operands() {
        let a = Matrix::new(0, 3);
        let b = Matrix::new(3, 2);
        let c = sequential(&a, &b, &OptimizationOptions::default()).unwrap();
        assert_eq!(c.dims(), crate::matrix::Dims::new(0, 2));
        let c = shared(&a, &b, &OptimizationOptions::blocked(4), 2).unwrap();
        assert_eq!(c.dims(), crate::matrix::Dims::new(0, 2));
    }
}
