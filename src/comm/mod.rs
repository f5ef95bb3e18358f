//! Distributed-memory collectives.
//!
//! A fixed group of `size` ranks cooperates on one product. Ranks share no
//! memory: matrices move between them only through the two collectives of
//! [`Communicator`]:
//!
//! - [`Communicator::broadcast`] replicates the root's matrix on every rank.
//!   Every rank blocks until it holds the value.
//! - [`Communicator::all_gather_rows`] concatenates each rank's row slice, in
//!   rank order, into the full matrix on every rank. Every rank blocks until
//!   the reassembled result is available.
//!
//! Collectives have no partial-failure semantics. There is no retry, timeout
//! or cancellation: a rank that cannot complete one panics, and the panic
//! aborts the whole group (see [`LocalCluster`]).
//!
//! [`row_partitioned`] is the skeleton every distributed and hybrid variant
//! runs: broadcast the operands, compute the local row slice, all-gather.

mod local;

pub use local::{LocalCluster, LocalComm};

use tracing::debug;

use crate::error::Result;
use crate::matrix::Matrix;
use crate::partition::RowPartition;

/// Rank that owns the inputs and coordinates broadcasts.
pub const ROOT_RANK: usize = 0;

/// A member of a fixed group of cooperating ranks.
///
/// All ranks must call the collectives in the same order with compatible
/// arguments (SPMD style).
pub trait Communicator {
    /// This rank's index in `0..size`.
    fn rank(&self) -> usize;

    /// Number of ranks in the group. Constant for the group's lifetime.
    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT_RANK
    }

    /// Replicates `root`'s `matrix` into `matrix` on every other rank.
    fn broadcast(&self, root: usize, matrix: &mut Matrix);

    /// Variable-length all-gather of row slices.
    ///
    /// `local` must hold exactly `partition.local_rows(self.rank())` rows of
    /// `cols` elements. Returns the `partition.total_rows() x cols` matrix with
    /// each rank's rows at `partition.offset(rank)`.
    fn all_gather_rows(&self, local: &Matrix, partition: &RowPartition, cols: usize) -> Matrix;
}

/// The trivial group of one rank.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfComm;

impl Communicator for SelfComm {
    fn rank(&self) -> usize {
        ROOT_RANK
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast(&self, root: usize, _matrix: &mut Matrix) {
        assert_eq!(root, ROOT_RANK, "broadcast root {root} outside a group of one");
    }

    fn all_gather_rows(&self, local: &Matrix, partition: &RowPartition, cols: usize) -> Matrix {
        assert_eq!(partition.workers(), 1, "partition built for another group size");
        assert_eq!(local.len(), partition.total_rows() * cols, "local slice size mismatch");
        local.clone()
    }
}

/// Runs one row-partitioned product on this rank.
///
/// 1. Broadcast both operands from [`ROOT_RANK`] (only the root's inputs are
///    significant; other ranks may pass empty matrices).
/// 2. Run `validate` on the replicated operands. Every rank sees the same
///    data, so every rank reaches the same verdict and an error leaves no
///    peer waiting in a later collective.
/// 3. Slice this rank's rows of `a` with [`RowPartition`] and run `local` on
///    them against the full `b`.
/// 4. All-gather the row slices into the full result, which every rank
///    returns.
///
/// A rank whose `local` step fails aborts the group the same way a failed
/// collective does: peers are already committed to the all-gather.
pub fn row_partitioned<C, V, F>(
    comm: &C,
    a: &Matrix,
    b: &Matrix,
    validate: V,
    local: F,
) -> Result<Matrix>
where
    C: Communicator + ?Sized,
    V: FnOnce(&Matrix, &Matrix) -> Result<()>,
    F: FnOnce(&Matrix, &Matrix) -> Result<Matrix>,
{
    let mut a_full = if comm.is_root() { a.clone() } else { Matrix::default() };
    let mut b_full = if comm.is_root() { b.clone() } else { Matrix::default() };
    comm.broadcast(ROOT_RANK, &mut a_full);
    comm.broadcast(ROOT_RANK, &mut b_full);

    validate(&a_full, &b_full)?;

    let partition = RowPartition::new(a_full.rows(), comm.size());
    let rows = partition.range(comm.rank());
    debug!(
        rank = comm.rank(),
        size = comm.size(),
        start = rows.start,
        end = rows.end,
        "computing local row slice"
    );

    let a_local = a_full.row_slice(rows.start, rows.len());
    let c_local = match local(&a_local, &b_full) {
        Ok(c) => c,
        Err(err) => panic!("rank {} failed its local computation: {err}", comm.rank()),
    };

    Ok(comm.all_gather_rows(&c_local, &partition, b_full.cols()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::dimension_mismatch;

    #[test]
    fn test_self_comm_is_identity() {
        let comm = SelfComm;
        let mut m = Matrix::identity(3);
        comm.broadcast(ROOT_RANK, &mut m);
        assert_eq!(m, Matrix::identity(3));

        let partition = RowPartition::new(3, 1);
        assert_eq!(comm.all_gather_rows(&m, &partition, 3), m);
    }

    #[test]
    fn test_row_partitioned_on_self_comm() {
        let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let b = Matrix::identity(2);
        let c = row_partitioned(&SelfComm, &a, &b, |_, _| Ok(()), |a_local, _| Ok(a_local.clone()))
            .unwrap();
        assert_eq!(c, a);
    }

    #[test]
    fn test_row_partitioned_validation_error() {
        let a = Matrix::new(2, 3);
        let b = Matrix::new(2, 3);
        let result = row_partitioned(
            &SelfComm,
            &a,
            &b,
            |a, b| Err(dimension_mismatch("multiply", a.dims(), b.dims())),
            |_, _| unreachable!("local step must not run after a failed validation"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_row_partitioned_gathers_in_rank_order() {
        let a = Matrix::from_vec(7, 1, (0..7).map(|i| i as f64).collect()).unwrap();
        let b = Matrix::identity(1);
        let results = LocalCluster::new(3).run(|comm| {
            let (a_in, b_in) = if comm.is_root() {
                (a.clone(), b.clone())
            } else {
                (Matrix::default(), Matrix::default())
            };
            row_partitioned(comm, &a_in, &b_in, |_, _| Ok(()), |a_local, _| {
                // Tag each row with the rank that produced it.
                let mut out = a_local.clone();
                out.as_mut_slice().iter_mut().for_each(|v| *v += 100.0 * comm.rank() as f64);
                Ok(out)
            })
        });

        let expected = [0.0, 1.0, 2.0, 103.0, 104.0, 205.0, 206.0];
        for result in results {
            assert_eq!(result.unwrap().as_slice(), &expected);
        }
    }
}
