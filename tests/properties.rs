//! Property-based tests.
//!
//! Key invariants:
//! - compare(A, A) passes with zero error
//! - compare metrics are symmetric; only the worst element's sides swap
//! - the blocked traversal produces exactly the plain triple loop's sums
//! - submatrix / set_submatrix round-trips
//! - row partitions tile every row exactly once
//! - a distributed product equals the sequential one

use proptest::prelude::*;
use stratmul::{
    dispatch, naive, Algorithm, Config, ExecutionMode, Matrix, OptimizationOptions, RowPartition,
    Tolerances,
};

fn matrix(rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> impl Strategy<Value = Matrix> {
    (rows, cols).prop_flat_map(|(r, c)| {
        prop::collection::vec(-100.0f64..100.0, r * c)
            .prop_map(move |data| Matrix::from_vec(r, c, data).unwrap())
    })
}

/// Two operands with a shared inner dimension.
fn operand_pair() -> impl Strategy<Value = (Matrix, Matrix)> {
    (1usize..12, 1usize..12, 1usize..12).prop_flat_map(|(m, k, n)| {
        (
            prop::collection::vec(-10.0f64..10.0, m * k),
            prop::collection::vec(-10.0f64..10.0, k * n),
        )
            .prop_map(move |(a, b)| {
                (Matrix::from_vec(m, k, a).unwrap(), Matrix::from_vec(k, n, b).unwrap())
            })
    })
}

proptest! {
    #[test]
    fn compare_with_self_passes(m in matrix(0..10, 0..10)) {
        let result = m.compare(&m, Tolerances::default());
        prop_assert!(result.passed);
        prop_assert_eq!(result.max_abs_error, 0.0);
        prop_assert_eq!(result.num_failures, 0);
    }

    #[test]
    fn compare_is_symmetric(
        (a, b) in (1usize..8, 1usize..8).prop_flat_map(|(r, c)| (
            prop::collection::vec(-100.0f64..100.0, r * c).prop_map(move |d| Matrix::from_vec(r, c, d).unwrap()),
            prop::collection::vec(-100.0f64..100.0, r * c).prop_map(move |d| Matrix::from_vec(r, c, d).unwrap()),
        ))
    ) {
        let tolerances = Tolerances::default();
        let ab = a.compare(&b, tolerances);
        let ba = b.compare(&a, tolerances);
        prop_assert_eq!(ab.max_abs_error, ba.max_abs_error);
        prop_assert_eq!(ab.rms_error, ba.rms_error);
        prop_assert_eq!(ab.num_failures, ba.num_failures);
        prop_assert_eq!(ab.passed, ba.passed);
        if let (Some(x), Some(y)) = (ab.worst, ba.worst) {
            prop_assert_eq!((x.row, x.col), (y.row, y.col));
            prop_assert_eq!(x.this, y.other);
            prop_assert_eq!(x.other, y.this);
        }
    }

    #[test]
    fn blocked_matches_plain((a, b) in operand_pair(), block in 1usize..9) {
        let plain = naive::sequential(&a, &b, &OptimizationOptions::default()).unwrap();
        let blocked = naive::sequential(&a, &b, &OptimizationOptions::blocked(block)).unwrap();
        prop_assert_eq!(&blocked, &plain);
        let shared = naive::shared(&a, &b, &OptimizationOptions::blocked(block), 3).unwrap();
        prop_assert_eq!(&shared, &plain);
    }

    #[test]
    fn submatrix_round_trip(
        m in matrix(1..10, 1..10),
        corners in (0usize..10, 0usize..10, 0usize..10, 0usize..10),
    ) {
        let (r0, r1) = (corners.0 % m.rows(), corners.1 % m.rows());
        let (c0, c1) = (corners.2 % m.cols(), corners.3 % m.cols());
        let (r0, r1) = (r0.min(r1), r0.max(r1) + 1);
        let (c0, c1) = (c0.min(c1), c0.max(c1) + 1);

        let sub = m.submatrix(r0, c0, r1, c1);
        prop_assert_eq!(sub.rows(), r1 - r0);
        prop_assert_eq!(sub.cols(), c1 - c0);

        let mut copy = m.clone();
        copy.set_submatrix(r0, c0, &sub);
        prop_assert_eq!(&copy, &m);
    }

    #[test]
    fn partition_tiles_rows(total in 0usize..500, workers in 1usize..17) {
        let partition = RowPartition::new(total, workers);
        let mut next = 0;
        for rank in 0..workers {
            let range = partition.range(rank);
            prop_assert_eq!(range.start, next);
            let rows = range.len();
            prop_assert!(rows == total / workers || rows == total / workers + 1);
            next = range.end;
        }
        prop_assert_eq!(next, total);
        prop_assert_eq!(partition.counts(3).iter().sum::<usize>(), total * 3);
    }

    #[test]
    fn distributed_equals_sequential((a, b) in operand_pair(), workers in 1usize..6) {
        let sequential = naive::sequential(&a, &b, &OptimizationOptions::default()).unwrap();
        let config = Config::new(Algorithm::Naive, ExecutionMode::Distributed).with_processes(workers);
        prop_assert_eq!(dispatch::multiply(&a, &b, &config).unwrap(), sequential);
    }
}
