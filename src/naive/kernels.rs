//! Row-major slice kernels for `C = A * B` with `A: m x k`, `B: k x n`,
//! `C: m x n`.
//!
//! Every kernel overwrites `c`. The blocked kernels accumulate into it block
//! by block, so they clear it first.

use std::cmp::min;

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::{ParallelSlice, ParallelSliceMut},
};

/// Plain `i, j, k` triple loop.
pub(crate) fn triple_loop(a: &[f64], b: &[f64], c: &mut [f64], m: usize, n: usize, k: usize) {
    debug_assert_eq!(a.len(), m * k);
    debug_assert_eq!(b.len(), k * n);
    debug_assert_eq!(c.len(), m * n);

    for i in 0..m {
        let a_row = &a[i * k..(i + 1) * k];
        for j in 0..n {
            let mut sum = 0.0;
            for (p, &a_ip) in a_row.iter().enumerate() {
                sum += a_ip * b[p * n + j];
            }
            c[i * n + j] = sum;
        }
    }
}

/// Cache-blocked product over a band of `rows` rows.
///
/// Blocks are visited in `ii, jj, kk` order. Inside a block each `C(i, j)` is
/// loaded, accumulated over the block's `k` range and stored back.
///
/// # Arguments
///
/// * `a_band` - The band's rows of `A`, `rows x k`.
/// * `b` - The full `B`, `k x n`.
/// * `c_band` - The band's rows of `C`, `rows x n`. Overwritten.
/// * `block` - Block edge length. Must be positive.
pub(crate) fn blocked_band(
    a_band: &[f64],
    b: &[f64],
    c_band: &mut [f64],
    rows: usize,
    n: usize,
    k: usize,
    block: usize,
) {
    debug_assert!(block > 0);
    debug_assert_eq!(a_band.len(), rows * k);
    debug_assert_eq!(c_band.len(), rows * n);

    c_band.fill(0.0);
    for ii in (0..rows).step_by(block) {
        let i_end = min(ii + block, rows);
        for jj in (0..n).step_by(block) {
            let j_end = min(jj + block, n);
            for kk in (0..k).step_by(block) {
                let k_end = min(kk + block, k);
                for i in ii..i_end {
                    for j in jj..j_end {
                        let mut sum = c_band[i * n + j];
                        for p in kk..k_end {
                            sum += a_band[i * k + p] * b[p * n + j];
                        }
                        c_band[i * n + j] = sum;
                    }
                }
            }
        }
    }
}

/// Triple loop with rows of `C` spread over the current rayon pool.
pub(crate) fn par_triple_loop(a: &[f64], b: &[f64], c: &mut [f64], m: usize, n: usize, k: usize) {
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        c.fill(0.0);
        return;
    }
    c.par_chunks_mut(n)
        .zip(a.par_chunks(k))
        .for_each(|(c_row, a_row)| triple_loop(a_row, b, c_row, 1, n, k));
}

/// Blocked product with one band of `block` rows per task.
///
/// Each band runs the sequential `jj, kk` traversal, so a band's result is
/// bit-identical to the sequential blocked kernel's.
pub(crate) fn par_blocked(
    a: &[f64],
    b: &[f64],
    c: &mut [f64],
    m: usize,
    n: usize,
    k: usize,
    block: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        c.fill(0.0);
        return;
    }
    // A band never spans more than `m` rows, which keeps `block * n` in range.
    let block = block.min(m);
    c.par_chunks_mut(block * n)
        .zip(a.par_chunks(block * k))
        .for_each(|(c_band, a_band)| {
            let rows = c_band.len() / n;
            blocked_band(a_band, b, c_band, rows, n, k, block);
        });
}
