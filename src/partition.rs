//! Row partitioning shared by every distributed variant.
//!
//! `total_rows` rows are split across `workers` ranks into contiguous,
//! near-equal ranges: each rank gets `total_rows / workers` rows and the first
//! `total_rows % workers` ranks get one extra. Rank `r` starts at
//! `r * rows_per_worker + min(r, remainder)`.
//!
//! The same arithmetic yields the per-rank element counts and displacements
//! the all-gather needs to reassemble the full result in original row order.

use std::ops::Range;

/// Contiguous row ranges for a fixed worker count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPartition {
    total_rows: usize,
    workers: usize,
    rows_per_worker: usize,
    remainder: usize,
}

impl RowPartition {
    /// # Panics
    ///
    /// Panics if `workers == 0`.
    pub fn new(total_rows: usize, workers: usize) -> Self {
        assert!(workers > 0, "row partition needs at least one worker");
        Self {
            total_rows,
            workers,
            rows_per_worker: total_rows / workers,
            remainder: total_rows % workers,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn rows_per_worker(&self) -> usize {
        self.rows_per_worker
    }

    pub fn remainder(&self) -> usize {
        self.remainder
    }

    /// Number of rows owned by `rank`.
    #[inline]
    pub fn local_rows(&self, rank: usize) -> usize {
        debug_assert!(rank < self.workers);
        self.rows_per_worker + usize::from(rank < self.remainder)
    }

    /// First row owned by `rank`.
    #[inline]
    pub fn offset(&self, rank: usize) -> usize {
        debug_assert!(rank < self.workers);
        rank * self.rows_per_worker + rank.min(self.remainder)
    }

    /// Rows owned by `rank` as a half-open range.
    pub fn range(&self, rank: usize) -> Range<usize> {
        let start = self.offset(rank);
        start..start + self.local_rows(rank)
    }

    /// Element count each rank contributes when every row has `cols` elements.
    pub fn counts(&self, cols: usize) -> Vec<usize> {
        (0..self.workers)
            .map(|rank| self.local_rows(rank) * cols)
            .collect()
    }

    /// Element offset of each rank's contribution in the gathered buffer.
    pub fn displacements(&self, cols: usize) -> Vec<usize> {
        (0..self.workers)
            .map(|rank| self.offset(rank) * cols)
            .collect()
    }
}
