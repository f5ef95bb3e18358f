//! Dense matrix multiplication with cross-validated strategies.
//!
//! Three algorithms ([`Algorithm`]) run under four execution modes
//! ([`ExecutionMode`]):
//!
//! - **Naive**: triple loop, optionally cache blocked.
//! - **Strassen**: seven-product recursion over square operands.
//! - **Reference**: an external optimized GEMM used as ground truth.
//!
//! Shared-memory modes run on a [`pool::WorkerPool`]; distributed modes
//! row-partition the left operand across the ranks of a [`comm::Communicator`]
//! and reassemble the product with an all-gather.
//!
//! The [`verification`] engine compares results with a combined absolute and
//! relative tolerance and reports error statistics, so every variant can be
//! checked against every other.
//!
//! ```
//! use stratmul::{dispatch, Algorithm, Config, ExecutionMode, Matrix};
//!
//! let a = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]])?;
//! let b = Matrix::identity(2);
//! let config = Config::new(Algorithm::Strassen, ExecutionMode::SharedMemory).with_threads(2);
//! let c = dispatch::multiply(&a, &b, &config)?;
//! assert_eq!(c, a);
//! # Ok::<(), stratmul::MatmulError>(())
//! ```

pub mod comm;
pub mod comparison;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod matrix;
pub mod naive;
pub mod partition;
pub mod pool;
pub mod reference;
pub mod runner;
pub mod strassen;
pub mod verification;

pub use comparison::{ComparisonResult, WorstElement};
pub use config::{Algorithm, Config, ExecutionMode, OptimizationOptions, Tolerances};
pub use error::{MatmulError, Result};
pub use matrix::{Dims, Matrix};
pub use partition::RowPartition;

/// Size at or below which Strassen falls back to the naive kernel.
pub const STRASSEN_THRESHOLD: usize = 64;
/// Default edge length of a cache block.
pub const DEFAULT_BLOCK_SIZE: usize = 64;
/// Default edge length of generated operands.
pub const DEFAULT_MATRIX_SIZE: usize = 100;

pub const DEFAULT_ABS_TOLERANCE: f64 = 1e-8;
pub const DEFAULT_REL_TOLERANCE: f64 = 1e-5;
