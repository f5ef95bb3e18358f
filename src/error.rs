//! Error types for stratmul operations.
//!
//! Every failure the core can report is synchronous and non-retryable: the
//! caller gets a [`MatmulError`] describing which precondition was violated.
//! Failures inside a distributed collective are not represented here: a
//! rank that cannot complete a broadcast or all-gather aborts the whole
//! process group instead (see [`crate::comm`]).

use thiserror::Error;

use crate::config::{Algorithm, ExecutionMode};
use crate::matrix::Dims;

/// Errors that can occur during stratmul operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatmulError {
    /// Operand shapes are incompatible for the requested operation.
    ///
    /// Raised by multiplication when `lhs.cols != rhs.rows` and by elementwise
    /// addition/subtraction when the shapes differ.
    #[error("dimension mismatch in {op}: [{lhs}] vs [{rhs}]")]
    DimensionMismatch {
        /// Name of the operation that rejected its operands.
        op: &'static str,
        lhs: Dims,
        rhs: Dims,
    },

    /// Strassen received operands that are not square or not of equal size.
    #[error("Strassen requires square operands of equal size, got [{lhs}] and [{rhs}]")]
    NonSquareInput { lhs: Dims, rhs: Dims },

    /// The dispatcher has no implementation registered for the pair.
    #[error("no implementation registered for {algorithm} in {mode} mode")]
    InvalidAlgorithmModeCombination {
        algorithm: Algorithm,
        mode: ExecutionMode,
    },

    /// A verification suite was requested with fewer than two algorithms.
    #[error("verification suite needs at least 2 distinct algorithms, got {selected}")]
    InsufficientSelection { selected: usize },

    /// A configuration value or argument is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The shared-memory worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Result type alias for stratmul operations.
pub type Result<T> = std::result::Result<T, MatmulError>;

/// Creates a dimension mismatch error for `op`.
pub fn dimension_mismatch(op: &'static str, lhs: Dims, rhs: Dims) -> MatmulError {
    MatmulError::DimensionMismatch { op, lhs, rhs }
}

/// Creates a non-square input error.
pub fn non_square(lhs: Dims, rhs: Dims) -> MatmulError {
    MatmulError::NonSquareInput { lhs, rhs }
}

/// Creates an invalid configuration error.
pub fn invalid_config(message: impl Into<String>) -> MatmulError {
    MatmulError::InvalidConfig(message.into())
}

impl From<rayon::ThreadPoolBuildError> for MatmulError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        MatmulError::ThreadPool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let error = dimension_mismatch("multiply", Dims::new(2, 3), Dims::new(4, 5));
        let display = format!("{}", error);
        assert!(display.contains("dimension mismatch in multiply"));
        assert!(display.contains("[2x3]"));
        assert!(display.contains("[4x5]"));
    }

    #[test]
    fn test_non_square_display() {
        let error = non_square(Dims::new(3, 4), Dims::new(4, 4));
        let display = format!("{}", error);
        assert!(display.contains("square operands"));
        assert!(display.contains("[3x4]"));
    }

    #[test]
    fn test_invalid_combination_display() {
        let error = MatmulError::InvalidAlgorithmModeCombination {
            algorithm: Algorithm::Reference,
            mode: ExecutionMode::Hybrid,
        };
        assert_eq!(
            error.to_string(),
            "no implementation registered for Reference in Hybrid mode"
        );
    }

    #[test]
    fn test_insufficient_selection_display() {
        let error = MatmulError::InsufficientSelection { selected: 1 };
        assert!(error.to_string().contains("got 1"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = invalid_config("threads must be positive");
        let error2 = invalid_config("threads must be positive");
        let error3 = invalid_config("block size must be positive");

        assert_eq!(error1, error2);
        assert_ne!(error1, error3);
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = non_square(Dims::new(1, 2), Dims::new(2, 1));
        let _: &dyn std::error::Error = &error;
        assert!(std::error::Error::source(&error).is_none());
    }
}
