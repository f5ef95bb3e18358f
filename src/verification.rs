//! Cross-validation of multiplication variants.
//!
//! Two checks are offered:
//!
//! - [`validate_against_reference`] compares one result with the reference
//!   engine's product of the same operands.
//! - [`run_suite`] runs several algorithms on the same operands under one
//!   execution mode, times each run, and compares every unordered pair of
//!   results. The suite passes iff every pairwise comparison passes.
//!
//! Nothing here prints; reports are returned as values for the caller to
//! render.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::comparison::ComparisonResult;
use crate::config::{Algorithm, Config, ExecutionMode, Tolerances};
use crate::dispatch;
use crate::error::{MatmulError, Result};
use crate::matrix::Matrix;
use crate::reference;

/// Outcome of validating one result against the reference engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    /// Algorithm that produced the validated result.
    pub algorithm: Algorithm,
    pub passed: bool,
    pub comparison: ComparisonResult,
}

/// Computes `a * b` with the reference engine and compares `result` to it.
///
/// # Errors
///
/// Propagates the reference engine's dimension check. A shape mismatch
/// between `result` and the reference product is reported as a failing
/// validation, not an error.
pub fn validate_against_reference(
    result: &Matrix,
    a: &Matrix,
    b: &Matrix,
    algorithm: Algorithm,
    tolerances: Tolerances,
) -> Result<Validation> {
    let expected = reference::multiply(a, b)?;
    let comparison = result.compare(&expected, tolerances);
    if comparison.passed {
        info!(%algorithm, max_abs_error = comparison.max_abs_error, "reference validation passed");
    } else {
        warn!(
            %algorithm,
            failures = comparison.num_failures,
            max_abs_error = comparison.max_abs_error,
            "reference validation failed"
        );
    }
    Ok(Validation {
        algorithm,
        passed: comparison.passed,
        comparison,
    })
}

/// One algorithm's run inside a suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    /// Mode the run actually used.
    pub mode: ExecutionMode,
    #[serde(skip)]
    pub result: Matrix,
    pub elapsed: Duration,
}

/// Comparison of two suite runs, `first` being the `this` side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub first: Algorithm,
    pub second: Algorithm,
    pub comparison: ComparisonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuiteReport {
    /// Runs in selection order.
    pub runs: Vec<AlgorithmRun>,
    /// Every unordered pair `(i, j)` with `i < j`, in lexicographic order.
    pub comparisons: Vec<PairwiseComparison>,
    pub passed: bool,
}

impl SuiteReport {
    pub fn failures(&self) -> impl Iterator<Item = &PairwiseComparison> {
        self.comparisons.iter().filter(|c| !c.comparison.passed)
    }
}

/// Drops repeated algorithms, keeping first occurrences in order.
fn distinct(algorithms: &[Algorithm]) -> Vec<Algorithm> {
    let mut selected = Vec::with_capacity(algorithms.len());
    for &algorithm in algorithms {
        if !selected.contains(&algorithm) {
            selected.push(algorithm);
        }
    }
    selected
}

/// Runs every algorithm in `algorithms` on `a * b` and compares the results
/// pairwise with `config.tolerances`.
///
/// Each algorithm runs once under `config.mode` with `config`'s worker counts
/// and options. The reference engine only has a sequential path and always
/// runs through it.
///
/// # Errors
///
/// - [`MatmulError::InsufficientSelection`] when fewer than two distinct
///   algorithms are selected. Nothing runs in that case.
/// - The first error any run reports.
pub fn run_suite(
    a: &Matrix,
    b: &Matrix,
    algorithms: &[Algorithm],
    config: &Config,
) -> Result<SuiteReport> {
    let selected = distinct(algorithms);
    if selected.len() < 2 {
        return Err(MatmulError::InsufficientSelection {
            selected: selected.len(),
        });
    }
    info!(
        algorithms = ?selected,
        mode = %config.mode,
        lhs = %a.dims(),
        rhs = %b.dims(),
        "starting verification suite"
    );

    let mut runs = Vec::with_capacity(selected.len());
    for algorithm in selected {
        let mode = match algorithm {
            Algorithm::Reference => ExecutionMode::Sequential,
            _ => config.mode,
        };
        let start = Instant::now();
        let result = dispatch::multiply_with(algorithm, mode, a, b, config)?;
        let elapsed = start.elapsed();
        info!(%algorithm, %mode, elapsed_secs = elapsed.as_secs_f64(), "suite run finished");
        runs.push(AlgorithmRun {
            algorithm,
            mode,
            result,
            elapsed,
        });
    }

    let mut comparisons = Vec::new();
    for (i, first) in runs.iter().enumerate() {
        for second in &runs[i + 1..] {
            let comparison = first.result.compare(&second.result, config.tolerances);
            if !comparison.passed {
                warn!(
                    first = %first.algorithm,
                    second = %second.algorithm,
                    failures = comparison.num_failures,
                    max_abs_error = comparison.max_abs_error,
                    "pairwise comparison failed"
                );
            }
            comparisons.push(PairwiseComparison {
                first: first.algorithm,
                second: second.algorithm,
                comparison,
            });
        }
    }

    let passed = comparisons.iter().all(|c| c.comparison.passed);
    info!(passed, pairs = comparisons.len(), "verification suite finished");
    Ok(SuiteReport {
        runs,
        comparisons,
        passed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn operands(n: usize) -> (Matrix, Matrix) {
        let mut rng = StdRng::seed_from_u64(2024);
        let a = Matrix::random(n, n, 0.0, 10.0, &mut rng).unwrap();
        let b = Matrix::random(n, n, 0.0, 10.0, &mut rng).unwrap();
        (a, b)
    }

    #[test]
    fn test_validation_passes_for_naive() {
        let (a, b) = operands(12);
        let c = dispatch::multiply(&a, &b, &Config::default()).unwrap();
        let validation =
            validate_against_reference(&c, &a, &b, Algorithm::Naive, Tolerances::default()).unwrap();
        assert!(validation.passed);
        assert_eq!(validation.algorithm, Algorithm::Naive);
        assert_eq!(validation.comparison.num_elements, 144);
    }

    #[test]
    fn test_validation_fails_for_corrupted_result() {
        let (a, b) = operands(4);
        let mut c = reference::multiply(&a, &b).unwrap();
        c[(2, 1)] += 1.0;
        let validation =
            validate_against_reference(&c, &a, &b, Algorithm::Strassen, Tolerances::default())
                .unwrap();
        assert!(!validation.passed);
        assert_eq!(validation.comparison.num_failures, 1);
        let worst = validation.comparison.worst.unwrap();
        assert_eq!((worst.row, worst.col), (2, 1));
    }

    #[test]
    fn test_validation_with_wrong_shape_fails_without_error() {
        let (a, b) = operands(4);
        let validation = validate_against_reference(
            &Matrix::new(3, 3),
            &a,
            &b,
            Algorithm::Naive,
            Tolerances::default(),
        )
        .unwrap();
        assert!(!validation.passed);
    }

    #[test]
    fn test_suite_requires_two_distinct_algorithms() {
        let (a, b) = operands(4);
        let config = Config::default();
        for selection in [
            vec![],
            vec![Algorithm::Naive],
            vec![Algorithm::Strassen, Algorithm::Strassen],
        ] {
            let err = run_suite(&a, &b, &selection, &config).unwrap_err();
            assert!(matches!(err, MatmulError::InsufficientSelection { .. }));
        }
    }

    #[test]
    fn test_suite_over_all_algorithms() {
        let (a, b) = operands(16);
        let config = Config::new(Algorithm::Naive, ExecutionMode::SharedMemory).with_threads(2);
        let report = run_suite(&a, &b, &Algorithm::ALL, &config).unwrap();

        assert!(report.passed);
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.comparisons.len(), 3);
        assert_eq!(report.failures().count(), 0);

        let pairs: Vec<_> = report.comparisons.iter().map(|c| (c.first, c.second)).collect();
        assert_eq!(
            pairs,
            vec![
                (Algorithm::Naive, Algorithm::Strassen),
                (Algorithm::Naive, Algorithm::Reference),
                (Algorithm::Strassen, Algorithm::Reference),
            ]
        );

        let reference_run = &report.runs[2];
        assert_eq!(reference_run.algorithm, Algorithm::Reference);
        assert_eq!(reference_run.mode, ExecutionMode::Sequential);
        assert_eq!(report.runs[0].mode, ExecutionMode::SharedMemory);
    }

    #[test]
    fn test_suite_dedupes_keeping_first_occurrence() {
        let (a, b) = operands(8);
        let selection = [Algorithm::Strassen, Algorithm::Naive, Algorithm::Strassen];
        let report = run_suite(&a, &b, &selection, &Config::default()).unwrap();
        let order: Vec<_> = report.runs.iter().map(|r| r.algorithm).collect();
        assert_eq!(order, vec![Algorithm::Strassen, Algorithm::Naive]);
        assert_eq!(report.comparisons.len(), 1);
    }

    #[test]
    fn test_suite_propagates_variant_errors() {
        let a = Matrix::new(3, 4);
        let b = Matrix::new(4, 3);
        let err = run_suite(&a, &b, &[Algorithm::Naive, Algorithm::Strassen], &Config::default())
            .unwrap_err();
        assert!(matches!(err, MatmulError::NonSquareInput { .. }));
    }
}
