//! One configured run: either a single timed multiply, optionally validated
//! against the reference engine, or a verification suite.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::info;

use crate::config::Config;
use crate::dispatch;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::verification::{self, SuiteReport, Validation};

/// Lower bound of generated operand values.
pub const RANDOM_MIN: f64 = 0.0;
/// Exclusive upper bound of generated operand values.
pub const RANDOM_MAX: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SingleRun {
    pub result: Matrix,
    pub elapsed: Duration,
    /// Present when `config.verification.validate_against_reference` is set.
    pub validation: Option<Validation>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunReport {
    Single(SingleRun),
    Suite(SuiteReport),
}

impl RunReport {
    /// Whether every requested check passed. A single run without validation
    /// always passes.
    pub fn passed(&self) -> bool {
        match self {
            RunReport::Single(run) => run.validation.as_ref().map_or(true, |v| v.passed),
            RunReport::Suite(report) => report.passed,
        }
    }
}

/// Executes `config` on the operands `a` and `b`.
///
/// A non-empty `config.verification.suite` runs the suite in place of the
/// single multiply.
pub fn run(config: &Config, a: &Matrix, b: &Matrix) -> Result<RunReport> {
    config.validate()?;

    if !config.verification.suite.is_empty() {
        let report = verification::run_suite(a, b, &config.verification.suite, config)?;
        return Ok(RunReport::Suite(report));
    }

    let start = Instant::now();
    let result = dispatch::multiply(a, b, config)?;
    let elapsed = start.elapsed();
    info!(
        algorithm = %config.algorithm,
        mode = %config.mode,
        elapsed_secs = elapsed.as_secs_f64(),
        "multiply finished"
    );

    let validation = if config.verification.validate_against_reference {
        Some(verification::validate_against_reference(
            &result,
            a,
            b,
            config.algorithm,
            config.tolerances,
        )?)
    } else {
        None
    };

    Ok(RunReport::Single(SingleRun {
        result,
        elapsed,
        validation,
    }))
}

/// Two `N x N` operands with values uniform in `[0, 10)`, `N` being
/// `config.matrix_size`.
pub fn random_operands<R: Rng>(config: &Config, rng: &mut R) -> Result<(Matrix, Matrix)> {
    let n = config.matrix_size;
    let a = Matrix::random(n, n, RANDOM_MIN, RANDOM_MAX, rng)?;
    let b = Matrix::random(n, n, RANDOM_MIN, RANDOM_MAX, rng)?;
    Ok((a, b))
}
