//! Routes an `(algorithm, mode)` pair to its variant.
//!
//! | Algorithm | Sequential | SharedMemory | Distributed | Hybrid |
//! |-----------|:----------:|:------------:|:-----------:|:------:|
//! | Naive     | yes        | yes          | yes         | yes    |
//! | Strassen  | yes        | yes          | yes         | yes    |
//! | Reference | yes        |              |             |        |
//!
//! Distributed and hybrid modes run on a [`LocalCluster`] of
//! `config.processes` ranks. The caller's operands are the root's inputs and
//! the root's gathered result is returned.

use tracing::debug;

use crate::comm::{Communicator, LocalCluster, ROOT_RANK};
use crate::config::{Algorithm, Config, ExecutionMode};
use crate::error::{invalid_config, MatmulError, Result};
use crate::matrix::Matrix;
use crate::{naive, reference, strassen};

/// Whether `(algorithm, mode)` has an implementation.
pub fn is_registered(algorithm: Algorithm, mode: ExecutionMode) -> bool {
    !matches!(
        (algorithm, mode),
        (Algorithm::Reference, ExecutionMode::SharedMemory)
            | (Algorithm::Reference, ExecutionMode::Distributed)
            | (Algorithm::Reference, ExecutionMode::Hybrid)
    )
}

/// Multiplies `a * b` with `config.algorithm` under `config.mode`.
///
/// # Errors
///
/// - [`MatmulError::InvalidAlgorithmModeCombination`] for an unregistered pair.
/// - Whatever the selected variant reports for its operands.
pub fn multiply(a: &Matrix, b: &Matrix, config: &Config) -> Result<Matrix> {
    multiply_with(config.algorithm, config.mode, a, b, config)
}

/// Like [`multiply`] with the algorithm and mode given explicitly; the rest of
/// `config` supplies options and worker counts.
pub fn multiply_with(
    algorithm: Algorithm,
    mode: ExecutionMode,
    a: &Matrix,
    b: &Matrix,
    config: &Config,
) -> Result<Matrix> {
    if !is_registered(algorithm, mode) {
        return Err(MatmulError::InvalidAlgorithmModeCombination { algorithm, mode });
    }
    debug!(%algorithm, %mode, lhs = %a.dims(), rhs = %b.dims(), "dispatching multiply");

    let options = &config.optimization;
    let threads = config.threads;
    match mode {
        ExecutionMode::Sequential => match algorithm {
            Algorithm::Naive => naive::sequential(a, b, options),
            Algorithm::Strassen => strassen::sequential(a, b, options),
            Algorithm::Reference => reference::multiply(a, b),
        },
        ExecutionMode::SharedMemory => match algorithm {
            Algorithm::Naive => naive::shared(a, b, options, threads),
            Algorithm::Strassen => strassen::shared(a, b, options, threads),
            Algorithm::Reference => Err(MatmulError::InvalidAlgorithmModeCombination { algorithm, mode }),
        },
        ExecutionMode::Distributed | ExecutionMode::Hybrid => {
            if config.processes == 0 {
                return Err(invalid_config("process count must be positive"));
            }
            let results = LocalCluster::new(config.processes).run(|comm| {
                let empty = Matrix::default();
                let (a_in, b_in) = if comm.rank() == ROOT_RANK { (a, b) } else { (&empty, &empty) };
                match (algorithm, mode) {
                    (Algorithm::Naive, ExecutionMode::Distributed) => {
                        naive::distributed(comm, a_in, b_in, options)
                    }
                    (Algorithm::Naive, _) => naive::hybrid(comm, a_in, b_in, options, threads),
                    (Algorithm::Strassen, ExecutionMode::Distributed) => {
                        strassen::distributed(comm, a_in, b_in, options)
                    }
                    (Algorithm::Strassen, _) => strassen::hybrid(comm, a_in, b_in, options, threads),
                    (Algorithm::Reference, _) => {
                        Err(MatmulError::InvalidAlgorithmModeCombination { algorithm, mode })
                    }
                }
            });
            results
                .into_iter()
                .nth(ROOT_RANK)
                .unwrap_or_else(|| Err(invalid_config("rank group returned no results")))
        }
    }
}
