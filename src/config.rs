//! Run configuration consumed by the dispatcher, verification engine and runner.
//!
//! The configuration is produced by an outer collaborator (an interactive menu,
//! a CLI, a TOML file...). It is plain data: `serde` derives let the
//! collaborator load it from whatever format it likes, and [`Config::validate`]
//! checks the ranges the core relies on.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{invalid_config, Result};
use crate::{
    DEFAULT_ABS_TOLERANCE, DEFAULT_BLOCK_SIZE, DEFAULT_MATRIX_SIZE, DEFAULT_REL_TOLERANCE,
    STRASSEN_THRESHOLD,
};

/// Multiplication strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Triple-loop product, optionally cache blocked.
    #[default]
    Naive,
    /// Recursive seven-product divide and conquer.
    Strassen,
    /// Externally supplied optimized primitive, used as ground truth.
    Reference,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Naive, Algorithm::Strassen, Algorithm::Reference];

    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Naive => "Naive",
            Algorithm::Strassen => "Strassen",
            Algorithm::Reference => "Reference",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Execution model a variant runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Single thread, single process.
    #[default]
    Sequential,
    /// Worker pool inside one process.
    SharedMemory,
    /// Row-partitioned across cooperating ranks.
    Distributed,
    /// Distributed row partition with a worker pool per rank.
    Hybrid,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 4] = [
        ExecutionMode::Sequential,
        ExecutionMode::SharedMemory,
        ExecutionMode::Distributed,
        ExecutionMode::Hybrid,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "Sequential",
            ExecutionMode::SharedMemory => "SharedMemory",
            ExecutionMode::Distributed => "Distributed",
            ExecutionMode::Hybrid => "Hybrid",
        }
    }

    /// Whether the mode row-partitions work across ranks.
    pub fn is_distributed(&self) -> bool {
        matches!(self, ExecutionMode::Distributed | ExecutionMode::Hybrid)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Loop-level tuning knobs shared by the naive and Strassen families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationOptions {
    /// Use the `ii, jj, kk` blocked traversal instead of the plain triple loop.
    pub cache_blocking: bool,
    /// Edge length of a block when `cache_blocking` is set.
    pub block_size: usize,
    /// Strassen recursion stops and falls back to the naive family at or
    /// below this size. Must be at least 1.
    pub strassen_threshold: usize,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            cache_blocking: false,
            block_size: DEFAULT_BLOCK_SIZE,
            strassen_threshold: STRASSEN_THRESHOLD,
        }
    }
}

impl OptimizationOptions {
    /// Options with cache blocking enabled at the given block size.
    pub fn blocked(block_size: usize) -> Self {
        Self {
            cache_blocking: true,
            block_size,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(invalid_config("block size must be positive"));
        }
        if self.strassen_threshold == 0 {
            return Err(invalid_config("Strassen threshold must be at least 1"));
        }
        Ok(())
    }

    /// Block size to use, or `None` when blocking is off.
    pub(crate) fn block(&self) -> Option<usize> {
        self.cache_blocking.then_some(self.block_size)
    }
}

/// Combined absolute + relative tolerance pair.
///
/// An element pair `(a, b)` is accepted when
/// `|a - b| <= max(abs, rel * max(|a|, |b|))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Tolerances {
    pub fn new(abs: f64, rel: f64) -> Self {
        Self { abs, rel }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.abs.is_finite() && self.abs > 0.0) {
            return Err(invalid_config(format!(
                "absolute tolerance must be a positive finite number, got {}",
                self.abs
            )));
        }
        if !(self.rel.is_finite() && self.rel > 0.0) {
            return Err(invalid_config(format!(
                "relative tolerance must be a positive finite number, got {}",
                self.rel
            )));
        }
        Ok(())
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: DEFAULT_ABS_TOLERANCE,
            rel: DEFAULT_REL_TOLERANCE,
        }
    }
}

/// Cross-validation requested alongside (or instead of) a single run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationOptions {
    /// Algorithms to run and compare pairwise. Empty disables the suite.
    pub suite: Vec<Algorithm>,
    /// Check a single run's result against the reference engine.
    pub validate_against_reference: bool,
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub algorithm: Algorithm,
    pub mode: ExecutionMode,
    pub optimization: OptimizationOptions,
    /// Worker threads per process for shared-memory and hybrid modes.
    pub threads: usize,
    /// Number of cooperating ranks for distributed and hybrid modes.
    pub processes: usize,
    /// Edge length `N` of generated operands.
    pub matrix_size: usize,
    pub tolerances: Tolerances,
    pub verification: VerificationOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            mode: ExecutionMode::default(),
            optimization: OptimizationOptions::default(),
            threads: 1,
            processes: 1,
            matrix_size: DEFAULT_MATRIX_SIZE,
            tolerances: Tolerances::default(),
            verification: VerificationOptions::default(),
        }
    }
}

impl Config {
    pub fn new(algorithm: Algorithm, mode: ExecutionMode) -> Self {
        Self {
            algorithm,
            mode,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_processes(mut self, processes: usize) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_optimization(mut self, optimization: OptimizationOptions) -> Self {
        self.optimization = optimization;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn with_matrix_size(mut self, matrix_size: usize) -> Self {
        self.matrix_size = matrix_size;
        self
    }

    /// Checks every range the core relies on.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(invalid_config("thread count must be positive"));
        }
        if self.processes == 0 {
            return Err(invalid_config("process count must be positive"));
        }
        if self.matrix_size == 0 {
            return Err(invalid_config("matrix size must be positive"));
        }
        self.optimization.validate()?;
        self.tolerances.validate()
    }
}
