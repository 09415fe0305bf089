//! Search result representation.

use crate::metrics::{MetricSet, MetricsTable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One returned candidate with its score and itemized metrics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ranked<T> {
    /// The candidate itself.
    pub item: T,
    /// Scalar fitness (higher is better).
    pub score: f64,
    /// Metrics from the evaluation that produced `score`.
    pub metrics: MetricSet,
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveResult<T> {
    /// Best candidates, best first.
    pub layouts: Vec<Ranked<T>>,

    /// Number of completed generations.
    pub generations: u32,

    /// Computation time in milliseconds.
    pub computation_time_ms: u64,

    /// Best fitness after initialization and after every generation.
    pub fitness_history: Vec<f64>,

    /// Per-generation metric distributions.
    pub metrics: MetricsTable,

    /// Algorithm that produced the result.
    pub strategy: String,

    /// Whether the run was cancelled early.
    pub cancelled: bool,
}

impl<T> SolveResult<T> {
    /// Creates an empty result for the named strategy.
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            layouts: Vec::new(),
            generations: 0,
            computation_time_ms: 0,
            fitness_history: Vec::new(),
            metrics: MetricsTable::new(),
            strategy: strategy.into(),
            cancelled: false,
        }
    }

    /// The best candidate, if any.
    pub fn best(&self) -> Option<&Ranked<T>> {
        self.layouts.first()
    }

    /// Score of the best candidate.
    pub fn best_fitness(&self) -> Option<f64> {
        self.best().map(|r| r.score)
    }

    /// Returns true if the search ran to its own termination condition.
    pub fn completed_normally(&self) -> bool {
        !self.cancelled
    }

    /// Keeps only the best `n` candidates.
    pub fn truncate(&mut self, n: usize) {
        self.layouts.truncate(n);
    }
}

/// Summary statistics for a result.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolveSummary {
    /// Number of candidates returned.
    pub returned: usize,
    /// Best score, or the sentinel when nothing was returned.
    pub best_fitness: f64,
    /// Generations completed.
    pub generations: u32,
    /// Computation time in milliseconds.
    pub time_ms: u64,
    /// Strategy used.
    pub strategy: String,
}

impl<T> From<&SolveResult<T>> for SolveSummary {
    fn from(result: &SolveResult<T>) -> Self {
        Self {
            returned: result.layouts.len(),
            best_fitness: result.best_fitness().unwrap_or(-1.0),
            generations: result.generations,
            time_ms: result.computation_time_ms,
            strategy: result.strategy.clone(),
        }
    }
}
