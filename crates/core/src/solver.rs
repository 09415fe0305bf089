//! Solver traits and configuration.

use crate::Result;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Search algorithm used to explore arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AlgorithmKind {
    /// Cluster-aware genetic algorithm with repair.
    #[default]
    GeneticAlgorithm,
    /// Independent random restarts, keeping the best seen (baseline).
    RandomSearch,
}

impl AlgorithmKind {
    /// Stable name used in reports; matches the serialized form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GeneticAlgorithm => "genetic_algorithm",
            Self::RandomSearch => "random_search",
        }
    }
}

/// Common configuration for the search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Search algorithm.
    pub algorithm: AlgorithmKind,

    /// Number of arrangements alive per generation.
    pub population_size: usize,

    /// Generation budget.
    pub max_generations: u32,

    /// Probability that two parents are recombined rather than cloned.
    pub crossover_rate: f64,

    /// Probability that a child is handed to the mutation operator.
    pub mutation_rate: f64,

    /// Members copied unmodified into the next generation.
    pub elite_count: usize,

    /// Sample size for tournament selection.
    pub tournament_size: usize,

    /// Number of arrangements returned at the end.
    pub top_n: usize,

    /// Generations without improvement before stopping early (None = never).
    pub stagnation_limit: Option<u32>,

    /// Generations that always run before the stagnation limit applies.
    pub min_generations: u32,

    /// Maximum computation time in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    /// Number of worker threads (0 = rayon default).
    pub threads: usize,

    /// Seed for reproducible runs (None = entropy).
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::default(),
            population_size: 20,
            max_generations: 25,
            crossover_rate: 0.8,
            mutation_rate: 1.0,
            elite_count: 3,
            tournament_size: 3,
            top_n: 3,
            stagnation_limit: None,
            min_generations: 0,
            time_limit_ms: 0,
            threads: 0,
            seed: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the search algorithm.
    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the population size (at least 2).
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(2);
        self
    }

    /// Sets the generation budget.
    pub fn with_max_generations(mut self, generations: u32) -> Self {
        self.max_generations = generations;
        self
    }

    /// Sets the crossover rate.
    pub fn with_crossover_rate(mut self, rate: f64) -> Self {
        self.crossover_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count;
        self
    }

    /// Sets the tournament size (at least 1).
    pub fn with_tournament_size(mut self, size: usize) -> Self {
        self.tournament_size = size.max(1);
        self
    }

    /// Sets how many arrangements are returned.
    pub fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n.max(1);
        self
    }

    /// Enables early stopping after `limit` stagnant generations, never before `floor`.
    pub fn with_stagnation_limit(mut self, limit: u32, floor: u32) -> Self {
        self.stagnation_limit = Some(limit);
        self.min_generations = floor;
        self
    }

    /// Sets the time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Progress callback for long-running searches.
pub type ProgressCallback = Box<dyn Fn(ProgressInfo) + Send + Sync>;

/// Progress information emitted once per generation.
#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    /// Current generation number.
    pub generation: u32,
    /// Generation budget.
    pub max_generations: u32,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Mean fitness of the current population.
    pub avg_fitness: f64,
    /// Elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Whether the search is still running.
    pub running: bool,
}

impl ProgressInfo {
    /// Creates a new progress info for a running search.
    pub fn new() -> Self {
        Self {
            running: true,
            ..Default::default()
        }
    }

    /// Sets the generation info.
    pub fn with_generation(mut self, current: u32, total: u32) -> Self {
        self.generation = current;
        self.max_generations = total;
        self
    }

    /// Sets the fitness summary.
    pub fn with_fitness(mut self, best: f64, avg: f64) -> Self {
        self.best_fitness = best;
        self.avg_fitness = avg;
        self
    }

    /// Sets the elapsed time.
    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Marks the search as finished.
    pub fn finished(mut self) -> Self {
        self.running = false;
        self
    }

    /// Calculates the progress fraction (0.0 to 1.0).
    pub fn progress_percent(&self) -> f64 {
        if self.max_generations > 0 {
            (self.generation as f64 / self.max_generations as f64).min(1.0)
        } else {
            0.0
        }
    }
}

/// Trait for layout solvers.
pub trait Solver {
    /// Problem instance handed to the solver.
    type Input;
    /// Result produced on success.
    type Output;

    /// Runs the search to completion.
    fn solve(&self, input: &Self::Input) -> Result<Self::Output>;

    /// Runs the search, reporting progress after every generation.
    fn solve_with_progress(
        &self,
        input: &Self::Input,
        callback: ProgressCallback,
    ) -> Result<Self::Output>;

    /// Requests that no further generations are launched.
    fn cancel(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.algorithm, AlgorithmKind::GeneticAlgorithm);
        assert_eq!(config.population_size, 20);
        assert_eq!(config.elite_count, 3);
        assert_eq!(config.tournament_size, 3);
        assert_eq!(config.top_n, 3);
        assert!(config.stagnation_limit.is_none());
    }

    #[test]
    fn test_builder_clamps() {
        let config = Config::new()
            .with_population_size(1)
            .with_crossover_rate(1.5)
            .with_tournament_size(0)
            .with_top_n(0)
            .with_stagnation_limit(5, 10)
            .with_seed(7);

        assert_eq!(config.population_size, 2);
        assert_eq!(config.crossover_rate, 1.0);
        assert_eq!(config.tournament_size, 1);
        assert_eq!(config.top_n, 1);
        assert_eq!(config.stagnation_limit, Some(5));
        assert_eq!(config.min_generations, 10);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!(AlgorithmKind::GeneticAlgorithm.name(), "genetic_algorithm");
        assert_eq!(AlgorithmKind::RandomSearch.name(), "random_search");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_algorithm_name_matches_serialized_form() {
        for kind in [AlgorithmKind::GeneticAlgorithm, AlgorithmKind::RandomSearch] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            let back: AlgorithmKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_progress_percent() {
        let info = ProgressInfo::new().with_generation(5, 20);
        assert!((info.progress_percent() - 0.25).abs() < 1e-12);
        assert!(info.running);
        assert!(!info.finished().running);
    }
}
