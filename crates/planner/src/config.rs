//! Optimizer configuration.

use crate::builder::RetryPolicy;
use crate::cluster::DEFAULT_CLUSTER_DISTANCE;
use crate::fitness::{FitnessConfig, FitnessKind, FitnessWeights};
use serde::{Deserialize, Serialize};
use siteplan_core::{AlgorithmKind, Config, Error, Result};

/// Rates and budgets for the layout crossover and mutation operators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// Per-cluster probability of taking a same-type cluster's positions from the other parent.
    pub cluster_swap_rate: f64,
    /// Per-entity probability of taking a same-type entity's position from the other parent.
    pub entity_swap_rate: f64,
    /// Per-cluster probability of a whole-cluster relocation during mutation.
    pub cluster_mutation_rate: f64,
    /// Per-entity probability of a single relocation during mutation.
    pub single_mutation_rate: f64,
    /// Relocation tries per cluster when repairing a crossover child.
    pub repair_attempts: u32,
    /// Relocation tries per mutation step.
    pub move_attempts: u32,
    /// Anchor distance within which same-type entities form a cluster.
    pub cluster_distance: u32,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            cluster_swap_rate: 0.7,
            entity_swap_rate: 0.1,
            cluster_mutation_rate: 0.3,
            single_mutation_rate: 0.1,
            repair_attempts: 3,
            move_attempts: 1,
            cluster_distance: DEFAULT_CLUSTER_DISTANCE,
        }
    }
}

/// Everything the [`crate::Optimizer`] needs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub search: Config,
    pub fitness: FitnessConfig,
    pub operators: OperatorConfig,
    pub placement: RetryPolicy,
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: Config) -> Self {
        self.search = search;
        self
    }

    pub fn with_algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.search.algorithm = algorithm;
        self
    }

    pub fn with_fitness(mut self, kind: FitnessKind) -> Self {
        self.fitness.kind = kind;
        self
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.fitness.weights = weights;
        self
    }

    pub fn with_operators(mut self, operators: OperatorConfig) -> Self {
        self.operators = operators;
        self
    }

    pub fn with_placement(mut self, placement: RetryPolicy) -> Self {
        self.placement = placement;
        self
    }

    /// Rejects settings the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        if s.population_size == 0 {
            return Err(Error::InvalidConfig("population_size must be at least 1".into()));
        }
        if s.top_n == 0 {
            return Err(Error::InvalidConfig("top_n must be at least 1".into()));
        }
        if s.tournament_size == 0 {
            return Err(Error::InvalidConfig("tournament_size must be at least 1".into()));
        }
        if self.placement.max_attempts == 0 {
            return Err(Error::InvalidConfig("placement.max_attempts must be at least 1".into()));
        }

        let rates = [
            ("crossover_rate", s.crossover_rate),
            ("mutation_rate", s.mutation_rate),
            ("cluster_swap_rate", self.operators.cluster_swap_rate),
            ("entity_swap_rate", self.operators.entity_swap_rate),
            ("cluster_mutation_rate", self.operators.cluster_mutation_rate),
            ("single_mutation_rate", self.operators.single_mutation_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(Error::InvalidConfig(format!("{name} must be within [0, 1], got {rate}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(config.operators.cluster_swap_rate, 0.7);
        assert_eq!(config.operators.cluster_distance, 3);
        assert_eq!(config.placement.max_attempts, 100);
        assert_eq!(config.fitness.kind, FitnessKind::Standard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: OptimizerConfig = serde_json::from_str(
            r#"{"search": {"population_size": 8, "algorithm": "random_search"},
                "fitness": {"kind": "static"},
                "operators": {"repair_attempts": 5}}"#,
        )
        .unwrap();

        assert_eq!(config.search.population_size, 8);
        assert_eq!(config.search.algorithm, AlgorithmKind::RandomSearch);
        assert_eq!(config.search.max_generations, 25);
        assert_eq!(config.fitness.kind, FitnessKind::Static);
        assert_eq!(config.fitness.weights, FitnessWeights::default());
        assert_eq!(config.operators.repair_attempts, 5);
        assert_eq!(config.operators.entity_swap_rate, 0.1);
    }

    #[test]
    fn test_validate_rejects_bad_rates() {
        let mut config = OptimizerConfig::default();
        config.operators.entity_swap_rate = 1.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
