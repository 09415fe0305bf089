//! Genetic algorithm adapter for arrangements.
//!
//! [`LayoutIndividual`] carries a whole arrangement as its genome, and
//! crossover and mutation delegate to [`LayoutOperators`]. [`LayoutProblem`]
//! seeds the population from randomized copies of a base arrangement and
//! scores members with the configured fitness evaluator.

use crate::arrangement::Arrangement;
use crate::fitness::{FitnessConfig, FitnessReport};
use crate::operators::LayoutOperators;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use siteplan_core::ga::{GaProblem, Individual};
use siteplan_core::{MetricSet, Ranked};
use std::sync::Arc;

/// One population member.
#[derive(Debug, Clone)]
pub struct LayoutIndividual {
    layout: Arrangement,
    fitness: f64,
    feasible: bool,
    metrics: MetricSet,
    operators: Arc<LayoutOperators>,
}

impl LayoutIndividual {
    /// Wraps an arrangement that has not been scored yet.
    pub fn new(layout: Arrangement, operators: Arc<LayoutOperators>) -> Self {
        Self {
            layout,
            fitness: f64::NEG_INFINITY,
            feasible: false,
            metrics: MetricSet::new(),
            operators,
        }
    }

    pub fn layout(&self) -> &Arrangement {
        &self.layout
    }

    pub fn into_layout(self) -> Arrangement {
        self.layout
    }

    pub fn is_evaluated(&self) -> bool {
        !self.metrics.is_empty()
    }

    /// True once scored with every operation routable.
    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    pub fn set_report(&mut self, report: FitnessReport) {
        self.feasible = report.feasible;
        self.fitness = report.score;
        self.metrics = report.metrics;
    }

    /// Packages the member for a result list.
    pub fn to_ranked(&self) -> Ranked<Arrangement> {
        Ranked {
            item: self.layout.clone(),
            score: self.fitness,
            metrics: self.metrics.clone(),
        }
    }
}

impl Individual for LayoutIndividual {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn metrics(&self) -> Option<&MetricSet> {
        self.is_evaluated().then_some(&self.metrics)
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let layout = self.operators.crossover(&self.layout, &other.layout, rng);
        Self::new(layout, self.operators.clone())
    }

    fn mutate<R: Rng>(&mut self, rng: &mut R) {
        self.operators.mutate(&mut self.layout, rng);
        self.fitness = f64::NEG_INFINITY;
        self.feasible = false;
        self.metrics.clear();
    }
}

/// Population lifecycle for layout search.
pub struct LayoutProblem {
    base: Arrangement,
    operators: Arc<LayoutOperators>,
    fitness: FitnessConfig,
}

impl LayoutProblem {
    pub fn new(base: Arrangement, operators: LayoutOperators, fitness: FitnessConfig) -> Self {
        Self {
            base,
            operators: Arc::new(operators),
            fitness,
        }
    }

    pub fn base(&self) -> &Arrangement {
        &self.base
    }

    pub fn fitness_config(&self) -> &FitnessConfig {
        &self.fitness
    }

    /// A randomized copy of the base arrangement.
    ///
    /// Falls back to an unmodified copy when no routable placement is found
    /// within the retry budget.
    pub fn random_individual<R: Rng + ?Sized>(&self, rng: &mut R) -> LayoutIndividual {
        let mut layout = self.base.clone();
        let outcome = self.operators.builder().randomize(&mut layout, rng);
        if !outcome.is_placed() {
            log::warn!(
                "no routable placement after {} attempts, using the base arrangement",
                outcome.attempts()
            );
        }
        LayoutIndividual::new(layout, self.operators.clone())
    }
}

impl GaProblem for LayoutProblem {
    type Individual = LayoutIndividual;

    fn evaluate(&self, individual: &mut LayoutIndividual) {
        let report = self.fitness.evaluate(&individual.layout);
        individual.set_report(report);
    }

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<LayoutIndividual> {
        let seeds: Vec<u64> = (0..size).map(|_| rng.gen()).collect();
        seeds
            .par_iter()
            .map(|&seed| self.random_individual(&mut StdRng::seed_from_u64(seed)))
            .collect()
    }

    fn on_generation(&self, generation: u32, best: &LayoutIndividual, population: &[LayoutIndividual]) {
        let feasible = population
            .iter()
            .filter(|ind| ind.is_feasible())
            .count();
        log::debug!(
            "generation {}: best {:.4}, {}/{} routable",
            generation,
            best.fitness(),
            feasible,
            population.len()
        );
    }
}
