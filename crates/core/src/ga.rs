//! Genetic algorithm framework.
//!
//! Domain crates describe their candidates through [`Individual`] (crossover and
//! mutation live on the individual) and their population lifecycle through
//! [`GaProblem`]. [`GaRunner`] drives the generational loop: evaluate, keep the
//! elites, breed the rest from tournament-selected parents, repeat.
//!
//! Evaluation and breeding both run on the rayon pool. Parents and per-child
//! seeds are drawn sequentially from the master RNG before the parallel step,
//! so a seeded run produces the same result on any number of threads.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::index;
use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics::{GenerationMetrics, MetricSet, MetricsTable};
use crate::solver::{Config, ProgressInfo};
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Generational loop settings, derived from a solver [`Config`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GaConfig {
    pub population_size: usize,
    pub max_generations: u32,
    /// Probability a child is bred by [`Individual::crossover`] rather than cloned.
    pub crossover_rate: f64,
    /// Probability a child is passed to [`Individual::mutate`].
    pub mutation_rate: f64,
    /// Best members carried into the next generation untouched.
    pub elite_count: usize,
    /// Distinct members sampled per parent selection.
    pub tournament_size: usize,
    /// Wall-clock budget checked between generations.
    pub time_limit: Option<Duration>,
    /// Consecutive generations without improvement that end the run.
    pub stagnation_limit: Option<u32>,
    /// Generations that always run before stagnation can stop the search.
    pub min_generations: u32,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for GaConfig {
    fn from(config: &Config) -> Self {
        Self {
            population_size: config.population_size,
            max_generations: config.max_generations,
            crossover_rate: config.crossover_rate,
            mutation_rate: config.mutation_rate,
            elite_count: config.elite_count,
            tournament_size: config.tournament_size,
            time_limit: (config.time_limit_ms > 0)
                .then(|| Duration::from_millis(config.time_limit_ms)),
            stagnation_limit: config.stagnation_limit,
            min_generations: config.min_generations,
        }
    }
}

/// A population member that knows how to recombine and perturb itself.
pub trait Individual: Clone + Send + Sync {
    /// The fitness type (usually f64). Higher is better.
    type Fitness: PartialOrd + Copy + Send + Into<f64>;

    /// Score from the last evaluation; higher is better.
    fn fitness(&self) -> Self::Fitness;

    /// Itemized metrics from the last evaluation, if the problem records any.
    fn metrics(&self) -> Option<&MetricSet> {
        None
    }

    /// Breeds a child from `self` and `other`.
    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self;

    /// Perturbs the member in place. Any cached score becomes stale.
    fn mutate<R: Rng>(&mut self, rng: &mut R);
}

/// Population lifecycle of one problem: seeding, scoring and per-generation hooks.
pub trait GaProblem: Send + Sync {
    type Individual: Individual;

    /// Scores one member, storing the result on it.
    fn evaluate(&self, individual: &mut Self::Individual);

    /// Scores a batch on the rayon pool.
    fn evaluate_parallel(&self, individuals: &mut [Self::Individual]) {
        individuals.par_iter_mut().for_each(|ind| {
            self.evaluate(ind);
        });
    }

    /// Creates the initial population. Must return exactly `size` members.
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    /// Called after each generation.
    fn on_generation(
        &self,
        _generation: u32,
        _best: &Self::Individual,
        _population: &[Self::Individual],
    ) {
    }
}

/// Outcome of [`GaRunner::run_with_rng_and_progress`].
#[derive(Debug, Clone)]
pub struct GaResult<I: Individual> {
    /// Best member seen in any generation.
    pub best: I,
    /// Final population, best first.
    pub population: Vec<I>,
    /// Number of completed generations.
    pub generations: u32,
    pub elapsed: Duration,
    /// Whether the run stopped because it was cancelled.
    pub cancelled: bool,
    /// Best fitness after initialization and after every generation.
    pub history: Vec<f64>,
    /// Metric distribution per generation.
    pub metrics: MetricsTable,
}

impl<I: Individual> GaResult<I> {
    /// The best `n` members of the final population.
    pub fn top(&self, n: usize) -> &[I] {
        &self.population[..n.min(self.population.len())]
    }
}

/// Breeding plan for one child, drawn from the master RNG.
struct ChildPlan {
    first: usize,
    second: usize,
    crossover: bool,
    mutate: bool,
    seed: u64,
}

/// Drives the generational loop for a [`GaProblem`].
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
    cancelled: Arc<AtomicBool>,
}

impl<P: GaProblem> GaRunner<P> {
    pub fn new(config: GaConfig, problem: P) -> Self {
        Self {
            config,
            problem,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an externally owned cancellation flag.
    pub fn with_cancel_handle(mut self, handle: Arc<AtomicBool>) -> Self {
        self.cancelled = handle;
        self
    }

    /// Flag that, once set, stops the run at the next generation boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Returns the problem definition.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Runs the genetic algorithm with an entropy-seeded RNG.
    pub fn run(&self) -> Result<GaResult<P::Individual>> {
        self.run_with_rng(&mut StdRng::from_entropy())
    }

    /// Seeded run without progress reporting.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> Result<GaResult<P::Individual>> {
        self.run_with_rng_and_progress::<R, fn(ProgressInfo)>(rng, None)
    }

    /// Seeded run; `progress_callback` hears about every generation and once more at the end.
    pub fn run_with_rng_and_progress<R: Rng, F>(
        &self,
        rng: &mut R,
        progress_callback: Option<F>,
    ) -> Result<GaResult<P::Individual>>
    where
        F: Fn(ProgressInfo),
    {
        let start = Instant::now();
        let size = self.config.population_size;
        if size == 0 {
            return Err(Error::InvalidConfig(
                "population_size must be at least 1".into(),
            ));
        }

        let mut population = self.problem.initialize_population(size, rng);
        if population.is_empty() {
            return Err(Error::Internal("problem produced an empty population".into()));
        }

        self.problem.evaluate_parallel(&mut population);
        sort_by_fitness(&mut population);

        let mut metrics = MetricsTable::new();
        metrics.push(generation_row(0, &population));

        let mut best = population[0].clone();
        let mut best_fitness: f64 = best.fitness().into();
        let mut history = vec![best_fitness];
        let mut stagnation_count = 0u32;
        let mut generation = 0u32;
        let mut cancelled = false;

        while generation < self.config.max_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            if let Some(limit) = self.config.time_limit {
                if start.elapsed() > limit {
                    break;
                }
            }

            let elite_count = self.config.elite_count.min(population.len()).min(size);
            let mut next: Vec<P::Individual> = population[..elite_count].to_vec();

            let plans: Vec<ChildPlan> = (elite_count..size)
                .map(|_| ChildPlan {
                    first: self.tournament_select(&population, rng),
                    second: self.tournament_select(&population, rng),
                    crossover: rng.gen::<f64>() < self.config.crossover_rate,
                    mutate: rng.gen::<f64>() < self.config.mutation_rate,
                    seed: rng.gen(),
                })
                .collect();

            let mut children: Vec<P::Individual> = plans
                .par_iter()
                .map(|plan| {
                    let mut child_rng = StdRng::seed_from_u64(plan.seed);
                    let parent1 = &population[plan.first];
                    let parent2 = &population[plan.second];

                    let mut child = if plan.crossover {
                        parent1.crossover(parent2, &mut child_rng)
                    } else {
                        parent1.clone()
                    };

                    if plan.mutate {
                        child.mutate(&mut child_rng);
                    }
                    child
                })
                .collect();

            self.problem.evaluate_parallel(&mut children);
            next.extend(children);
            sort_by_fitness(&mut next);

            generation += 1;
            metrics.push(generation_row(generation, &next));

            let new_best_fitness: f64 = next[0].fitness().into();
            if new_best_fitness > best_fitness {
                best = next[0].clone();
                best_fitness = new_best_fitness;
                stagnation_count = 0;
            } else {
                stagnation_count += 1;
            }
            history.push(best_fitness);

            log::debug!(
                "generation {}: best {:.4}, avg {:.4}",
                generation,
                best_fitness,
                average_fitness(&next)
            );

            self.problem.on_generation(generation, &best, &next);

            if let Some(ref callback) = progress_callback {
                callback(
                    ProgressInfo::new()
                        .with_generation(generation, self.config.max_generations)
                        .with_fitness(best_fitness, average_fitness(&next))
                        .with_elapsed(start.elapsed().as_millis() as u64),
                );
            }

            population = next;

            if let Some(limit) = self.config.stagnation_limit {
                if stagnation_count >= limit && generation >= self.config.min_generations {
                    log::debug!("stopping after {} stagnant generations", stagnation_count);
                    break;
                }
            }
        }

        if let Some(ref callback) = progress_callback {
            callback(
                ProgressInfo::new()
                    .with_generation(generation, self.config.max_generations)
                    .with_fitness(best_fitness, average_fitness(&population))
                    .with_elapsed(start.elapsed().as_millis() as u64)
                    .finished(),
            );
        }

        Ok(GaResult {
            best,
            population,
            generations: generation,
            elapsed: start.elapsed(),
            cancelled,
            history,
            metrics,
        })
    }

    /// Samples `tournament_size` distinct members and returns the index of the fittest.
    fn tournament_select<R: Rng>(&self, population: &[P::Individual], rng: &mut R) -> usize {
        let amount = self.config.tournament_size.clamp(1, population.len());
        let mut sample = index::sample(rng, population.len(), amount).into_iter();

        let mut best_idx = sample.next().unwrap_or(0);
        for idx in sample {
            if population[idx].fitness() > population[best_idx].fitness() {
                best_idx = idx;
            }
        }
        best_idx
    }
}

/// Sorts descending by fitness; incomparable values keep their order.
fn sort_by_fitness<I: Individual>(population: &mut [I]) {
    population.sort_by(|a, b| {
        b.fitness()
            .partial_cmp(&a.fitness())
            .unwrap_or(CmpOrdering::Equal)
    });
}

fn average_fitness<I: Individual>(population: &[I]) -> f64 {
    population.iter().map(|ind| ind.fitness().into()).sum::<f64>() / population.len().max(1) as f64
}

fn generation_row<I: Individual>(generation: u32, sorted: &[I]) -> GenerationMetrics {
    let best = sorted.first().map(|ind| ind.fitness().into()).unwrap_or(f64::NEG_INFINITY);
    GenerationMetrics::from_population(generation, best, sorted.iter().filter_map(|i| i.metrics()))
}
