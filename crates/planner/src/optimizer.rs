//! Search front end.
//!
//! [`Optimizer`] resolves the configured [`AlgorithmKind`] once per call and
//! returns the best arrangements found together with the per-generation
//! metric table.

use crate::arrangement::Arrangement;
use crate::builder::Builder;
use crate::config::OptimizerConfig;
use crate::fitness::FitnessReport;
use crate::ga_layout::{LayoutIndividual, LayoutProblem};
use crate::operators::LayoutOperators;
use rand::prelude::*;
use rand::rngs::StdRng;
use siteplan_core::ga::{GaConfig, GaProblem, GaRunner, Individual};
use siteplan_core::{
    AlgorithmKind, Error, GenerationMetrics, MetricsTable, ProgressCallback, ProgressInfo, Result,
    SolveResult, Solver,
};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of an optimization run: ranked arrangements, best first.
pub type OptimizeResult = SolveResult<Arrangement>;

/// Layout optimizer.
pub struct Optimizer {
    config: OptimizerConfig,
    cancelled: Arc<AtomicBool>,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Scores one arrangement with the configured evaluator.
    pub fn score(&self, layout: &Arrangement) -> FitnessReport {
        self.config.fitness.evaluate(layout)
    }

    /// Searches for the best placements of the auto entities of `base`.
    pub fn optimize(&self, base: &Arrangement) -> Result<OptimizeResult> {
        self.run(base, None::<fn(ProgressInfo)>)
    }

    /// Like [`Optimizer::optimize`], reporting after every generation.
    pub fn optimize_with_progress(&self, base: &Arrangement, callback: ProgressCallback) -> Result<OptimizeResult> {
        self.run(base, Some(callback))
    }

    /// Stops the search at the next generation boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn operators(&self) -> LayoutOperators {
        LayoutOperators::new(Builder::new(self.config.placement), self.config.operators)
    }

    fn run<F>(&self, base: &Arrangement, progress: Option<F>) -> Result<OptimizeResult>
    where
        F: Fn(ProgressInfo) + Send + Sync,
    {
        self.config.validate()?;
        self.cancelled.store(false, Ordering::Relaxed);

        let search = &self.config.search;
        let mut rng = match search.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        log::info!(
            "optimizing {} auto entities and {} operations with {} (population {}, {} generations)",
            base.auto_entity_ids().len(),
            base.operations().len(),
            search.algorithm.name(),
            search.population_size,
            search.max_generations
        );

        let result = if search.threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(search.threads)
                .build()
                .map_err(|e| Error::Internal(format!("failed to build thread pool: {e}")))?;
            pool.install(|| self.dispatch(base, &mut rng, progress))
        } else {
            self.dispatch(base, &mut rng, progress)
        }?;

        log::info!(
            "finished after {} generations in {} ms, best fitness {:.4}",
            result.generations,
            result.computation_time_ms,
            result.best_fitness().unwrap_or(f64::NEG_INFINITY)
        );
        Ok(result)
    }

    fn dispatch<F>(&self, base: &Arrangement, rng: &mut StdRng, progress: Option<F>) -> Result<OptimizeResult>
    where
        F: Fn(ProgressInfo),
    {
        match self.config.search.algorithm {
            AlgorithmKind::GeneticAlgorithm => self.genetic_algorithm(base, rng, progress),
            AlgorithmKind::RandomSearch => self.random_search(base, rng, progress),
        }
    }

    fn genetic_algorithm<F>(&self, base: &Arrangement, rng: &mut StdRng, progress: Option<F>) -> Result<OptimizeResult>
    where
        F: Fn(ProgressInfo),
    {
        let problem = LayoutProblem::new(base.clone(), self.operators(), self.config.fitness);
        let runner = GaRunner::new(GaConfig::from(&self.config.search), problem)
            .with_cancel_handle(self.cancelled.clone());
        let ga = runner.run_with_rng_and_progress(rng, progress)?;

        let mut result = SolveResult::new(AlgorithmKind::GeneticAlgorithm.name());
        result.layouts = ga
            .top(self.config.search.top_n)
            .iter()
            .map(LayoutIndividual::to_ranked)
            .collect();
        result.generations = ga.generations;
        result.computation_time_ms = ga.elapsed.as_millis() as u64;
        result.fitness_history = ga.history;
        result.metrics = ga.metrics;
        result.cancelled = ga.cancelled;
        Ok(result)
    }

    /// Baseline: every generation draws a fresh batch of randomized
    /// arrangements and the best `top_n` seen so far are kept.
    fn random_search<F>(&self, base: &Arrangement, rng: &mut StdRng, progress: Option<F>) -> Result<OptimizeResult>
    where
        F: Fn(ProgressInfo),
    {
        let start = Instant::now();
        let search = &self.config.search;
        let time_limit = (search.time_limit_ms > 0).then(|| Duration::from_millis(search.time_limit_ms));
        let problem = LayoutProblem::new(base.clone(), self.operators(), self.config.fitness);

        let sample = |rng: &mut StdRng| {
            let mut batch = problem.initialize_population(search.population_size, rng);
            problem.evaluate_parallel(&mut batch);
            sort_by_fitness(&mut batch);
            batch
        };

        let mut metrics = MetricsTable::new();
        let mut kept: Vec<LayoutIndividual> = Vec::new();

        let batch = sample(rng);
        metrics.push(batch_row(0, &batch));
        merge_best(&mut kept, batch, search.top_n);
        let mut best_fitness = leading_fitness(&kept);
        let mut history = vec![best_fitness];
        let mut stagnation = 0u32;
        let mut generation = 0u32;
        let mut cancelled = false;

        while generation < search.max_generations {
            if self.cancelled.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }
            if time_limit.is_some_and(|limit| start.elapsed() > limit) {
                break;
            }

            let batch = sample(rng);
            let batch_avg = average_fitness(&batch);
            generation += 1;
            metrics.push(batch_row(generation, &batch));
            merge_best(&mut kept, batch, search.top_n);

            let leader = leading_fitness(&kept);
            if leader > best_fitness {
                best_fitness = leader;
                stagnation = 0;
            } else {
                stagnation += 1;
            }
            history.push(best_fitness);
            log::debug!("random search batch {}: best {:.4}, batch avg {:.4}", generation, best_fitness, batch_avg);

            if let Some(ref callback) = progress {
                callback(
                    ProgressInfo::new()
                        .with_generation(generation, search.max_generations)
                        .with_fitness(best_fitness, batch_avg)
                        .with_elapsed(start.elapsed().as_millis() as u64),
                );
            }

            if let Some(limit) = search.stagnation_limit {
                if stagnation >= limit && generation >= search.min_generations {
                    break;
                }
            }
        }

        if let Some(ref callback) = progress {
            callback(
                ProgressInfo::new()
                    .with_generation(generation, search.max_generations)
                    .with_fitness(best_fitness, average_fitness(&kept))
                    .with_elapsed(start.elapsed().as_millis() as u64)
                    .finished(),
            );
        }

        let mut result = SolveResult::new(AlgorithmKind::RandomSearch.name());
        result.layouts = kept.iter().map(LayoutIndividual::to_ranked).collect();
        result.generations = generation;
        result.computation_time_ms = start.elapsed().as_millis() as u64;
        result.fitness_history = history;
        result.metrics = metrics;
        result.cancelled = cancelled;
        Ok(result)
    }
}

impl Solver for Optimizer {
    type Input = Arrangement;
    type Output = OptimizeResult;

    fn solve(&self, input: &Arrangement) -> Result<OptimizeResult> {
        self.optimize(input)
    }

    fn solve_with_progress(&self, input: &Arrangement, callback: ProgressCallback) -> Result<OptimizeResult> {
        self.optimize_with_progress(input, callback)
    }

    fn cancel(&self) {
        Optimizer::cancel(self);
    }
}

fn sort_by_fitness(members: &mut [LayoutIndividual]) {
    members.sort_by(|a, b| b.fitness().partial_cmp(&a.fitness()).unwrap_or(CmpOrdering::Equal));
}

fn merge_best(kept: &mut Vec<LayoutIndividual>, batch: Vec<LayoutIndividual>, top_n: usize) {
    kept.extend(batch);
    sort_by_fitness(kept);
    kept.truncate(top_n);
}

fn leading_fitness(members: &[LayoutIndividual]) -> f64 {
    members.first().map_or(f64::NEG_INFINITY, |m| m.fitness())
}

fn average_fitness(members: &[LayoutIndividual]) -> f64 {
    members.iter().map(|m| m.fitness()).sum::<f64>() / members.len().max(1) as f64
}

fn batch_row(generation: u32, sorted: &[LayoutIndividual]) -> GenerationMetrics {
    GenerationMetrics::from_population(
        generation,
        leading_fitness(sorted),
        sorted.iter().filter_map(|m| m.metrics()),
    )
}
