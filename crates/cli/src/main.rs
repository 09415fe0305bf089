//! Siteplan command-line runner.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use siteplan::{Arrangement, Builder, FitnessKind, Optimizer, OptimizerConfig, PlacementOutcome, SiteConfig};
use siteplan_core::{AlgorithmKind, ProgressInfo, SolveSummary};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "siteplan")]
#[command(about = "Facility layout optimizer for grid sites")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for good placements and write the best layouts
    Optimize {
        /// Site description (JSON or TOML)
        #[arg(short, long)]
        site: PathBuf,

        /// Optimizer settings (JSON or TOML); defaults apply to anything missing
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Search strategy
        #[arg(short, long, value_enum)]
        algorithm: Option<AlgorithmArg>,

        /// Fitness evaluator
        #[arg(short, long, value_enum)]
        fitness: Option<FitnessArg>,

        /// Number of generations
        #[arg(short, long)]
        generations: Option<u32>,

        /// Population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Number of layouts to keep
        #[arg(short, long)]
        top: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads (0 = all cores)
        #[arg(long)]
        threads: Option<usize>,

        /// Directory for the layout snapshots
        #[arg(short, long, default_value = "layouts")]
        output: PathBuf,

        /// Output file for the per-generation metrics CSV
        #[arg(short, long)]
        metrics: Option<PathBuf>,
    },

    /// Check a site description and try one random placement
    Validate {
        /// Site description (JSON or TOML)
        #[arg(short, long)]
        site: PathBuf,

        /// Placement attempts before reporting the site as infeasible
        #[arg(long, default_value = "100")]
        attempts: u32,

        /// Random seed for the trial placement
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Score a layout snapshot
    Score {
        /// Layout snapshot (JSON)
        snapshot: PathBuf,

        /// Fitness evaluator
        #[arg(short, long, value_enum, default_value = "standard")]
        fitness: FitnessArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmArg {
    /// Genetic algorithm
    Ga,
    /// Random-search baseline
    Random,
}

impl From<AlgorithmArg> for AlgorithmKind {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Ga => AlgorithmKind::GeneticAlgorithm,
            AlgorithmArg::Random => AlgorithmKind::RandomSearch,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FitnessArg {
    /// Route-based metrics
    Standard,
    /// Geometry-only metrics
    Static,
}

impl From<FitnessArg> for FitnessKind {
    fn from(arg: FitnessArg) -> Self {
        match arg {
            FitnessArg::Standard => FitnessKind::Standard,
            FitnessArg::Static => FitnessKind::Static,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Optimize {
            site,
            settings,
            algorithm,
            fitness,
            generations,
            population,
            top,
            seed,
            threads,
            output,
            metrics,
        } => {
            let base = load_site(&site)?;

            let mut config: OptimizerConfig = match settings {
                Some(path) => read_structured(&path)?,
                None => OptimizerConfig::default(),
            };
            if let Some(algorithm) = algorithm {
                config.search.algorithm = algorithm.into();
            }
            if let Some(fitness) = fitness {
                config.fitness.kind = fitness.into();
            }
            if let Some(generations) = generations {
                config.search.max_generations = generations;
            }
            if let Some(population) = population {
                config.search.population_size = population;
            }
            if let Some(top) = top {
                config.search.top_n = top;
            }
            if let Some(threads) = threads {
                config.search.threads = threads;
            }
            if seed.is_some() {
                config.search.seed = seed;
            }

            let optimizer = Optimizer::new(config);
            let result = optimizer
                .optimize_with_progress(&base, Box::new(report_progress))
                .context("optimization failed")?;

            fs::create_dir_all(&output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            for (rank, ranked) in result.layouts.iter().enumerate() {
                let path = output.join(format!("layout_{}.json", rank + 1));
                fs::write(&path, ranked.item.to_json()?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("#{} fitness {:.4} -> {}", rank + 1, ranked.score, path.display());
            }

            if let Some(path) = metrics {
                result
                    .metrics
                    .save_csv(&path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("metrics -> {}", path.display());
            }

            let summary = SolveSummary::from(&result);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Validate { site, attempts, seed } => {
            let mut layout = load_site(&site)?;
            let auto = layout.auto_entity_ids().len();
            println!(
                "{}x{} site: {} entities ({} auto), {} operations",
                layout.grid().width(),
                layout.grid().length(),
                layout.entities().len(),
                auto,
                layout.operations().len()
            );

            let builder = Builder::new(siteplan::RetryPolicy::new(attempts));
            match builder.randomize(&mut layout, &mut StdRng::seed_from_u64(seed)) {
                PlacementOutcome::Placed { attempts } => {
                    println!("feasible: placed every entity in {attempts} attempt(s)");
                }
                PlacementOutcome::Infeasible { attempts } => {
                    bail!("no routable placement found in {attempts} attempts");
                }
            }
        }

        Commands::Score { snapshot, fitness } => {
            let text = fs::read_to_string(&snapshot)
                .with_context(|| format!("failed to read {}", snapshot.display()))?;
            let layout = Arrangement::from_json(&text)
                .with_context(|| format!("invalid snapshot {}", snapshot.display()))?;
            let report = siteplan::FitnessConfig::new(fitness.into()).evaluate(&layout);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn report_progress(info: ProgressInfo) {
    if info.running {
        log::info!(
            "generation {}/{}: best {:.4}, avg {:.4} ({} ms)",
            info.generation,
            info.max_generations,
            info.best_fitness,
            info.avg_fitness,
            info.elapsed_ms
        );
    }
}

fn load_site(path: &Path) -> anyhow::Result<Arrangement> {
    let site: SiteConfig = read_structured(path)?;
    site.build()
        .with_context(|| format!("invalid site {}", path.display()))
}

/// Reads TOML when the extension says so, JSON otherwise.
fn read_structured<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    if is_toml {
        toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}
