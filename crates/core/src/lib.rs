//! # Siteplan Core
//!
//! Domain-neutral search machinery for the siteplan facility layout optimizer.
//!
//! ## Core Components
//!
//! - **Solver trait**: [`Solver`] - Common interface for layout searches
//! - **GA framework**: [`GaRunner`], [`GaProblem`], [`Individual`] - Genetic algorithm infrastructure
//! - **Metrics**: [`MetricSet`], [`MetricsTable`] - Per-generation metric distributions
//! - **Results**: [`SolveResult`], [`Ranked`]
//!
//! ## Configuration
//!
//! Use [`Config`] to configure solver behavior:
//!
//! ```rust
//! use siteplan_core::{AlgorithmKind, Config};
//!
//! let config = Config::new()
//!     .with_algorithm(AlgorithmKind::GeneticAlgorithm)
//!     .with_population_size(30)
//!     .with_max_generations(40)
//!     .with_seed(42);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod error;
pub mod ga;
pub mod metrics;
pub mod result;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{GaConfig, GaProblem, GaResult, GaRunner, Individual};
pub use metrics::{GenerationMetrics, MetricSet, MetricStats, MetricsTable};
pub use result::{Ranked, SolveResult, SolveSummary};
pub use solver::{AlgorithmKind, Config, ProgressCallback, ProgressInfo, Solver};
