//! # Siteplan
//!
//! Facility layout optimization on a cell grid.
//!
//! A site is a rectangular grid enclosed by a perimeter wall, with structural
//! cells, environmental zones and utility supply points. Entities (machines,
//! racks, docks) are placed on it so that every required operation between two
//! entities stays routable, and an evolutionary search looks for placements
//! with short, straight, uncongested routes, tight same-type clusters and
//! nearby utilities.
//!
//! ## Features
//!
//! - A* routing with a 4-neighborhood, or an 8-neighborhood with clearance
//!   checks for wide aisles
//! - Placement validation with zone constraints and the access-point rule
//! - Cluster-aware crossover and mutation that never emit an unroutable layout
//! - Standard (path based) and static (geometric) fitness evaluators
//! - Genetic algorithm and random-search baseline
//! - Lossless JSON snapshots and a per-generation metrics table
//!
//! ## Quick Start
//!
//! ```rust
//! use siteplan::{EntitySpec, Optimizer, OptimizerConfig, SiteConfig};
//! use siteplan_core::Config;
//!
//! let site = SiteConfig::new(10, 10)
//!     .with_entity(EntitySpec::new("storage", "rack").with_quantity(3))
//!     .with_entity(EntitySpec::new("shipping", "dock"))
//!     .with_operation(0, 3, 5)
//!     .with_operation(1, 3, 2);
//! let base = site.build().unwrap();
//!
//! let config = OptimizerConfig::new().with_search(
//!     Config::new().with_population_size(8).with_max_generations(5).with_seed(7),
//! );
//! let result = Optimizer::new(config).optimize(&base).unwrap();
//!
//! let best = result.best().unwrap();
//! println!("best fitness {:.3}", best.score);
//! println!("{}", best.item.to_json().unwrap());
//! ```

pub mod arrangement;
pub mod builder;
pub mod cell;
pub mod cluster;
pub mod config;
pub mod entity;
pub mod fitness;
pub mod ga_layout;
pub mod grid;
pub mod kind;
pub mod operators;
pub mod optimizer;
pub mod pathfinding;
pub mod site;
pub mod snapshot;

// Re-exports
pub use arrangement::Arrangement;
pub use builder::{Builder, PlacementOutcome, RetryPolicy};
pub use cell::Cell;
pub use cluster::{find_clusters, group_touching_clusters, Cluster, DEFAULT_CLUSTER_DISTANCE};
pub use config::{OperatorConfig, OptimizerConfig};
pub use entity::{Entity, EntityId, Operation, PlacementMode};
pub use fitness::{FitnessConfig, FitnessKind, FitnessReport, FitnessWeights, SENTINEL_SCORE};
pub use ga_layout::{LayoutIndividual, LayoutProblem};
pub use grid::GridModel;
pub use kind::{StructureKind, UtilityKind, ZoneKind};
pub use operators::LayoutOperators;
pub use optimizer::{OptimizeResult, Optimizer};
pub use pathfinding::{count_turns, find_path, find_route};
pub use site::{EntitySpec, OperationSpec, SiteConfig, STRUCTURE_CATEGORY};
pub use snapshot::Snapshot;
