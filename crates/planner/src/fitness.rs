//! Arrangement scoring.
//!
//! Two evaluators are available through [`FitnessKind`]:
//!
//! - **Standard** routes every operation with the pathfinder and combines five
//!   metrics: travel distance, congestion risk and turns (lower raw value is
//!   better, so they enter the score inverted), plus type clustering and
//!   utility access (higher is better).
//! - **Static** skips routing and scores aisle connectivity, straight-line
//!   clustering and straight-line operation travel. It is much cheaper and
//!   useful for coarse screening.
//!
//! Any operation that cannot be routed yields the sentinel score `-1`, so
//! infeasible arrangements rank last instead of aborting the search.

use crate::arrangement::Arrangement;
use crate::cell::Cell;
use crate::pathfinding::{count_turns, find_route};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use siteplan_core::MetricSet;
use std::collections::BTreeMap;

pub const TRAVEL_DISTANCE: &str = "travel_distance";
pub const CONGESTION_RISK: &str = "congestion_risk";
pub const TURNS: &str = "turns";
pub const CLUSTERING: &str = "clustering";
pub const UTILITY_ACCESS: &str = "utility_access";
pub const AISLE_CONNECTIVITY: &str = "aisle_connectivity";
pub const TOTAL_FITNESS: &str = "total_fitness";

/// Score given to arrangements with an unroutable operation.
pub const SENTINEL_SCORE: f64 = -1.0;

/// Which evaluator scores arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitnessKind {
    #[default]
    Standard,
    Static,
}

/// Per-metric weights for the standard evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    pub travel_distance: f64,
    pub congestion_risk: f64,
    pub turns: f64,
    pub clustering: f64,
    pub utility_access: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            travel_distance: 1.0,
            congestion_risk: 1.0,
            turns: 1.0,
            clustering: 1.0,
            utility_access: 1.0,
        }
    }
}

/// Evaluator selection plus weights.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    pub kind: FitnessKind,
    pub weights: FitnessWeights,
}

impl FitnessConfig {
    pub fn new(kind: FitnessKind) -> Self {
        Self {
            kind,
            weights: FitnessWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Scores an arrangement with the configured evaluator.
    pub fn evaluate(&self, layout: &Arrangement) -> FitnessReport {
        match self.kind {
            FitnessKind::Standard => evaluate_standard(layout, &self.weights),
            FitnessKind::Static => evaluate_static(layout),
        }
    }
}

/// Scalar score plus the itemized metrics behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessReport {
    pub score: f64,
    /// False when some operation could not be routed.
    pub feasible: bool,
    pub metrics: MetricSet,
}

impl FitnessReport {
    fn new(score: f64, items: &[(&str, f64)]) -> Self {
        let mut metrics: MetricSet = items.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        metrics.insert(TOTAL_FITNESS.to_string(), score);
        Self {
            score,
            feasible: true,
            metrics,
        }
    }

    /// Report for an arrangement with an unroutable operation.
    pub fn sentinel(kind: FitnessKind) -> Self {
        let mut report = match kind {
            FitnessKind::Standard => Self::new(
                SENTINEL_SCORE,
                &[
                    (TRAVEL_DISTANCE, 1.0),
                    (CONGESTION_RISK, 1.0),
                    (TURNS, 1.0),
                    (CLUSTERING, 0.0),
                    (UTILITY_ACCESS, 0.0),
                ],
            ),
            FitnessKind::Static => Self::new(
                SENTINEL_SCORE,
                &[(AISLE_CONNECTIVITY, 0.0), (CLUSTERING, 0.0), (TRAVEL_DISTANCE, 0.0)],
            ),
        };
        report.feasible = false;
        report
    }

    pub fn is_feasible(&self) -> bool {
        self.feasible
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// A routed operation.
struct Route {
    path: Vec<Cell>,
    frequency: u32,
}

/// Path-based evaluation.
pub fn evaluate_standard(layout: &Arrangement, weights: &FitnessWeights) -> FitnessReport {
    let grid = layout.grid();
    let aisle = layout.aisle_width();

    let routes: Option<Vec<Route>> = layout
        .operations()
        .par_iter()
        .map(|op| {
            let (from, to) = layout.endpoints(op);
            find_route(from, to, grid, aisle).map(|path| Route {
                path,
                frequency: op.frequency,
            })
        })
        .collect();

    let Some(routes) = routes else {
        return FitnessReport::sentinel(FitnessKind::Standard);
    };

    let travel = travel_distance(&routes);
    let congestion = congestion_risk(layout, &routes);
    let turns = turn_ratio(&routes);
    let clustering = type_clustering(layout);
    let utility = utility_access(layout);

    let score = weights.travel_distance * (1.0 - travel)
        + weights.congestion_risk * (1.0 - congestion)
        + weights.turns * (1.0 - turns)
        + weights.clustering * clustering
        + weights.utility_access * utility;

    FitnessReport::new(
        score,
        &[
            (TRAVEL_DISTANCE, travel),
            (CONGESTION_RISK, congestion),
            (TURNS, turns),
            (CLUSTERING, clustering),
            (UTILITY_ACCESS, utility),
        ],
    )
}

/// Weighted mean path length over the longest path.
fn travel_distance(routes: &[Route]) -> f64 {
    let max = routes.iter().map(|r| r.path.len()).max().unwrap_or(0);
    if max == 0 {
        return 0.0;
    }
    weighted_mean(routes.iter().map(|r| (r.path.len() as f64, r.frequency))) / max as f64
}

/// Mean per-cell usage over the busiest cell, usage weighted by frequency.
fn congestion_risk(layout: &Arrangement, routes: &[Route]) -> f64 {
    let grid = layout.grid();
    let mut usage = vec![0u64; grid.frame_len()];
    for route in routes {
        for &cell in &route.path {
            if let Some(i) = grid.index(cell) {
                usage[i] += route.frequency as u64;
            }
        }
    }

    let used: Vec<u64> = usage.into_iter().filter(|&u| u > 0).collect();
    let max = used.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return 0.0;
    }
    let mean = used.iter().sum::<u64>() as f64 / used.len() as f64;
    mean / max as f64
}

/// Weighted mean direction changes over the most winding route.
fn turn_ratio(routes: &[Route]) -> f64 {
    let turns: Vec<(f64, u32)> = routes
        .iter()
        .map(|r| (count_turns(&r.path) as f64, r.frequency))
        .collect();
    let max = turns.iter().map(|(t, _)| *t).fold(0.0, f64::max);
    if max == 0.0 {
        return 0.0;
    }
    weighted_mean(turns) / max
}

/// Mean of `1 / (d + 1)` over every same-type anchor pair, pooled across
/// types, so a type with more pairs carries more weight.
fn type_clustering(layout: &Arrangement) -> f64 {
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for anchors in anchors_by_type(layout).values() {
        for (i, a) in anchors.iter().enumerate() {
            for b in &anchors[i + 1..] {
                sum += 1.0 / (a.manhattan(*b) as f64 + 1.0);
                pairs += 1;
            }
        }
    }

    if pairs == 0 {
        0.0
    } else {
        sum / pairs as f64
    }
}

/// For entities with dependencies: mean over required utilities of
/// `1 / (d + 1)`, `d` the distance from the nearest footprint cell to the
/// nearest supply point; then the mean across those entities.
fn utility_access(layout: &Arrangement) -> f64 {
    let grid = layout.grid();
    let dependent: Vec<f64> = layout
        .entities()
        .iter()
        .filter(|e| !e.depends_on.is_empty())
        .map(|entity| {
            let total: f64 = entity
                .depends_on
                .iter()
                .filter_map(|&utility| {
                    entity
                        .positions
                        .iter()
                        .flat_map(|&cell| grid.utility_cells(utility).map(move |s| cell.manhattan(s)))
                        .min()
                })
                .map(|d| 1.0 / (d as f64 + 1.0))
                .sum();
            total / entity.depends_on.len() as f64
        })
        .collect();

    if dependent.is_empty() {
        0.0
    } else {
        dependent.iter().sum::<f64>() / dependent.len() as f64
    }
}

/// Path-free evaluation.
pub fn evaluate_static(layout: &Arrangement) -> FitnessReport {
    const AISLE_WEIGHT: f64 = 0.2;
    const CLUSTER_WEIGHT: f64 = 0.2;
    const TRAVEL_WEIGHT: f64 = 0.15;

    let Some(travel) = straight_line_travel(layout) else {
        return FitnessReport::sentinel(FitnessKind::Static);
    };
    let aisle = aisle_connectivity(layout);
    let clustering = straight_line_clustering(layout);

    let score = (AISLE_WEIGHT * aisle + CLUSTER_WEIGHT * clustering + TRAVEL_WEIGHT * travel)
        / (AISLE_WEIGHT + CLUSTER_WEIGHT + TRAVEL_WEIGHT);

    FitnessReport::new(
        score,
        &[
            (AISLE_CONNECTIVITY, aisle),
            (CLUSTERING, clustering),
            (TRAVEL_DISTANCE, travel),
        ],
    )
}

/// Half the share of open cells with an open diagonal neighbor plus half the
/// share of open cells that continue both horizontally and vertically.
fn aisle_connectivity(layout: &Arrangement) -> f64 {
    let open: Vec<Cell> = layout
        .grid()
        .cells()
        .filter(|&c| layout.is_available(c))
        .collect();
    if open.is_empty() {
        return 0.0;
    }

    let is_open = |c: Cell| layout.is_available(c);
    let mut diagonal = 0usize;
    let mut crossing = 0usize;
    for &cell in &open {
        if Cell::DIAGONAL.iter().any(|&(dx, dy)| is_open(cell.offset(dx, dy))) {
            diagonal += 1;
        }
        let horizontal = is_open(cell.offset(1, 0)) || is_open(cell.offset(-1, 0));
        let vertical = is_open(cell.offset(0, 1)) || is_open(cell.offset(0, -1));
        if horizontal && vertical {
            crossing += 1;
        }
    }

    let n = open.len() as f64;
    0.5 * (diagonal as f64 / n) + 0.5 * (crossing as f64 / n)
}

fn straight_line_clustering(layout: &Arrangement) -> f64 {
    let mut distances = Vec::new();
    for anchors in anchors_by_type(layout).values() {
        for (i, a) in anchors.iter().enumerate() {
            for b in &anchors[i + 1..] {
                distances.push(a.euclidean(*b));
            }
        }
    }
    if distances.is_empty() {
        return 1.0;
    }
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    1.0 - mean / layout.grid().diagonal()
}

/// `None` when an operation has an unplaced end.
fn straight_line_travel(layout: &Arrangement) -> Option<f64> {
    let mut legs = Vec::with_capacity(layout.operations().len());
    for op in layout.operations() {
        let from = layout.entity(op.from)?.base()?;
        let to = layout.entity(op.to)?.base()?;
        legs.push((from.euclidean(to), op.frequency));
    }
    if legs.is_empty() {
        return Some(1.0);
    }
    Some(1.0 - weighted_mean(legs) / layout.grid().diagonal())
}

fn anchors_by_type(layout: &Arrangement) -> BTreeMap<&str, Vec<Cell>> {
    let mut by_type: BTreeMap<&str, Vec<Cell>> = BTreeMap::new();
    for entity in layout.entities() {
        if let Some(base) = entity.base() {
            by_type.entry(entity.kind.as_str()).or_default().push(base);
        }
    }
    by_type
}

fn weighted_mean(items: impl IntoIterator<Item = (f64, u32)>) -> f64 {
    let (sum, weight) = items
        .into_iter()
        .fold((0.0, 0.0), |(s, w), (v, f)| (s + v * f as f64, w + f as f64));
    if weight == 0.0 {
        0.0
    } else {
        sum / weight
    }
}
