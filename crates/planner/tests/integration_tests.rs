//! Integration tests for siteplan.

use rand::prelude::*;
use rand::rngs::StdRng;
use siteplan::{
    find_path, Arrangement, Builder, Cell, Entity, EntityId, EntitySpec, FitnessConfig, FitnessKind,
    GridModel, LayoutOperators, Operation, Optimizer, OptimizerConfig, SiteConfig, StructureKind,
    UtilityKind, ZoneKind,
};
use siteplan_core::{AlgorithmKind, Config, Error};
use std::collections::{BTreeSet, VecDeque};

/// 12x10 site with an interior wall, a loading dock, a hot zone and utilities.
fn mixed_site() -> SiteConfig {
    let mut site = SiteConfig::new(12, 10)
        .with_structure(Cell::new(12, 5), StructureKind::Loading)
        .with_structure(Cell::new(12, 6), StructureKind::Loading)
        .with_utility(Cell::new(1, 10), UtilityKind::Gas)
        .with_utility(Cell::new(12, 1), UtilityKind::Electric);
    for y in 3..=7 {
        site = site.with_structure(Cell::new(6, y), StructureKind::Wall);
    }
    for x in 1..=4 {
        for y in 7..=10 {
            site = site.with_zone(Cell::new(x, y), ZoneKind::HighTemp);
        }
    }
    site.with_entity(EntitySpec::new("storage", "rack").with_quantity(4))
        .with_entity(
            EntitySpec::new("production", "oven")
                .with_quantity(2)
                .with_zone(ZoneKind::HighTemp)
                .with_dependencies([UtilityKind::Gas]),
        )
        .with_entity(EntitySpec::new("production", "packer").with_footprint(2, 1))
        .with_operation(0, 6, 4)
        .with_operation(4, 6, 2)
        .with_operation(6, 7, 3)
}

fn randomized(site: &SiteConfig, seed: u64) -> Arrangement {
    let mut layout = site.build().unwrap();
    let outcome = Builder::default().randomize(&mut layout, &mut StdRng::seed_from_u64(seed));
    assert!(outcome.is_placed(), "seed {seed} failed: {outcome:?}");
    layout
}

/// Every non-wall cell is held by at most one entity, and auto entities cover
/// exactly their rectangle.
fn assert_well_formed(layout: &Arrangement) {
    let mut seen = BTreeSet::new();
    for entity in layout.entities() {
        for &cell in &entity.positions {
            assert!(seen.insert(cell), "cell {cell} held twice");
            assert!(!layout.grid().is_wall(cell));
        }
        if entity.is_auto() {
            if let Some(base) = entity.base() {
                let expected: Vec<Cell> = base.footprint(entity.width, entity.length).collect();
                assert_eq!(entity.positions, expected);
            }
        }
    }
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_open_ten_by_ten_randomizes() {
        let site = SiteConfig::new(10, 10)
            .with_entity(EntitySpec::new("storage", "rack").with_quantity(2))
            .with_entity(EntitySpec::new("shipping", "dock").with_quantity(2))
            .with_operation(0, 3, 5)
            .with_operation(1, 2, 3);
        let builder = Builder::default();

        for seed in 0..5 {
            let mut layout = site.build().unwrap();
            let outcome = builder.randomize(&mut layout, &mut StdRng::seed_from_u64(seed));
            assert!(outcome.is_placed());
            assert!(outcome.attempts() <= 100);
            assert!(builder.has_valid_paths(&layout));
            assert!(layout.is_fully_placed());
            assert_well_formed(&layout);
        }
    }

    #[test]
    fn test_enclosed_cell_fails_access_point_rule() {
        let mut grid = GridModel::new(3, 3).unwrap();
        grid.add_zone(Cell::new(2, 2), ZoneKind::LowTemp).unwrap();
        grid.add_utility(Cell::new(1, 1), UtilityKind::Water).unwrap();

        let mut entities: Vec<Entity> = [(2, 1), (1, 2), (3, 2), (2, 3)]
            .into_iter()
            .enumerate()
            .map(|(i, (x, y))| {
                Entity::new(EntityId(i), "s", "rack")
                    .with_placement(siteplan::PlacementMode::Manual)
                    .with_positions(vec![Cell::new(x, y)])
            })
            .collect();
        entities.push(
            Entity::new(EntityId(4), "m", "chiller")
                .with_zone(ZoneKind::LowTemp)
                .with_dependencies([UtilityKind::Water]),
        );
        let layout = Arrangement::new(grid, entities, Vec::new(), 1).unwrap();

        let builder = Builder::default();
        let chiller = layout.entity(EntityId(4)).unwrap();
        assert!(!builder.is_valid(&layout, Cell::new(2, 2), chiller));
        assert!(builder.valid_positions(&layout, EntityId(4)).is_empty());
    }

    #[test]
    fn test_unknown_entity_rejected_before_placement() {
        // The manual entity sits on a wall; the operation error must win.
        let site = SiteConfig::new(6, 6)
            .with_structure(Cell::new(3, 3), StructureKind::Wall)
            .with_entity(EntitySpec::new("storage", "rack").with_quantity(3))
            .with_entity(EntitySpec::new("shipping", "dock").manual_at([Cell::new(3, 3)]))
            .with_operation(0, 999, 1);

        match site.build() {
            Err(Error::UnknownEntity { operation, entity }) => {
                assert_eq!(operation, 0);
                assert_eq!(entity, 999);
            }
            other => panic!("expected UnknownEntity, got {other:?}"),
        }
    }

    #[test]
    fn test_structural_regions_become_entities() {
        let layout = mixed_site().build().unwrap();
        // 4 racks, 2 ovens, 1 packer, then the loading dock region.
        assert_eq!(layout.entities().len(), 8);
        let dock = layout.entity(EntityId(7)).unwrap();
        assert_eq!(dock.category, siteplan::STRUCTURE_CATEGORY);
        assert_eq!(dock.kind, "loading");
        assert!(!dock.is_auto());
        assert_eq!(dock.positions, vec![Cell::new(12, 5), Cell::new(12, 6)]);
    }

    #[test]
    fn test_site_json_with_legacy_spellings() {
        let site = SiteConfig::from_json(
            r#"{
                "warehouse_width": 8, "warehouse_length": 6,
                "structure": {"8,3": "ex"},
                "zones": {"1,1": "highTemp"},
                "utilities": {"2,2": "gas"},
                "entities": [
                    {"category": "m", "type": "oven", "placement": "auto", "quantity": 1,
                     "width": 1, "length": 1, "depends_on": ["gas"], "within_zone": "highTemp"},
                    {"category": "s", "type": "rack", "quantity": 2, "depends_on": ["none"]}
                ],
                "operations": [{"source": 0, "destination": 2, "frequency": 2}]
            }"#,
        )
        .unwrap();

        let layout = site.build().unwrap();
        assert_eq!(layout.entities().len(), 4);
        assert_eq!(layout.entity(EntityId(3)).unwrap().kind, "exit");
        assert_eq!(layout.operations()[0].frequency, 2);

        // The oven can only go to the single hot cell.
        let spots = Builder::default().valid_positions(&layout, EntityId(0));
        assert_eq!(spots, vec![Cell::new(1, 1)]);
    }
}

mod pathfinding_tests {
    use super::*;

    fn bfs_distance(grid: &GridModel, start: Cell, goal: Cell) -> Option<usize> {
        if !grid.is_traversable(start) || !grid.is_traversable(goal) {
            return None;
        }
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([(start, 1usize)]);
        while let Some((cell, len)) = queue.pop_front() {
            if cell == goal {
                return Some(len);
            }
            for next in cell.neighbors4() {
                if grid.is_traversable(next) && seen.insert(next) {
                    queue.push_back((next, len + 1));
                }
            }
        }
        None
    }

    #[test]
    fn test_matches_bfs_oracle() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..40 {
            let (w, l) = (rng.gen_range(2..=8), rng.gen_range(2..=8));
            let mut grid = GridModel::new(w, l).unwrap();
            for cell in Cell::new(1, 1).footprint(w, l) {
                if rng.gen_bool(0.25) {
                    grid.add_structure(cell, StructureKind::Wall).unwrap();
                }
            }

            let cells: Vec<Cell> = grid.cells().collect();
            for _ in 0..10 {
                let a = *cells.choose(&mut rng).unwrap();
                let b = *cells.choose(&mut rng).unwrap();
                let expected = bfs_distance(&grid, a, b);
                let path = find_path(a, b, &grid, 1);

                assert_eq!(path.as_ref().map(Vec::len), expected, "{a} -> {b}");
                if let Some(path) = path {
                    assert_eq!(path.first(), Some(&a));
                    assert_eq!(path.last(), Some(&b));
                    assert!(path.len() as u32 > a.manhattan(b));
                    assert!(path.windows(2).all(|s| s[0].manhattan(s[1]) == 1));
                    assert!(path.iter().all(|&c| grid.is_traversable(c)));
                }
            }
        }
    }

    /// Moves allowed on a wide aisle: straight steps whose target sits in a
    /// clear perpendicular band of `aisle` cells, and diagonal steps that do
    /// not clip a wall corner.
    fn wide_moves(grid: &GridModel, cell: Cell, aisle: u32) -> Vec<Cell> {
        let w = aisle as i32;
        let mut moves = Vec::new();
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let target = Cell::new(cell.x + dx, cell.y + dy);
            let band_clear = (-((w - 1) / 2)..=w / 2)
                .all(|k| grid.is_traversable(Cell::new(target.x + dy * k, target.y + dx * k)));
            if band_clear {
                moves.push(target);
            }
        }
        for (dx, dy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
            let target = Cell::new(cell.x + dx, cell.y + dy);
            if grid.is_traversable(target)
                && grid.is_traversable(Cell::new(cell.x + dx, cell.y))
                && grid.is_traversable(Cell::new(cell.x, cell.y + dy))
            {
                moves.push(target);
            }
        }
        moves
    }

    fn wide_bfs_distance(grid: &GridModel, start: Cell, goal: Cell, aisle: u32) -> Option<usize> {
        if !grid.is_traversable(start) || !grid.is_traversable(goal) {
            return None;
        }
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([(start, 1usize)]);
        while let Some((cell, len)) = queue.pop_front() {
            if cell == goal {
                return Some(len);
            }
            for next in wide_moves(grid, cell, aisle) {
                if seen.insert(next) {
                    queue.push_back((next, len + 1));
                }
            }
        }
        None
    }

    #[test]
    fn test_wide_aisles_match_bfs_oracle() {
        let mut rng = StdRng::seed_from_u64(77);
        for aisle in [2u32, 3] {
            for _ in 0..60 {
                let (w, l) = (rng.gen_range(3..=10), rng.gen_range(3..=10));
                let mut grid = GridModel::new(w, l).unwrap();
                for cell in Cell::new(1, 1).footprint(w, l) {
                    if rng.gen_bool(0.2) {
                        grid.add_structure(cell, StructureKind::Wall).unwrap();
                    }
                }

                let cells: Vec<Cell> = grid.cells().collect();
                for _ in 0..10 {
                    let a = *cells.choose(&mut rng).unwrap();
                    let b = *cells.choose(&mut rng).unwrap();
                    let expected = wide_bfs_distance(&grid, a, b, aisle);
                    let path = find_path(a, b, &grid, aisle);

                    assert_eq!(path.as_ref().map(Vec::len), expected, "aisle {aisle}: {a} -> {b}");
                    if let Some(path) = path {
                        assert_eq!(path.first(), Some(&a));
                        assert_eq!(path.last(), Some(&b));
                        assert!(path
                            .windows(2)
                            .all(|s| wide_moves(&grid, s[0], aisle).contains(&s[1])));
                    }
                }
            }
        }
    }

    #[test]
    fn test_entities_do_not_block_routes() {
        let layout = randomized(&mixed_site(), 11);
        let grid = layout.grid();
        let occupied: Vec<Cell> = layout.entities().iter().flat_map(|e| e.positions.clone()).collect();
        let crossing = occupied.iter().find(|&&c| grid.is_traversable(c)).copied();
        if let Some(cell) = crossing {
            assert!(find_path(Cell::new(1, 1), cell, grid, 1).is_some());
        }
    }
}

mod fitness_tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_evaluation_is_idempotent() {
        let layout = randomized(&mixed_site(), 3);
        for kind in [FitnessKind::Standard, FitnessKind::Static] {
            let config = FitnessConfig::new(kind);
            let first = config.evaluate(&layout);
            let second = config.evaluate(&layout);
            assert_eq!(first, second);
            assert!(first.is_feasible());
        }
    }

    #[test]
    fn test_standard_metrics_are_normalized() {
        let layout = randomized(&mixed_site(), 21);
        let report = FitnessConfig::default().evaluate(&layout);
        for (name, value) in &report.metrics {
            if name != siteplan::fitness::TOTAL_FITNESS {
                assert!((0.0..=1.0).contains(value), "{name} = {value}");
            }
        }
        assert_relative_eq!(report.metric(siteplan::fitness::TOTAL_FITNESS).unwrap(), report.score);
    }

    #[test]
    fn test_unplaced_endpoint_gets_sentinel() {
        let layout = mixed_site().build().unwrap();
        let report = FitnessConfig::default().evaluate(&layout);
        assert_relative_eq!(report.score, siteplan::SENTINEL_SCORE);
        assert!(!report.is_feasible());
    }
}

mod operator_tests {
    use super::*;

    #[test]
    fn test_children_stay_routable_across_seeds() {
        let site = mixed_site();
        let ops = LayoutOperators::default();
        let builder = Builder::default();
        let mut rng = StdRng::seed_from_u64(99);

        for seed in 0..8 {
            let a = randomized(&site, seed);
            let b = randomized(&site, seed + 50);
            assert!(builder.has_valid_paths(&a) && builder.has_valid_paths(&b));

            let mut child = ops.crossover(&a, &b, &mut rng);
            assert!(builder.has_valid_paths(&child), "crossover broke seed {seed}");
            assert_well_formed(&child);

            ops.mutate(&mut child, &mut rng);
            assert!(builder.has_valid_paths(&child), "mutation broke seed {seed}");
            assert_well_formed(&child);
        }
    }

    #[test]
    fn test_manual_entities_never_move() {
        let site = mixed_site();
        let ops = LayoutOperators::default();
        let mut rng = StdRng::seed_from_u64(7);
        let a = randomized(&site, 1);
        let b = randomized(&site, 2);

        let mut child = ops.crossover(&a, &b, &mut rng);
        ops.mutate(&mut child, &mut rng);
        assert_eq!(child.positions(EntityId(7)), a.positions(EntityId(7)));
    }

    #[test]
    fn test_zone_constraint_survives_operators() {
        let site = mixed_site();
        let ops = LayoutOperators::default();
        let mut rng = StdRng::seed_from_u64(31);
        let mut layout = randomized(&site, 4);
        for _ in 0..5 {
            let other = randomized(&site, rng.gen());
            layout = ops.crossover(&layout, &other, &mut rng);
            ops.mutate(&mut layout, &mut rng);
        }
        for id in [EntityId(4), EntityId(5)] {
            for &cell in layout.positions(id) {
                assert!(layout.grid().in_zone(cell, ZoneKind::HighTemp));
            }
        }
    }
}

mod snapshot_tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_everything() {
        let layout = randomized(&mixed_site(), 8);
        let json = layout.to_json().unwrap();
        let back = Arrangement::from_json(&json).unwrap();
        assert_eq!(back, layout);
        assert_eq!(back.to_snapshot(), layout.to_snapshot());
    }

    #[test]
    fn test_malformed_snapshot_is_a_parse_error() {
        assert!(matches!(
            Arrangement::from_json(r#"{"width": 4}"#),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(
            Arrangement::from_json(r#"{"width": 4, "length": 4, "entities": [], "structure": {"x,1": "wall"}}"#),
            Err(Error::ParseError(_))
        ));
    }
}

mod optimizer_tests {
    use super::*;

    fn config(algorithm: AlgorithmKind, seed: u64) -> OptimizerConfig {
        OptimizerConfig::new().with_search(
            Config::new()
                .with_algorithm(algorithm)
                .with_population_size(8)
                .with_max_generations(4)
                .with_top_n(3)
                .with_seed(seed),
        )
    }

    #[test]
    fn test_returns_top_n_valid_layouts() {
        let base = mixed_site().build().unwrap();
        let result = Optimizer::new(config(AlgorithmKind::GeneticAlgorithm, 5))
            .optimize(&base)
            .unwrap();

        assert_eq!(result.layouts.len(), 3);
        assert!(result.layouts.windows(2).all(|w| w[0].score >= w[1].score));
        for ranked in &result.layouts {
            assert!(Builder::default().has_valid_paths(&ranked.item));
            assert_well_formed(&ranked.item);
        }
        assert!(result.fitness_history.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_seeded_search_is_reproducible() {
        let base = mixed_site().build().unwrap();
        let a = Optimizer::new(config(AlgorithmKind::GeneticAlgorithm, 13)).optimize(&base).unwrap();
        let b = Optimizer::new(config(AlgorithmKind::GeneticAlgorithm, 13)).optimize(&base).unwrap();
        assert_eq!(a.fitness_history, b.fitness_history);
        assert_eq!(a.metrics, b.metrics);
        for (x, y) in a.layouts.iter().zip(&b.layouts) {
            assert_eq!(x.item, y.item);
        }
    }

    #[test]
    fn test_metrics_table_covers_every_generation() {
        let base = mixed_site().build().unwrap();
        let result = Optimizer::new(config(AlgorithmKind::RandomSearch, 1))
            .optimize(&base)
            .unwrap();

        assert_eq!(result.metrics.len(), result.generations as usize + 1);
        let csv = result.metrics.to_csv();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("generation,best_fitness"));
        assert!(header.contains("travel_distance_min,travel_distance_avg,travel_distance_max"));
        assert_eq!(csv.lines().count(), result.metrics.len() + 1);
    }

    #[test]
    fn test_static_fitness_search() {
        let base = mixed_site().build().unwrap();
        let config = config(AlgorithmKind::GeneticAlgorithm, 2).with_fitness(FitnessKind::Static);
        let result = Optimizer::new(config).optimize(&base).unwrap();
        let best = result.best().unwrap();
        assert!(best.metrics.contains_key(siteplan::fitness::AISLE_CONNECTIVITY));
    }
}
