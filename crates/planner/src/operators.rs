//! Cluster-aware crossover and mutation with repair.
//!
//! Every operator leaves its output in a routable state whenever its input
//! was routable: moves that break an operation are reverted, and a crossover
//! child that cannot be repaired is replaced by one of its parents.

use crate::arrangement::Arrangement;
use crate::builder::Builder;
use crate::cell::Cell;
use crate::cluster::{find_clusters, Cluster};
use crate::config::OperatorConfig;
use crate::entity::{Entity, EntityId};
use rand::prelude::*;

/// Genetic operators over arrangements.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutOperators {
    builder: Builder,
    config: OperatorConfig,
}

impl LayoutOperators {
    pub fn new(builder: Builder, config: OperatorConfig) -> Self {
        Self { builder, config }
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Recombines two parents into a routable child.
    ///
    /// Starts from a copy of `first`. Same-type clusters are exchanged with
    /// probability `cluster_swap_rate`, then single entities take a same-type
    /// position from `second` with probability `entity_swap_rate`. A child
    /// that lost routability is repaired by relocating whole clusters; if
    /// that fails, a randomly chosen parent is returned instead.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        first: &Arrangement,
        second: &Arrangement,
        rng: &mut R,
    ) -> Arrangement {
        let mut child = first.clone();
        let distance = self.config.cluster_distance;

        let donors = find_clusters(second, distance);
        let mut donated = vec![false; donors.len()];
        for cluster in find_clusters(first, distance) {
            if rng.gen::<f64>() >= self.config.cluster_swap_rate {
                continue;
            }
            let candidates: Vec<usize> = donors
                .iter()
                .enumerate()
                .filter(|(j, d)| !donated[*j] && d.kind == cluster.kind)
                .map(|(j, _)| j)
                .collect();
            let Some(&j) = candidates.choose(rng) else {
                continue;
            };
            donated[j] = true;

            let moves: Vec<(EntityId, Cell)> = cluster
                .members
                .iter()
                .zip(&donors[j].members)
                .filter_map(|(&own, &donor)| {
                    let target = first.entity(own)?;
                    let source = second.entity(donor)?;
                    same_footprint(target, source).then_some(())?;
                    Some((own, source.base()?))
                })
                .collect();
            if !moves.is_empty() {
                self.builder.relocate_group(&mut child, &moves);
            }
        }

        for id in child.auto_entity_ids() {
            if rng.gen::<f64>() >= self.config.entity_swap_rate {
                continue;
            }
            self.take_position_from(&mut child, second, id, rng);
        }

        if self.builder.has_valid_paths(&child) || self.repair(&mut child, rng) {
            return child;
        }

        log::debug!("crossover child could not be repaired; returning a parent");
        if rng.gen::<bool>() {
            first.clone()
        } else {
            second.clone()
        }
    }

    /// Relocates clusters and single entities at random, keeping only moves
    /// after which every operation is still routable. Returns the number of
    /// accepted moves.
    pub fn mutate<R: Rng + ?Sized>(&self, layout: &mut Arrangement, rng: &mut R) -> usize {
        let mut accepted = 0;

        for cluster in find_clusters(layout, self.config.cluster_distance) {
            if rng.gen::<f64>() >= self.config.cluster_mutation_rate {
                continue;
            }
            for _ in 0..self.config.move_attempts.max(1) {
                let saved = layout.save_positions(&cluster.members);
                if self.relocate_cluster(layout, &cluster, rng) && self.builder.has_valid_paths(layout) {
                    accepted += 1;
                    break;
                }
                layout.restore_positions(saved);
            }
        }

        for id in layout.auto_entity_ids() {
            if rng.gen::<f64>() >= self.config.single_mutation_rate {
                continue;
            }
            for _ in 0..self.config.move_attempts.max(1) {
                let saved = layout.save_positions(&[id]);
                if self.relocate_entity(layout, id, rng) && self.builder.has_valid_paths(layout) {
                    accepted += 1;
                    break;
                }
                layout.restore_positions(saved);
            }
        }

        log::trace!("mutation accepted {} moves", accepted);
        accepted
    }

    /// Moves a whole cluster to a random open anchor, keeping member offsets.
    /// Routability is not checked.
    pub fn relocate_cluster<R: Rng + ?Sized>(
        &self,
        layout: &mut Arrangement,
        cluster: &Cluster,
        rng: &mut R,
    ) -> bool {
        let bases: Option<Vec<Cell>> = cluster
            .members
            .iter()
            .map(|&id| layout.entity(id).and_then(Entity::base))
            .collect();
        let Some(bases) = bases else {
            return false;
        };
        let Some(&origin) = bases.first() else {
            return false;
        };

        let open: Vec<Cell> = self.builder.available_positions(layout).into_iter().collect();
        let Some(&anchor) = open.choose(rng) else {
            return false;
        };

        let moves: Vec<(EntityId, Cell)> = cluster
            .members
            .iter()
            .zip(&bases)
            .map(|(&id, base)| (id, anchor.offset(base.x - origin.x, base.y - origin.y)))
            .collect();
        self.builder.relocate_group(layout, &moves)
    }

    /// Moves one auto entity to a random valid cell other than its current one.
    /// Routability is not checked.
    pub fn relocate_entity<R: Rng + ?Sized>(
        &self,
        layout: &mut Arrangement,
        id: EntityId,
        rng: &mut R,
    ) -> bool {
        let current = layout.entity(id).and_then(Entity::base);
        let candidates: Vec<Cell> = self
            .builder
            .valid_positions(layout, id)
            .into_iter()
            .filter(|&c| Some(c) != current)
            .collect();
        match candidates.choose(rng) {
            Some(&base) => self.builder.relocate_group(layout, &[(id, base)]),
            None => false,
        }
    }

    /// Relocates clusters one at a time until the child routes again.
    fn repair<R: Rng + ?Sized>(&self, child: &mut Arrangement, rng: &mut R) -> bool {
        for cluster in find_clusters(child, self.config.cluster_distance) {
            for _ in 0..self.config.repair_attempts {
                let saved = child.save_positions(&cluster.members);
                if self.relocate_cluster(child, &cluster, rng) {
                    if self.builder.has_valid_paths(child) {
                        log::trace!("repaired crossover child by moving a {} cluster", cluster.kind);
                        return true;
                    }
                    child.restore_positions(saved);
                }
            }
        }
        false
    }

    /// Gives `id` the position a same-type entity holds in `donor`. If another
    /// same-shaped entity sits there in `layout`, the two trade places.
    fn take_position_from<R: Rng + ?Sized>(
        &self,
        layout: &mut Arrangement,
        donor: &Arrangement,
        id: EntityId,
        rng: &mut R,
    ) -> bool {
        let Some(entity) = layout.entity(id) else {
            return false;
        };
        let targets: Vec<Cell> = donor
            .entities()
            .iter()
            .filter(|e| e.is_auto() && e.kind == entity.kind && same_footprint(e, entity))
            .filter_map(Entity::base)
            .filter(|&c| Some(c) != entity.base())
            .collect();
        let Some(&target) = targets.choose(rng) else {
            return false;
        };

        let own_base = entity.base();
        let swap_partner = layout.occupant(target).filter(|&o| {
            o != id
                && layout.entity(o).is_some_and(|other| {
                    other.is_auto() && other.base() == Some(target) && same_footprint(other, entity)
                })
        });

        match (swap_partner, own_base) {
            (Some(other), Some(base)) => self.builder.relocate_group(layout, &[(id, target), (other, base)]),
            _ => self.builder.relocate_group(layout, &[(id, target)]),
        }
    }
}

fn same_footprint(a: &Entity, b: &Entity) -> bool {
    a.width == b.width && a.length == b.length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Operation;
    use crate::grid::GridModel;
    use rand::rngs::StdRng;

    fn base_layout() -> Arrangement {
        let grid = GridModel::new(8, 8).unwrap();
        let mut entities: Vec<Entity> = (0..4).map(|i| Entity::new(EntityId(i), "s", "rack")).collect();
        entities.push(Entity::new(EntityId(4), "p", "packer").with_footprint(2, 1));
        entities.push(Entity::new(EntityId(5), "p", "dock"));
        let ops = vec![
            Operation::new(0, EntityId(0), EntityId(4)).with_frequency(3),
            Operation::new(1, EntityId(4), EntityId(5)),
        ];
        Arrangement::new(grid, entities, ops, 1).unwrap()
    }

    fn randomized(seed: u64) -> Arrangement {
        let mut layout = base_layout();
        let outcome = Builder::default().randomize(&mut layout, &mut StdRng::seed_from_u64(seed));
        assert!(outcome.is_placed());
        layout
    }

    #[test]
    fn test_crossover_keeps_validity() {
        let ops = LayoutOperators::default();
        let mut rng = StdRng::seed_from_u64(17);
        for seed in 0..10 {
            let a = randomized(seed);
            let b = randomized(seed + 100);
            let child = ops.crossover(&a, &b, &mut rng);
            assert!(ops.builder().has_valid_paths(&child));
            assert!(child.is_fully_placed());
        }
    }

    #[test]
    fn test_mutation_keeps_validity() {
        let config = OperatorConfig {
            cluster_mutation_rate: 1.0,
            single_mutation_rate: 1.0,
            move_attempts: 3,
            ..OperatorConfig::default()
        };
        let ops = LayoutOperators::new(Builder::default(), config);
        let mut rng = StdRng::seed_from_u64(5);
        for seed in 0..10 {
            let mut layout = randomized(seed);
            ops.mutate(&mut layout, &mut rng);
            assert!(ops.builder().has_valid_paths(&layout));
            assert!(layout.is_fully_placed());
        }
    }

    #[test]
    fn test_relocate_cluster_preserves_offsets() {
        let grid = GridModel::new(10, 10).unwrap();
        let entities = vec![
            Entity::new(EntityId(0), "s", "rack").with_positions(vec![Cell::new(2, 2)]),
            Entity::new(EntityId(1), "s", "rack").with_positions(vec![Cell::new(3, 3)]),
        ];
        let mut layout = Arrangement::new(grid, entities, Vec::new(), 1).unwrap();
        let cluster = Cluster {
            kind: "rack".into(),
            members: vec![EntityId(0), EntityId(1)],
        };
        let ops = LayoutOperators::default();
        let mut rng = StdRng::seed_from_u64(9);

        let mut moved = false;
        for _ in 0..20 {
            if ops.relocate_cluster(&mut layout, &cluster, &mut rng) {
                moved = true;
                break;
            }
        }
        assert!(moved);
        let a = layout.entity(EntityId(0)).unwrap().base().unwrap();
        let b = layout.entity(EntityId(1)).unwrap().base().unwrap();
        assert_eq!((b.x - a.x, b.y - a.y), (1, 1));
    }

    #[test]
    fn test_identical_parents_give_valid_child() {
        let ops = LayoutOperators::default();
        let a = randomized(3);
        let child = ops.crossover(&a, &a, &mut StdRng::seed_from_u64(0));
        assert!(ops.builder().has_valid_paths(&child));
    }
}
