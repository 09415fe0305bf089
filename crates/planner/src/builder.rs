//! Placement validation and random completion of arrangements.

use crate::arrangement::Arrangement;
use crate::cell::Cell;
use crate::entity::{Entity, EntityId};
use crate::pathfinding::find_route;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Bounded retry budget for randomized placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Full placement attempts before giving up.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 100 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

/// Result of [`Builder::randomize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// Every auto entity was placed and all operations are routable.
    Placed { attempts: u32 },
    /// The budget ran out; the arrangement was left as it was.
    Infeasible { attempts: u32 },
}

impl PlacementOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Placed { attempts } | Self::Infeasible { attempts } => attempts,
        }
    }
}

/// Placement validator.
///
/// Stateless apart from its retry policy; every query takes the arrangement
/// it is about.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Builder {
    policy: RetryPolicy,
}

impl Builder {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Cells that are neither structural nor occupied.
    pub fn available_positions(&self, layout: &Arrangement) -> BTreeSet<Cell> {
        layout
            .grid()
            .cells()
            .filter(|&c| layout.is_available(c))
            .collect()
    }

    /// Checks whether `entity` may be anchored at `base`.
    ///
    /// Cells currently held by `entity` itself count as free. Besides bounds,
    /// zone and overlap, at least one footprint cell must touch an open cell
    /// orthogonally (the access point); without one the entity could never be
    /// reached.
    pub fn is_valid(&self, layout: &Arrangement, base: Cell, entity: &Entity) -> bool {
        let grid = layout.grid();
        let free = |cell: Cell| {
            grid.in_bounds(cell)
                && !grid.is_structural(cell)
                && layout.occupant(cell).map_or(true, |o| o == entity.id)
        };

        for cell in entity.footprint_at(base) {
            if !free(cell) {
                return false;
            }
            if let Some(zone) = entity.within_zone {
                if !grid.in_zone(cell, zone) {
                    return false;
                }
            }
        }

        let inside = |c: Cell| {
            c.x >= base.x
                && c.y >= base.y
                && c.x < base.x + entity.width as i32
                && c.y < base.y + entity.length as i32
        };
        entity
            .footprint_at(base)
            .flat_map(Cell::neighbors4)
            .any(|n| !inside(n) && free(n))
    }

    /// Every base cell at which the entity could be placed right now.
    pub fn valid_positions(&self, layout: &Arrangement, id: EntityId) -> Vec<Cell> {
        let Some(entity) = layout.entity(id) else {
            return Vec::new();
        };
        layout
            .grid()
            .cells()
            .filter(|&c| layout.occupant(c).map_or(true, |o| o == id))
            .filter(|&c| self.is_valid(layout, c, entity))
            .collect()
    }

    /// Returns true if every operation has at least one routable cell pair.
    ///
    /// An operation with an unplaced end is not satisfiable.
    pub fn has_valid_paths(&self, layout: &Arrangement) -> bool {
        let grid = layout.grid();
        layout.operations().iter().all(|op| {
            let (from, to) = layout.endpoints(op);
            !from.is_empty()
                && !to.is_empty()
                && find_route(from, to, grid, layout.aisle_width()).is_some()
        })
    }

    /// Places every auto entity at random valid cells.
    ///
    /// Each attempt clears all auto entities, places them in random order at
    /// uniformly drawn valid cells, and succeeds only if all operations are
    /// routable. When the budget runs out the previous positions are restored.
    pub fn randomize<R: Rng + ?Sized>(&self, layout: &mut Arrangement, rng: &mut R) -> PlacementOutcome {
        let auto = layout.auto_entity_ids();
        let saved = layout.save_positions(&auto);
        let budget = self.policy.max_attempts.max(1);

        for attempt in 1..=budget {
            for &id in &auto {
                layout.clear(id);
            }

            let mut order = auto.clone();
            order.shuffle(rng);

            let complete = order.iter().all(|&id| {
                let candidates = self.valid_positions(layout, id);
                match candidates.choose(rng) {
                    Some(&base) => {
                        layout.place(id, base);
                        true
                    }
                    None => false,
                }
            });

            if complete && self.has_valid_paths(layout) {
                log::trace!("randomized {} entities in {} attempts", auto.len(), attempt);
                return PlacementOutcome::Placed { attempts: attempt };
            }
        }

        layout.restore_positions(saved);
        PlacementOutcome::Infeasible { attempts: budget }
    }

    /// Moves several auto entities at once.
    ///
    /// All movers are lifted first, then placed in order, each validated
    /// against the ones already set down. If any move is invalid the whole
    /// group is put back and `false` is returned. Routability is not checked.
    pub fn relocate_group(&self, layout: &mut Arrangement, moves: &[(EntityId, Cell)]) -> bool {
        if moves
            .iter()
            .any(|(id, _)| layout.entity(*id).map_or(true, |e| !e.is_auto()))
        {
            return false;
        }

        let ids: Vec<EntityId> = moves.iter().map(|(id, _)| *id).collect();
        let saved = layout.save_positions(&ids);
        for &id in &ids {
            layout.clear(id);
        }

        for &(id, base) in moves {
            let valid = layout
                .entity(id)
                .is_some_and(|entity| self.is_valid(layout, base, entity));
            if !valid {
                layout.restore_positions(saved);
                return false;
            }
            layout.place(id, base);
        }
        true
    }
}
