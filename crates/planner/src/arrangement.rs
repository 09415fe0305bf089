//! The mutable unit of the search: a grid plus placed entities and routes.

use crate::cell::Cell;
use crate::entity::{Entity, EntityId, Operation};
use crate::grid::GridModel;
use siteplan_core::{Error, Result};
use std::sync::Arc;

/// One candidate layout.
///
/// The grid is shared between clones; entities, operations and the occupancy
/// index are owned, so cloning an arrangement is a flat copy of small records
/// and no two clones ever alias a position list.
///
/// Entities are stored by id: `entities[i].id == EntityId(i)` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrangement {
    grid: Arc<GridModel>,
    entities: Vec<Entity>,
    operations: Vec<Operation>,
    aisle_width: u32,
    occupancy: Vec<Option<EntityId>>,
}

impl Arrangement {
    /// Assembles an arrangement, checking ids, operation references and any
    /// positions the entities already carry.
    pub fn new(
        grid: impl Into<Arc<GridModel>>,
        mut entities: Vec<Entity>,
        operations: Vec<Operation>,
        aisle_width: u32,
    ) -> Result<Self> {
        let grid = grid.into();
        if aisle_width == 0 {
            return Err(Error::InvalidConfig("aisle_width must be positive".into()));
        }

        entities.sort_by_key(|e| e.id);
        for (i, entity) in entities.iter().enumerate() {
            if entity.id.index() != i {
                return Err(Error::InvalidConfig(format!(
                    "entity ids must be 0..{} without gaps, found {}",
                    entities.len(),
                    entity.id
                )));
            }
        }

        for op in &operations {
            for end in [op.from, op.to] {
                if end.index() >= entities.len() {
                    return Err(Error::UnknownEntity {
                        operation: op.id,
                        entity: end.index(),
                    });
                }
            }
            if op.frequency == 0 {
                return Err(Error::InvalidConfig(format!(
                    "operation {} has frequency 0",
                    op.id
                )));
            }
        }

        let mut arrangement = Self {
            occupancy: vec![None; grid.frame_len()],
            grid,
            entities,
            operations,
            aisle_width,
        };

        for i in 0..arrangement.entities.len() {
            let entity = &arrangement.entities[i];
            for &cell in &entity.positions {
                if !arrangement.grid.in_bounds(cell) || arrangement.grid.is_wall(cell) {
                    return Err(Error::OutOfBounds {
                        cell: cell.to_string(),
                    });
                }
                if let Some(other) = arrangement.occupant(cell) {
                    return Err(Error::CellConflict {
                        cell: cell.to_string(),
                        existing: format!("entity {other}"),
                        requested: format!("entity {}", entity.id),
                    });
                }
                if let Some(idx) = arrangement.grid.index(cell) {
                    arrangement.occupancy[idx] = Some(entity.id);
                }
            }
        }

        Ok(arrangement)
    }

    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    /// Shared handle to the grid.
    pub fn shared_grid(&self) -> Arc<GridModel> {
        Arc::clone(&self.grid)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn aisle_width(&self) -> u32 {
        self.aisle_width
    }

    pub fn with_aisle_width(mut self, width: u32) -> Self {
        self.aisle_width = width.max(1);
        self
    }

    /// Current cells of an entity; empty when unplaced or unknown.
    pub fn positions(&self, id: EntityId) -> &[Cell] {
        self.entity(id).map_or(&[], |e| e.positions.as_slice())
    }

    /// Resolves both ends of an operation to current positions.
    pub fn endpoints(&self, op: &Operation) -> (&[Cell], &[Cell]) {
        (self.positions(op.from), self.positions(op.to))
    }

    /// Entity occupying `cell`, if any.
    #[inline]
    pub fn occupant(&self, cell: Cell) -> Option<EntityId> {
        self.grid.index(cell).and_then(|i| self.occupancy[i])
    }

    /// A cell is available when it is in bounds, not structural, and unoccupied.
    #[inline]
    pub fn is_available(&self, cell: Cell) -> bool {
        self.grid.in_bounds(cell) && !self.grid.is_structural(cell) && self.occupant(cell).is_none()
    }

    /// Ids of entities the optimizer may move.
    pub fn auto_entity_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.is_auto())
            .map(|e| e.id)
            .collect()
    }

    /// Returns true when every entity has a position.
    pub fn is_fully_placed(&self) -> bool {
        self.entities.iter().all(Entity::is_placed)
    }

    /// Anchors an entity at `base`, replacing its previous position. Does not validate.
    pub fn place(&mut self, id: EntityId, base: Cell) {
        let Some(entity) = self.entities.get(id.index()) else {
            return;
        };
        let cells: Vec<Cell> = entity.footprint_at(base).collect();
        self.set_positions(id, cells);
    }

    /// Removes an entity from the grid.
    pub fn clear(&mut self, id: EntityId) {
        self.set_positions(id, Vec::new());
    }

    /// Replaces an entity's cells wholesale. Does not validate.
    pub fn set_positions(&mut self, id: EntityId, cells: Vec<Cell>) {
        let Some(entity) = self.entities.get_mut(id.index()) else {
            return;
        };
        for cell in entity.positions.drain(..) {
            if let Some(i) = self.grid.index(cell) {
                if self.occupancy[i] == Some(id) {
                    self.occupancy[i] = None;
                }
            }
        }
        for &cell in &cells {
            if let Some(i) = self.grid.index(cell) {
                self.occupancy[i] = Some(id);
            }
        }
        entity.positions = cells;
    }

    /// Snapshot of every entity's cells, for transactional moves.
    pub(crate) fn save_positions(&self, ids: &[EntityId]) -> Vec<(EntityId, Vec<Cell>)> {
        ids.iter()
            .map(|&id| (id, self.positions(id).to_vec()))
            .collect()
    }

    /// Restores what [`Arrangement::save_positions`] captured.
    pub(crate) fn restore_positions(&mut self, saved: Vec<(EntityId, Vec<Cell>)>) {
        for (id, _) in &saved {
            self.clear(*id);
        }
        for (id, cells) in saved {
            self.set_positions(id, cells);
        }
    }

    pub(crate) fn into_parts(self) -> (Arc<GridModel>, Vec<Entity>, Vec<Operation>, u32) {
        (self.grid, self.entities, self.operations, self.aisle_width)
    }
}
