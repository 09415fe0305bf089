//! Site geometry and per-cell classification.

use crate::cell::Cell;
use crate::kind::{StructureKind, UtilityKind, ZoneKind};
use siteplan_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// The fixed site: dimensions, structural cells, zones and utility supply points.
///
/// A grid is built once and then shared read-only (behind an `Arc`) by every
/// arrangement in a search. Alongside the keyed cell sets it keeps dense
/// per-cell lookups covering the perimeter ring, indexed `(y * (width + 2) + x)`,
/// so the pathfinder's hot loop never touches a map.
#[derive(Debug, Clone, PartialEq)]
pub struct GridModel {
    width: u32,
    length: u32,
    structure: BTreeMap<StructureKind, BTreeSet<Cell>>,
    zones: BTreeMap<ZoneKind, BTreeSet<Cell>>,
    utilities: BTreeMap<UtilityKind, BTreeSet<Cell>>,
    structure_at: Vec<Option<StructureKind>>,
    zone_mask: Vec<u8>,
}

impl GridModel {
    /// Largest side length whose perimeter still fits `i32` coordinates.
    pub const MAX_SIDE: u32 = (i32::MAX - 2) as u32;

    /// Creates an empty site enclosed by its perimeter wall.
    pub fn new(width: u32, length: u32) -> Result<Self> {
        if width == 0 || length == 0 || width > Self::MAX_SIDE || length > Self::MAX_SIDE {
            return Err(Error::InvalidDimensions {
                width: width as i64,
                length: length as i64,
            });
        }

        let stride = (width + 2) as usize;
        let cells = stride * (length + 2) as usize;
        let mut grid = Self {
            width,
            length,
            structure: BTreeMap::new(),
            zones: BTreeMap::new(),
            utilities: BTreeMap::new(),
            structure_at: vec![None; cells],
            zone_mask: vec![0; cells],
        };

        let (w, l) = (width as i32, length as i32);
        let border = (0..=w + 1)
            .flat_map(|x| [Cell::new(x, 0), Cell::new(x, l + 1)])
            .chain((1..=l).flat_map(|y| [Cell::new(0, y), Cell::new(w + 1, y)]));
        for cell in border {
            grid.mark_structure(cell, StructureKind::Wall);
        }

        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Number of cells inside the perimeter.
    pub fn area(&self) -> usize {
        self.width as usize * self.length as usize
    }

    /// Length of the site diagonal, used to normalize distances.
    pub fn diagonal(&self) -> f64 {
        (self.width as f64).hypot(self.length as f64)
    }

    /// Returns true if `cell` lies inside `[1..width] x [1..length]`.
    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 1 && cell.y >= 1 && cell.x <= self.width as i32 && cell.y <= self.length as i32
    }

    /// Dense index of a cell in the perimeter-inclusive frame.
    #[inline]
    pub fn index(&self, cell: Cell) -> Option<usize> {
        let stride = self.width as i32 + 2;
        if cell.x < 0 || cell.y < 0 || cell.x >= stride || cell.y > self.length as i32 + 1 {
            return None;
        }
        Some((cell.y * stride + cell.x) as usize)
    }

    /// Inverse of [`GridModel::index`].
    #[inline]
    pub fn cell_at(&self, index: usize) -> Cell {
        let stride = self.width as usize + 2;
        Cell::new((index % stride) as i32, (index / stride) as i32)
    }

    /// Size of the dense frame (perimeter included).
    pub fn frame_len(&self) -> usize {
        self.structure_at.len()
    }

    /// Structural kind of a cell; anything outside the frame reads as wall.
    #[inline]
    pub fn structure_at(&self, cell: Cell) -> Option<StructureKind> {
        match self.index(cell) {
            Some(i) => self.structure_at[i],
            None => Some(StructureKind::Wall),
        }
    }

    #[inline]
    pub fn is_wall(&self, cell: Cell) -> bool {
        self.structure_at(cell) == Some(StructureKind::Wall)
    }

    /// Returns true for any structural cell (wall or otherwise).
    #[inline]
    pub fn is_structural(&self, cell: Cell) -> bool {
        self.structure_at(cell).is_some()
    }

    /// A cell can be walked iff it is inside the site and not a wall.
    #[inline]
    pub fn is_traversable(&self, cell: Cell) -> bool {
        self.in_bounds(cell) && !self.is_wall(cell)
    }

    #[inline]
    pub fn in_zone(&self, cell: Cell, zone: ZoneKind) -> bool {
        self.index(cell)
            .is_some_and(|i| self.zone_mask[i] & zone.bit() != 0)
    }

    /// Marks a structural cell. Re-marking the generated border as wall is a no-op.
    pub fn add_structure(&mut self, cell: Cell, kind: StructureKind) -> Result<()> {
        if !self.in_bounds(cell) {
            if kind == StructureKind::Wall && self.is_wall(cell) && self.index(cell).is_some() {
                return Ok(());
            }
            return Err(Error::OutOfBounds {
                cell: cell.to_string(),
            });
        }

        match self.structure_at(cell) {
            Some(existing) if existing == kind => Ok(()),
            Some(existing) => Err(Error::CellConflict {
                cell: cell.to_string(),
                existing: existing.name().to_string(),
                requested: kind.name().to_string(),
            }),
            None => {
                self.mark_structure(cell, kind);
                Ok(())
            }
        }
    }

    pub fn add_zone(&mut self, cell: Cell, zone: ZoneKind) -> Result<()> {
        let i = self.checked_index(cell)?;
        self.zone_mask[i] |= zone.bit();
        self.zones.entry(zone).or_default().insert(cell);
        Ok(())
    }

    pub fn add_utility(&mut self, cell: Cell, utility: UtilityKind) -> Result<()> {
        self.checked_index(cell)?;
        self.utilities.entry(utility).or_default().insert(cell);
        Ok(())
    }

    /// Cells of one structural kind.
    pub fn structure_cells(&self, kind: StructureKind) -> impl Iterator<Item = Cell> + '_ {
        self.structure.get(&kind).into_iter().flatten().copied()
    }

    pub fn zone_cells(&self, zone: ZoneKind) -> impl Iterator<Item = Cell> + '_ {
        self.zones.get(&zone).into_iter().flatten().copied()
    }

    /// Supply points of one utility kind.
    pub fn utility_cells(&self, utility: UtilityKind) -> impl Iterator<Item = Cell> + '_ {
        self.utilities.get(&utility).into_iter().flatten().copied()
    }

    pub fn structure(&self) -> &BTreeMap<StructureKind, BTreeSet<Cell>> {
        &self.structure
    }

    pub fn zones(&self) -> &BTreeMap<ZoneKind, BTreeSet<Cell>> {
        &self.zones
    }

    pub fn utilities(&self) -> &BTreeMap<UtilityKind, BTreeSet<Cell>> {
        &self.utilities
    }

    /// Every cell inside the perimeter, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        Cell::new(1, 1).footprint(self.width, self.length)
    }

    fn mark_structure(&mut self, cell: Cell, kind: StructureKind) {
        if let Some(i) = self.index(cell) {
            self.structure_at[i] = Some(kind);
        }
        self.structure.entry(kind).or_default().insert(cell);
    }

    fn checked_index(&self, cell: Cell) -> Result<usize> {
        if !self.in_bounds(cell) {
            return Err(Error::OutOfBounds {
                cell: cell.to_string(),
            });
        }
        self.index(cell).ok_or_else(|| Error::OutOfBounds {
            cell: cell.to_string(),
        })
    }
}
