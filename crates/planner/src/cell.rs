//! Grid cell coordinates.

use serde::{Deserialize, Serialize};
use siteplan_core::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A cell coordinate. Site cells are 1-indexed; row and column 0 and
/// `width + 1` / `length + 1` form the perimeter wall.
///
/// Serialized as the `"x,y"` string, so cells can key JSON maps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// Orthogonal unit moves.
    pub const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

    /// Diagonal unit moves.
    pub const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the cell shifted by `(dx, dy)`.
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    #[inline]
    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    #[inline]
    pub fn chebyshev(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    #[inline]
    pub fn euclidean(self, other: Cell) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        dx.hypot(dy)
    }

    /// The four orthogonal neighbors.
    pub fn neighbors4(self) -> impl Iterator<Item = Cell> {
        Self::ORTHOGONAL
            .into_iter()
            .map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// All eight surrounding cells.
    pub fn neighbors8(self) -> impl Iterator<Item = Cell> {
        Self::ORTHOGONAL
            .into_iter()
            .chain(Self::DIAGONAL)
            .map(move |(dx, dy)| self.offset(dx, dy))
    }

    /// Cells of a `width x length` rectangle anchored at `self`, row by row.
    pub fn footprint(self, width: u32, length: u32) -> impl Iterator<Item = Cell> {
        let (width, length) = (width.min(i32::MAX as u32) as i32, length.min(i32::MAX as u32) as i32);
        (0..length).flat_map(move |dy| (0..width).map(move |dx| self.offset(dx, dy)))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for Cell {
    type Err = Error;

    /// Parses the `"x,y"` wire form. Whitespace around either number is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidCoordinate(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse::<i32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self::new(x, y))
    }
}

impl TryFrom<String> for Cell {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Cell> for String {
    fn from(cell: Cell) -> Self {
        cell.to_string()
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let cell: Cell = " 3, 12".parse().unwrap();
        assert_eq!(cell, Cell::new(3, 12));
        assert_eq!(cell.to_string(), "3,12");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "3", "3;4", "a,4", "3,4,5", "1.5,2"] {
            assert!(
                matches!(bad.parse::<Cell>(), Err(Error::InvalidCoordinate(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_distances() {
        let a = Cell::new(1, 1);
        let b = Cell::new(4, 5);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(a.chebyshev(b), 4);
        assert!((a.euclidean(b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_footprint() {
        let cells: Vec<Cell> = Cell::new(2, 3).footprint(2, 2).collect();
        assert_eq!(
            cells,
            vec![
                Cell::new(2, 3),
                Cell::new(3, 3),
                Cell::new(2, 4),
                Cell::new(3, 4)
            ]
        );
        assert_eq!(Cell::new(1, 1).neighbors8().count(), 8);
    }

    #[test]
    fn test_offset_saturates_at_coordinate_limits() {
        let edge = Cell::new(i32::MAX, i32::MIN);
        assert_eq!(edge.offset(1, -1), edge);
        let cells: Vec<Cell> = edge.footprint(2, 1).collect();
        assert_eq!(cells, vec![edge, edge]);
        assert_eq!(Cell::new(0, 0).footprint(u32::MAX, 0).count(), 0);
    }

    #[test]
    fn test_serde_string_form() {
        let json = serde_json::to_string(&vec![Cell::new(2, 9)]).unwrap();
        assert_eq!(json, r#"["2,9"]"#);
        let back: Vec<Cell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Cell::new(2, 9)]);
    }
}
