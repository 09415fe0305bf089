//! Serialized arrangement form.
//!
//! A snapshot is the outbound contract for anything downstream of the search:
//! site dimensions, the interior structure/zone/utility layers keyed by
//! `"x,y"`, the entities with their resolved positions, and the operations.
//! The generated perimeter wall is implied by the dimensions and left out.
//!
//! `Arrangement::from_snapshot(arrangement.to_snapshot())` reproduces the
//! arrangement exactly.

use crate::arrangement::Arrangement;
use crate::cell::Cell;
use crate::entity::{Entity, Operation};
use crate::grid::GridModel;
use crate::kind::{StructureKind, UtilityKind, ZoneKind};
use serde::{Deserialize, Serialize};
use siteplan_core::{Error, Result};
use std::collections::BTreeMap;

/// Plain-data image of an [`Arrangement`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: u32,
    pub length: u32,
    #[serde(default = "default_aisle_width")]
    pub aisle_width: u32,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub structure: BTreeMap<Cell, StructureKind>,
    /// A cell in one zone is written as a bare kind, a cell in several as a list.
    #[serde(default, with = "layer")]
    pub zones: BTreeMap<Cell, Vec<ZoneKind>>,
    #[serde(default, with = "layer")]
    pub utilities: BTreeMap<Cell, Vec<UtilityKind>>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

fn default_aisle_width() -> u32 {
    1
}

impl Snapshot {
    fn layers(grid: &GridModel, aisle_width: u32, entities: Vec<Entity>, operations: Vec<Operation>) -> Self {
        let structure = grid
            .structure()
            .iter()
            .flat_map(|(&kind, cells)| cells.iter().map(move |&c| (c, kind)))
            .filter(|(c, _)| grid.in_bounds(*c))
            .collect();

        Self {
            width: grid.width(),
            length: grid.length(),
            aisle_width,
            entities,
            structure,
            zones: invert(grid.zones()),
            utilities: invert(grid.utilities()),
            operations,
        }
    }
}

impl From<Arrangement> for Snapshot {
    fn from(layout: Arrangement) -> Self {
        let (grid, entities, operations, aisle_width) = layout.into_parts();
        Snapshot::layers(&grid, aisle_width, entities, operations)
    }
}

impl TryFrom<Snapshot> for Arrangement {
    type Error = Error;

    fn try_from(snapshot: Snapshot) -> Result<Self> {
        Arrangement::from_snapshot(snapshot)
    }
}

impl Arrangement {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::layers(
            self.grid(),
            self.aisle_width(),
            self.entities().to_vec(),
            self.operations().to_vec(),
        )
    }

    /// Rebuilds an arrangement, re-running every check [`Arrangement::new`] makes.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut grid = GridModel::new(snapshot.width, snapshot.length)?;
        for (cell, kind) in snapshot.structure {
            grid.add_structure(cell, kind)?;
        }
        for (cell, zones) in snapshot.zones {
            for zone in zones {
                grid.add_zone(cell, zone)?;
            }
        }
        for (cell, utilities) in snapshot.utilities {
            for utility in utilities {
                grid.add_utility(cell, utility)?;
            }
        }
        Arrangement::new(grid, snapshot.entities, snapshot.operations, snapshot.aisle_width)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot()).map_err(|e| Error::Internal(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(text).map_err(|e| Error::ParseError(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }
}

fn invert<K: Copy + Ord>(layer: &BTreeMap<K, std::collections::BTreeSet<Cell>>) -> BTreeMap<Cell, Vec<K>> {
    let mut by_cell: BTreeMap<Cell, Vec<K>> = BTreeMap::new();
    for (&kind, cells) in layer {
        for &cell in cells {
            by_cell.entry(cell).or_default().push(kind);
        }
    }
    by_cell
}

mod layer {
    use crate::cell::Cell;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    pub fn serialize<S, K>(map: &BTreeMap<Cell, Vec<K>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        K: Serialize,
    {
        s.collect_map(map.iter().map(|(cell, kinds)| {
            let value = match kinds.as_slice() {
                [one] => OneOrMany::One(one),
                many => OneOrMany::Many(many.iter().collect()),
            };
            (cell, value)
        }))
    }

    pub fn deserialize<'de, D, K>(d: D) -> Result<BTreeMap<Cell, Vec<K>>, D::Error>
    where
        D: Deserializer<'de>,
        K: Deserialize<'de>,
    {
        let raw = BTreeMap::<Cell, OneOrMany<K>>::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(cell, value)| match value {
                OneOrMany::One(kind) => (cell, vec![kind]),
                OneOrMany::Many(kinds) => (cell, kinds),
            })
            .collect())
    }
}
