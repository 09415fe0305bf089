//! Entity and operation records.

use crate::cell::Cell;
use crate::kind::{UtilityKind, ZoneKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of an entity within its arrangement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl EntityId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who decides an entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementMode {
    /// Positioned by the optimizer.
    #[default]
    Auto,
    /// Fixed by the operator; never moved.
    Manual,
}

/// A placeable unit.
///
/// Placed auto entities occupy the `width x length` rectangle anchored at
/// `positions[0]`, listed row by row. Entities derived from structural regions
/// keep their freeform footprint and report a 1x1 nominal size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub placement: PlacementMode,
    pub width: u32,
    pub length: u32,
    /// Utilities that must be reachable nearby. Empty means none.
    #[serde(default, with = "none_list")]
    pub depends_on: Vec<UtilityKind>,
    /// Zone every footprint cell must lie in.
    #[serde(default, with = "none_option")]
    pub within_zone: Option<ZoneKind>,
    /// Occupied cells; empty until placed.
    #[serde(default)]
    pub positions: Vec<Cell>,
}

impl Entity {
    /// Creates an unplaced 1x1 auto entity.
    pub fn new(id: EntityId, category: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            category: category.into(),
            kind: kind.into(),
            placement: PlacementMode::Auto,
            width: 1,
            length: 1,
            depends_on: Vec::new(),
            within_zone: None,
            positions: Vec::new(),
        }
    }

    pub fn with_footprint(mut self, width: u32, length: u32) -> Self {
        self.width = width.max(1);
        self.length = length.max(1);
        self
    }

    pub fn with_placement(mut self, placement: PlacementMode) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_dependencies(mut self, utilities: impl IntoIterator<Item = UtilityKind>) -> Self {
        self.depends_on = dedup_ordered(utilities);
        self
    }

    pub fn with_zone(mut self, zone: ZoneKind) -> Self {
        self.within_zone = Some(zone);
        self
    }

    pub fn with_positions(mut self, positions: Vec<Cell>) -> Self {
        self.positions = positions;
        self
    }

    #[inline]
    pub fn is_auto(&self) -> bool {
        self.placement == PlacementMode::Auto
    }

    #[inline]
    pub fn is_placed(&self) -> bool {
        !self.positions.is_empty()
    }

    /// Anchor cell of a placed entity.
    #[inline]
    pub fn base(&self) -> Option<Cell> {
        self.positions.first().copied()
    }

    /// Number of cells a placement covers.
    pub fn area(&self) -> usize {
        self.width as usize * self.length as usize
    }

    /// Cells this entity would occupy if anchored at `base`.
    pub fn footprint_at(&self, base: Cell) -> impl Iterator<Item = Cell> {
        base.footprint(self.width, self.length)
    }
}

/// A required, frequency-weighted route between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: usize,
    #[serde(rename = "from_entity", alias = "source")]
    pub from: EntityId,
    #[serde(rename = "to_entity", alias = "destination")]
    pub to: EntityId,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

impl Operation {
    pub fn new(id: usize, from: EntityId, to: EntityId) -> Self {
        Self {
            id,
            from,
            to,
            frequency: 1,
        }
    }

    pub fn with_frequency(mut self, frequency: u32) -> Self {
        self.frequency = frequency.max(1);
        self
    }
}

pub(crate) fn default_frequency() -> u32 {
    1
}

fn dedup_ordered<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// `["none"]` (or `"none"`) on the wire, an empty list in memory.
pub(crate) mod none_list {
    use super::dedup_ordered;
    use crate::kind::UtilityKind;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn serialize<S: Serializer>(value: &[UtilityKind], s: S) -> Result<S::Ok, S::Error> {
        if value.is_empty() {
            ["none"].serialize(s)
        } else {
            value.serialize(s)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<UtilityKind>, D::Error> {
        let raw = match OneOrMany::deserialize(d)? {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        };
        let parsed = raw
            .iter()
            .filter(|s| s.trim() != "none")
            .map(|s| s.parse::<UtilityKind>().map_err(D::Error::custom))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dedup_ordered(parsed))
    }
}

/// `"none"` on the wire, `None` in memory.
pub(crate) mod none_option {
    use crate::kind::ZoneKind;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<ZoneKind>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.map(|z| z.name()).unwrap_or("none"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ZoneKind>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("none") | Some("") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(D::Error::custom),
        }
    }
}
