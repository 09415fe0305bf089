//! Inbound site configuration.
//!
//! [`SiteConfig`] mirrors the wire format produced by the site set-up tools:
//! cell maps keyed by `"x,y"` strings, an entity catalogue with quantities,
//! and an operation list referencing catalogue ids. [`SiteConfig::build`]
//! validates everything and produces the initial [`Arrangement`]. Every
//! problem it finds is a configuration error, reported before any entity is
//! placed.

use crate::arrangement::Arrangement;
use crate::cell::Cell;
use crate::cluster::group_touching_clusters;
use crate::entity::{none_list, none_option, Entity, EntityId, Operation, PlacementMode};
use crate::grid::GridModel;
use crate::kind::{StructureKind, UtilityKind, ZoneKind};
use serde::{Deserialize, Serialize};
use siteplan_core::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Category given to entities derived from structural regions.
pub const STRUCTURE_CATEGORY: &str = "structure";

/// A site as described by the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(alias = "warehouse_width")]
    pub width: i64,
    #[serde(alias = "warehouse_length")]
    pub length: i64,
    #[serde(default = "default_one_i64")]
    pub aisle_width: i64,
    /// `"x,y"` to structural kind.
    #[serde(default)]
    pub structure: BTreeMap<String, String>,
    /// `"x,y"` to zone kind.
    #[serde(default)]
    pub zones: BTreeMap<String, String>,
    /// `"x,y"` to utility kind.
    #[serde(default)]
    pub utilities: BTreeMap<String, String>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

/// One catalogue line; expanded into `quantity` entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub placement: PlacementMode,
    #[serde(default = "default_one_u32")]
    pub quantity: u32,
    #[serde(default = "default_one_u32")]
    pub width: u32,
    #[serde(default = "default_one_u32")]
    pub length: u32,
    #[serde(default, with = "none_list")]
    pub depends_on: Vec<UtilityKind>,
    #[serde(default, with = "none_option")]
    pub within_zone: Option<ZoneKind>,
    /// Base cells (`"x,y"`) for manual entities, one per unit of quantity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<String>,
}

/// A route between two catalogue entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    #[serde(alias = "source")]
    pub from_entity: usize,
    #[serde(alias = "destination")]
    pub to_entity: usize,
    #[serde(default = "default_one_i64")]
    pub frequency: i64,
}

fn default_one_i64() -> i64 {
    1
}

fn default_one_u32() -> u32 {
    1
}

impl SiteConfig {
    /// An empty `width x length` site.
    pub fn new(width: i64, length: i64) -> Self {
        Self {
            width,
            length,
            aisle_width: 1,
            structure: BTreeMap::new(),
            zones: BTreeMap::new(),
            utilities: BTreeMap::new(),
            entities: Vec::new(),
            operations: Vec::new(),
        }
    }

    /// Parses the JSON wire form.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::ParseError(e.to_string()))
    }

    pub fn with_aisle_width(mut self, width: i64) -> Self {
        self.aisle_width = width;
        self
    }

    pub fn with_structure(mut self, cell: Cell, kind: StructureKind) -> Self {
        self.structure.insert(cell.to_string(), kind.name().to_string());
        self
    }

    pub fn with_zone(mut self, cell: Cell, zone: ZoneKind) -> Self {
        self.zones.insert(cell.to_string(), zone.name().to_string());
        self
    }

    pub fn with_utility(mut self, cell: Cell, utility: UtilityKind) -> Self {
        self.utilities.insert(cell.to_string(), utility.name().to_string());
        self
    }

    pub fn with_entity(mut self, spec: EntitySpec) -> Self {
        self.entities.push(spec);
        self
    }

    /// Adds an operation between two catalogue ids.
    pub fn with_operation(mut self, from: usize, to: usize, frequency: i64) -> Self {
        self.operations.push(OperationSpec {
            id: None,
            from_entity: from,
            to_entity: to,
            frequency,
        });
        self
    }

    /// Number of entities the catalogue expands to, before structural ones.
    pub fn catalogue_size(&self) -> usize {
        self.entities.iter().map(|e| e.quantity as usize).sum()
    }

    /// Validates the configuration and assembles the initial arrangement.
    ///
    /// Catalogue entities receive ids `0..n` in expansion order; entities
    /// derived from non-wall structural regions follow. Manual catalogue
    /// entities are placed at their given cells; auto entities stay unplaced.
    pub fn build(&self) -> Result<Arrangement> {
        let max_side = GridModel::MAX_SIDE as i64;
        if self.width <= 0 || self.length <= 0 || self.width > max_side || self.length > max_side {
            return Err(Error::InvalidDimensions {
                width: self.width,
                length: self.length,
            });
        }
        if self.aisle_width <= 0 {
            return Err(Error::InvalidConfig(format!(
                "aisle_width must be positive, got {}",
                self.aisle_width
            )));
        }

        let mut grid = GridModel::new(self.width as u32, self.length as u32)?;
        let mut regions: BTreeMap<StructureKind, BTreeSet<Cell>> = BTreeMap::new();
        for (key, value) in &self.structure {
            let cell: Cell = key.parse()?;
            let kind: StructureKind = value.parse()?;
            grid.add_structure(cell, kind)?;
            if kind != StructureKind::Wall {
                regions.entry(kind).or_default().insert(cell);
            }
        }
        for (key, value) in &self.zones {
            grid.add_zone(key.parse()?, value.parse()?)?;
        }
        for (key, value) in &self.utilities {
            grid.add_utility(key.parse()?, value.parse()?)?;
        }

        let structural: Vec<(StructureKind, Vec<Cell>)> = regions
            .iter()
            .flat_map(|(kind, cells)| {
                group_touching_clusters(cells)
                    .into_iter()
                    .map(move |group| (*kind, group))
            })
            .collect();
        let total = self.catalogue_size() + structural.len();

        let operations = self.operations(total)?;

        let mut entities = Vec::with_capacity(total);
        let mut taken: BTreeSet<Cell> = BTreeSet::new();
        for spec in &self.entities {
            self.expand(spec, &grid, &mut taken, &mut entities)?;
        }

        for (kind, cells) in structural {
            let id = EntityId(entities.len());
            entities.push(
                Entity::new(id, STRUCTURE_CATEGORY, kind.name())
                    .with_placement(PlacementMode::Manual)
                    .with_positions(cells),
            );
        }

        log::debug!(
            "built {}x{} site: {} entities ({} structural), {} operations",
            self.width,
            self.length,
            entities.len(),
            entities.len() - self.catalogue_size(),
            operations.len()
        );

        Arrangement::new(grid, entities, operations, self.aisle_width as u32)
    }

    fn operations(&self, entity_count: usize) -> Result<Vec<Operation>> {
        self.operations
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let id = spec.id.unwrap_or(i);
                for end in [spec.from_entity, spec.to_entity] {
                    if end >= entity_count {
                        return Err(Error::UnknownEntity {
                            operation: id,
                            entity: end,
                        });
                    }
                }
                if spec.frequency < 1 || spec.frequency > u32::MAX as i64 {
                    return Err(Error::InvalidConfig(format!(
                        "operation {id}: frequency must be at least 1, got {}",
                        spec.frequency
                    )));
                }
                Ok(
                    Operation::new(id, EntityId(spec.from_entity), EntityId(spec.to_entity))
                        .with_frequency(spec.frequency as u32),
                )
            })
            .collect()
    }

    fn expand(
        &self,
        spec: &EntitySpec,
        grid: &GridModel,
        taken: &mut BTreeSet<Cell>,
        entities: &mut Vec<Entity>,
    ) -> Result<()> {
        let manual = spec.placement == PlacementMode::Manual;
        if manual && spec.positions.len() != spec.quantity as usize {
            return Err(Error::InvalidConfig(format!(
                "manual entity `{}` needs {} positions, got {}",
                spec.kind,
                spec.quantity,
                spec.positions.len()
            )));
        }

        if spec.width == 0 || spec.length == 0 || spec.width > grid.width() || spec.length > grid.length() {
            return Err(Error::InvalidConfig(format!(
                "entity `{}`: footprint {}x{} does not fit a {}x{} site",
                spec.kind,
                spec.width,
                spec.length,
                grid.width(),
                grid.length()
            )));
        }

        for unit in 0..spec.quantity as usize {
            let id = EntityId(entities.len());
            let mut entity = Entity::new(id, spec.category.clone(), spec.kind.clone())
                .with_footprint(spec.width, spec.length)
                .with_placement(spec.placement)
                .with_dependencies(spec.depends_on.iter().copied());
            entity.within_zone = spec.within_zone;

            if manual {
                let base: Cell = spec.positions[unit].parse()?;
                if !grid.in_bounds(base) {
                    return Err(Error::OutOfBounds {
                        cell: base.to_string(),
                    });
                }
                let cells: Vec<Cell> = entity.footprint_at(base).collect();
                for &cell in &cells {
                    check_manual_cell(grid, &entity, cell, taken)?;
                    taken.insert(cell);
                }
                entity.positions = cells;
            }

            entities.push(entity);
        }
        Ok(())
    }
}

fn check_manual_cell(
    grid: &GridModel,
    entity: &Entity,
    cell: Cell,
    taken: &BTreeSet<Cell>,
) -> Result<()> {
    if !grid.in_bounds(cell) {
        return Err(Error::OutOfBounds {
            cell: cell.to_string(),
        });
    }
    if let Some(kind) = grid.structure_at(cell) {
        return Err(Error::CellConflict {
            cell: cell.to_string(),
            existing: kind.name().to_string(),
            requested: format!("entity {}", entity.id),
        });
    }
    if taken.contains(&cell) {
        return Err(Error::CellConflict {
            cell: cell.to_string(),
            existing: "occupied".to_string(),
            requested: format!("entity {}", entity.id),
        });
    }
    if let Some(zone) = entity.within_zone {
        if !grid.in_zone(cell, zone) {
            return Err(Error::InvalidConfig(format!(
                "entity {} at {cell} lies outside zone {zone}",
                entity.id
            )));
        }
    }
    Ok(())
}

impl EntitySpec {
    /// One auto-placed 1x1 unit.
    pub fn new(category: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: kind.into(),
            placement: PlacementMode::Auto,
            quantity: 1,
            width: 1,
            length: 1,
            depends_on: Vec::new(),
            within_zone: None,
            positions: Vec::new(),
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_footprint(mut self, width: u32, length: u32) -> Self {
        self.width = width;
        self.length = length;
        self
    }

    pub fn with_dependencies(mut self, utilities: impl IntoIterator<Item = UtilityKind>) -> Self {
        self.depends_on = utilities.into_iter().collect();
        self
    }

    pub fn with_zone(mut self, zone: ZoneKind) -> Self {
        self.within_zone = Some(zone);
        self
    }

    /// Marks the line manual, fixed at the given base cells.
    pub fn manual_at(mut self, bases: impl IntoIterator<Item = Cell>) -> Self {
        self.placement = PlacementMode::Manual;
        self.positions = bases.into_iter().map(|c| c.to_string()).collect();
        self.quantity = self.positions.len() as u32;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_form() {
        let json = r#"{
            "warehouse_width": 6,
            "warehouse_length": 4,
            "structure": {"3,1": "loading", "4,1": "loading", "6,4": "ex_ent"},
            "zones": {"1,1": "lowTemp"},
            "utilities": {"2,4": "water"},
            "entities": [
                {"category": "storage", "type": "rack", "placement": "auto", "quantity": 2,
                 "width": 1, "length": 1, "depends_on": ["none"], "within_zone": "none"},
                {"category": "cold", "type": "freezer", "quantity": 1,
                 "depends_on": ["electric"], "within_zone": "low_temp"}
            ],
            "operations": [{"source": 0, "destination": 2, "frequency": 4}]
        }"#;

        let layout = SiteConfig::from_json(json).unwrap().build().unwrap();

        // 3 catalogue units + loading dock + exit/entrance
        assert_eq!(layout.entities().len(), 5);
        let dock = &layout.entities()[3];
        assert_eq!(dock.category, STRUCTURE_CATEGORY);
        assert_eq!(dock.kind, "loading");
        assert_eq!(dock.positions, vec![Cell::new(3, 1), Cell::new(4, 1)]);
        assert_eq!(layout.entities()[4].kind, "exit_entrance");
        assert_eq!(layout.operations()[0].frequency, 4);
        assert_eq!(layout.entities()[2].within_zone, Some(ZoneKind::LowTemp));
    }

    #[test]
    fn test_unknown_entity_reported_first() {
        let config = SiteConfig::new(10, 10)
            .with_entity(EntitySpec::new("s", "rack").with_quantity(4))
            .with_operation(0, 999, 1);

        match config.build() {
            Err(Error::UnknownEntity { entity, .. }) => assert_eq!(entity, 999),
            other => panic!("expected UnknownEntity, got {other:?}"),
        }
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            SiteConfig::new(0, 3).build(),
            Err(Error::InvalidDimensions { .. })
        ));

        let mut bad_coord = SiteConfig::new(3, 3);
        bad_coord.zones.insert("one,two".into(), "high_temp".into());
        assert!(matches!(bad_coord.build(), Err(Error::InvalidCoordinate(_))));

        let mut bad_kind = SiteConfig::new(3, 3);
        bad_kind.utilities.insert("1,1".into(), "steam".into());
        assert!(matches!(bad_kind.build(), Err(Error::UnknownKind { .. })));

        let zero_freq = SiteConfig::new(3, 3)
            .with_entity(EntitySpec::new("s", "rack").with_quantity(2))
            .with_operation(0, 1, 0);
        assert!(matches!(zero_freq.build(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_manual_entities_are_placed() {
        let config = SiteConfig::new(3, 1)
            .with_entity(EntitySpec::new("m", "press").manual_at([Cell::new(1, 1), Cell::new(3, 1)]));
        let layout = config.build().unwrap();

        assert_eq!(layout.occupant(Cell::new(1, 1)), Some(EntityId(0)));
        assert_eq!(layout.occupant(Cell::new(3, 1)), Some(EntityId(1)));
        assert!(layout.auto_entity_ids().is_empty());

        let overlapping = SiteConfig::new(3, 1)
            .with_entity(EntitySpec::new("m", "press").with_footprint(2, 1).manual_at([Cell::new(1, 1), Cell::new(2, 1)]));
        assert!(matches!(overlapping.build(), Err(Error::CellConflict { .. })));
    }

    #[test]
    fn test_extreme_input_is_rejected() {
        let far_manual = SiteConfig::new(5, 5).with_entity(
            EntitySpec::new("m", "press")
                .with_footprint(2, 1)
                .manual_at([Cell::new(i32::MAX, 1)]),
        );
        assert!(matches!(far_manual.build(), Err(Error::OutOfBounds { .. })));

        let oversized = SiteConfig::new(4, 4).with_entity(EntitySpec::new("m", "press").with_footprint(5, 1));
        assert!(matches!(oversized.build(), Err(Error::InvalidConfig(_))));

        let empty = SiteConfig::new(4, 4).with_entity(EntitySpec::new("m", "press").with_footprint(0, 1));
        assert!(matches!(empty.build(), Err(Error::InvalidConfig(_))));

        assert!(matches!(
            SiteConfig::new(u32::MAX as i64, 3).build(),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(matches!(
            SiteConfig::new(3, i32::MAX as i64).build(),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_diagonal_regions_merge() {
        let config = SiteConfig::new(5, 5)
            .with_structure(Cell::new(1, 1), StructureKind::Exit)
            .with_structure(Cell::new(2, 2), StructureKind::Exit)
            .with_structure(Cell::new(5, 5), StructureKind::Exit);
        let layout = config.build().unwrap();

        let exits: Vec<&Entity> = layout.entities().iter().filter(|e| e.kind == "exit").collect();
        assert_eq!(exits.len(), 2);
        assert_eq!(exits[0].positions.len(), 2);
        assert!(exits.iter().all(|e| !e.is_auto()));
    }
}
