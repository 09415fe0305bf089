//! Spatial grouping of entities and cells.

use crate::arrangement::Arrangement;
use crate::cell::Cell;
use crate::entity::EntityId;
use std::collections::{BTreeSet, VecDeque};

/// Default proximity threshold (Manhattan distance between anchors).
pub const DEFAULT_CLUSTER_DISTANCE: u32 = 3;

/// Same-type, nearby auto entities that genetic operators move together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    /// Shared entity type.
    pub kind: String,
    /// Members, sorted by id.
    pub members: Vec<EntityId>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Greedy single-pass clustering of placed auto entities.
///
/// Entities are visited in id order. Each unassigned entity seeds a cluster
/// and pulls in every later unassigned entity of the same type whose anchor is
/// within `threshold` of all members gathered so far. First assignment wins.
pub fn find_clusters(layout: &Arrangement, threshold: u32) -> Vec<Cluster> {
    let candidates: Vec<(EntityId, &str, Cell)> = layout
        .entities()
        .iter()
        .filter(|e| e.is_auto())
        .filter_map(|e| e.base().map(|base| (e.id, e.kind.as_str(), base)))
        .collect();

    let mut assigned = vec![false; candidates.len()];
    let mut clusters = Vec::new();

    for i in 0..candidates.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let (seed, kind, base) = candidates[i];
        let mut anchors = vec![base];
        let mut members = vec![seed];

        for j in (i + 1)..candidates.len() {
            let (other, other_kind, other_base) = candidates[j];
            if assigned[j] || other_kind != kind {
                continue;
            }
            if anchors.iter().all(|a| a.manhattan(other_base) <= threshold) {
                assigned[j] = true;
                anchors.push(other_base);
                members.push(other);
            }
        }

        clusters.push(Cluster {
            kind: kind.to_string(),
            members,
        });
    }

    clusters
}

/// Splits a cell set into 8-connected components.
///
/// Components come out ordered by their smallest cell, each sorted.
pub fn group_touching_clusters(cells: &BTreeSet<Cell>) -> Vec<Vec<Cell>> {
    let mut seen: BTreeSet<Cell> = BTreeSet::new();
    let mut groups = Vec::new();

    for &start in cells {
        if !seen.insert(start) {
            continue;
        }
        let mut group = vec![start];
        let mut queue = VecDeque::from([start]);

        while let Some(cell) = queue.pop_front() {
            for next in cell.neighbors8() {
                if cells.contains(&next) && seen.insert(next) {
                    group.push(next);
                    queue.push_back(next);
                }
            }
        }

        group.sort();
        groups.push(group);
    }

    groups
}
