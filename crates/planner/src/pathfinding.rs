//! Single-agent grid search.
//!
//! A* over the site grid with unit step cost. With an aisle width of 1 the
//! search uses the 4-neighborhood and the Manhattan heuristic. Wider aisles
//! switch to the 8-neighborhood (Chebyshev heuristic) where every straight
//! step also needs a clear band of `aisle_width` cells perpendicular to the
//! move, and a diagonal step may not cut a wall corner.
//!
//! Only walls and the outside of the site block movement; entities do not.
//!
//! The open set is a binary heap and the closed set, g-scores and parent
//! links are dense arrays over the grid frame, so each expansion is O(log n).

use crate::cell::Cell;
use crate::grid::GridModel;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const NO_PARENT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: u32,
    g: u32,
    index: u32,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f; prefer deeper nodes, then lower index, on ties.
        other
            .f
            .cmp(&self.f)
            .then_with(|| self.g.cmp(&other.g))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `goal`, both ends included.
///
/// Returns `None` when either end is not walkable or the goal cannot be
/// reached, and the one-cell path `[start]` when `start == goal`.
pub fn find_path(start: Cell, goal: Cell, grid: &GridModel, aisle_width: u32) -> Option<Vec<Cell>> {
    find_route(&[start], &[goal], grid, aisle_width)
}

/// Shortest path from any cell of `sources` to any cell of `goals`.
///
/// Equivalent to running [`find_path`] on every pair and keeping the shortest
/// result, in a single search.
pub fn find_route(
    sources: &[Cell],
    goals: &[Cell],
    grid: &GridModel,
    aisle_width: u32,
) -> Option<Vec<Cell>> {
    let goals: Vec<Cell> = goals
        .iter()
        .copied()
        .filter(|&c| grid.is_traversable(c))
        .collect();
    if goals.is_empty() {
        return None;
    }

    let diagonal = aisle_width > 1;
    let heuristic = |cell: Cell| -> u32 {
        goals
            .iter()
            .map(|&g| if diagonal { cell.chebyshev(g) } else { cell.manhattan(g) })
            .min()
            .unwrap_or(0)
    };

    let frame = grid.frame_len();
    let mut g_score = vec![u32::MAX; frame];
    let mut parent = vec![NO_PARENT; frame];
    let mut closed = vec![false; frame];
    let mut is_goal = vec![false; frame];
    for &goal in &goals {
        if let Some(i) = grid.index(goal) {
            is_goal[i] = true;
        }
    }

    let mut open = BinaryHeap::new();
    for &start in sources {
        if !grid.is_traversable(start) {
            continue;
        }
        let Some(i) = grid.index(start) else {
            continue;
        };
        if g_score[i] == 0 {
            continue;
        }
        g_score[i] = 0;
        open.push(OpenEntry {
            f: heuristic(start),
            g: 0,
            index: i as u32,
        });
    }

    while let Some(OpenEntry { g, index, .. }) = open.pop() {
        let current = index as usize;
        if closed[current] {
            continue;
        }
        closed[current] = true;

        if is_goal[current] {
            return Some(reconstruct(grid, &parent, current));
        }

        let cell = grid.cell_at(current);
        for next in successors(cell, grid, aisle_width) {
            let Some(ni) = grid.index(next) else {
                continue;
            };
            if closed[ni] {
                continue;
            }
            let tentative = g + 1;
            if tentative < g_score[ni] {
                g_score[ni] = tentative;
                parent[ni] = index;
                open.push(OpenEntry {
                    f: tentative + heuristic(next),
                    g: tentative,
                    index: ni as u32,
                });
            }
        }
    }

    None
}

/// Number of direction changes along a path.
pub fn count_turns(path: &[Cell]) -> usize {
    path.windows(3)
        .filter(|w| {
            let first = (w[1].x - w[0].x, w[1].y - w[0].y);
            let second = (w[2].x - w[1].x, w[2].y - w[1].y);
            first != second
        })
        .count()
}

/// Returns true if `a` and `b` are one legal move apart for this aisle width.
pub fn is_step(a: Cell, b: Cell, aisle_width: u32) -> bool {
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    if aisle_width > 1 {
        dx.max(dy) == 1
    } else {
        dx + dy == 1
    }
}

fn successors(cell: Cell, grid: &GridModel, aisle_width: u32) -> impl Iterator<Item = Cell> + '_ {
    let straight = Cell::ORTHOGONAL
        .into_iter()
        .filter(move |&(dx, dy)| straight_move_clear(cell, dx, dy, grid, aisle_width))
        .map(move |(dx, dy)| cell.offset(dx, dy));

    let diagonal = Cell::DIAGONAL
        .into_iter()
        .filter(move |_| aisle_width > 1)
        .filter(move |&(dx, dy)| {
            grid.is_traversable(cell.offset(dx, dy))
                && grid.is_traversable(cell.offset(dx, 0))
                && grid.is_traversable(cell.offset(0, dy))
        })
        .map(move |(dx, dy)| cell.offset(dx, dy));

    straight.chain(diagonal)
}

/// A straight step to `cell + (dx, dy)` needs the target walkable and, for
/// wide aisles, the perpendicular band around the target walkable too.
fn straight_move_clear(cell: Cell, dx: i32, dy: i32, grid: &GridModel, aisle_width: u32) -> bool {
    let target = cell.offset(dx, dy);
    if !grid.is_traversable(target) {
        return false;
    }
    if aisle_width <= 1 {
        return true;
    }

    let w = aisle_width as i32;
    let (px, py) = (dy, dx);
    (-((w + 1) / 2) + 1..=w / 2).all(|k| grid.is_traversable(target.offset(px * k, py * k)))
}

fn reconstruct(grid: &GridModel, parent: &[u32], end: usize) -> Vec<Cell> {
    let mut path = vec![grid.cell_at(end)];
    let mut current = end;
    while parent[current] != NO_PARENT {
        current = parent[current] as usize;
        path.push(grid.cell_at(current));
    }
    path.reverse();
    path
}
