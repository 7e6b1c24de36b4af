//! Shortest-path search over the grid.
//!
//! [`Pathfinder`] is the narrow seam agents depend on; [`AStar`] is the
//! canonical implementation. Entering a cell costs that cell's terrain
//! movement cost, so the cost of a path is the sum of the entry costs of
//! every cell after the start.

use std::{cmp::Ordering, collections::BinaryHeap};

use tactical_grid_core::CellCoord;
use tracing::{debug, trace};

use crate::{Cell, Grid};

/// Ordered cells from start to goal inclusive.
///
/// An empty path means the goal is unreachable or the request was invalid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    cells: Vec<Cell>,
    cost: u64,
}

impl Path {
    /// Path denoting "no route".
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            cells: Vec::new(),
            cost: 0,
        }
    }

    /// Creates a path from already ordered cells and their total entry cost.
    #[must_use]
    pub fn new(cells: Vec<Cell>, cost: u64) -> Self {
        Self { cells, cost }
    }

    /// Reports whether the path holds no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of cells including start and goal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Cells in traversal order.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Cell at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Coordinates in traversal order.
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells.iter().map(Cell::coord)
    }

    /// Total entry cost recorded by the search for the goal.
    #[must_use]
    pub const fn cost(&self) -> u64 {
        self.cost
    }
}

/// Capability to compute a path between two cells of a grid.
pub trait Pathfinder {
    /// Computes a path from `start` to `goal`.
    ///
    /// Returns an empty path when either endpoint is out of bounds or not
    /// walkable, or when no route exists. Returns a single-cell path when
    /// `start == goal`.
    fn find_path(&self, grid: &Grid, start: CellCoord, goal: CellCoord) -> Path;
}

/// Lower bound on the remaining cost between two coordinates.
///
/// Implementations must never overestimate the cheapest route, given that
/// every cell costs at least one to enter.
pub trait Heuristic {
    /// Estimated cost of travelling from `from` to `to`.
    fn estimate(&self, from: CellCoord, to: CellCoord) -> u64;
}

/// Manhattan distance, exact on an obstacle-free uniform-cost grid.
#[derive(Clone, Copy, Debug, Default)]
pub struct Manhattan;

impl Heuristic for Manhattan {
    fn estimate(&self, from: CellCoord, to: CellCoord) -> u64 {
        u64::from(from.manhattan_distance(to))
    }
}

/// A* search over 4-connected neighbors.
///
/// Among open nodes sharing the lowest `f` score the one inserted first is
/// expanded first, which makes the returned path identical across runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct AStar<H = Manhattan> {
    heuristic: H,
}

impl AStar<Manhattan> {
    /// Creates a search guided by Manhattan distance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            heuristic: Manhattan,
        }
    }
}

impl<H> AStar<H>
where
    H: Heuristic,
{
    /// Creates a search guided by the provided heuristic.
    #[must_use]
    pub const fn with_heuristic(heuristic: H) -> Self {
        Self { heuristic }
    }
}

impl<H> Pathfinder for AStar<H>
where
    H: Heuristic,
{
    fn find_path(&self, grid: &Grid, start: CellCoord, goal: CellCoord) -> Path {
        let (Some(start_index), Some(goal_index)) = (grid.index(start), grid.index(goal)) else {
            debug!(%start, %goal, "path request outside grid");
            return Path::empty();
        };
        let (Some(start_cell), Some(goal_cell)) =
            (grid.cell_at(start_index), grid.cell_at(goal_index))
        else {
            return Path::empty();
        };

        if !start_cell.is_walkable() || !goal_cell.is_walkable() {
            debug!(%start, %goal, "path endpoint is not walkable");
            return Path::empty();
        }

        if start_index == goal_index {
            return Path::new(vec![start_cell.clone()], 0);
        }

        let mut search = Search::new(grid.cells().len());
        search.open(start_index, 0, self.heuristic.estimate(start, goal));

        while let Some(entry) = search.pop() {
            if entry.g > search.g_scores[entry.index] {
                continue;
            }

            if entry.index == goal_index {
                let path = search.reconstruct(grid, goal_index);
                trace!(
                    %start,
                    %goal,
                    cost = path.cost(),
                    expanded = search.expanded,
                    "path found"
                );
                return path;
            }

            search.expanded += 1;
            let Some(current) = grid.cell_at(entry.index) else {
                continue;
            };

            for neighbor in grid.neighbors(current.coord()) {
                if !neighbor.is_walkable() {
                    continue;
                }
                let Some(neighbor_index) = grid.index(neighbor.coord()) else {
                    continue;
                };

                let tentative = entry.g.saturating_add(u64::from(neighbor.entry_cost()));
                if tentative < search.g_scores[neighbor_index] {
                    search.came_from[neighbor_index] = Some(entry.index);
                    let estimate = self.heuristic.estimate(neighbor.coord(), goal);
                    search.open(neighbor_index, tentative, estimate);
                }
            }
        }

        debug!(%start, %goal, expanded = search.expanded, "no route");
        Path::empty()
    }
}

/// Scratch state for a single search, indexed by grid storage index.
struct Search {
    g_scores: Vec<u64>,
    came_from: Vec<Option<usize>>,
    first_opened: Vec<Option<u64>>,
    open_set: BinaryHeap<OpenEntry>,
    inserted: u64,
    expanded: usize,
}

impl Search {
    fn new(cell_count: usize) -> Self {
        Self {
            g_scores: vec![u64::MAX; cell_count],
            came_from: vec![None; cell_count],
            first_opened: vec![None; cell_count],
            open_set: BinaryHeap::new(),
            inserted: 0,
            expanded: 0,
        }
    }

    /// Queues `index` with score `g`.
    ///
    /// A relaxed node keeps the sequence number of its first insertion, so it
    /// does not lose its place among equal `f` scores.
    fn open(&mut self, index: usize, g: u64, h: u64) {
        self.g_scores[index] = g;
        let sequence = match self.first_opened[index] {
            Some(sequence) => sequence,
            None => {
                let sequence = self.inserted;
                self.first_opened[index] = Some(sequence);
                self.inserted += 1;
                sequence
            }
        };
        self.open_set.push(OpenEntry {
            f: g.saturating_add(h),
            g,
            sequence,
            index,
        });
    }

    fn pop(&mut self) -> Option<OpenEntry> {
        self.open_set.pop()
    }

    fn reconstruct(&self, grid: &Grid, goal_index: usize) -> Path {
        let mut cells = Vec::new();
        let mut cursor = Some(goal_index);
        while let Some(index) = cursor {
            if let Some(cell) = grid.cell_at(index) {
                cells.push(cell.clone());
            }
            cursor = self.came_from[index];
        }
        cells.reverse();
        Path::new(cells, self.g_scores[goal_index])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenEntry {
    f: u64,
    g: u64,
    sequence: u64,
    index: usize,
}

impl Ord for OpenEntry {
    // Reversed so the max-heap yields the lowest f, then the earliest insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.sequence.cmp(&self.sequence))
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tactical_grid_core::{GridConfiguration, TerrainKind, TerrainPalette};

    fn grid_from_rows(rows: &[&str]) -> Grid {
        let palette = TerrainPalette::new(vec![
            TerrainKind::new("plain", true, 1),
            TerrainKind::new("wall", false, 1),
            TerrainKind::new("swamp", true, 5),
        ]);
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len()) as u32;
        Grid::build_with(
            GridConfiguration::new(width, height, 1.0, true),
            &palette,
            |coord| {
                // Row zero of the sketch is the top of the grid (highest y).
                let row = rows[rows.len() - 1 - coord.y() as usize].as_bytes();
                match row[coord.x() as usize] {
                    b'#' => 1,
                    b'~' => 2,
                    _ => 0,
                }
            },
        )
        .expect("valid sketch")
    }

    #[test]
    fn open_entries_prefer_lowest_f_then_earliest_insertion() {
        let entry = |f, sequence, index| OpenEntry {
            f,
            g: 0,
            sequence,
            index,
        };
        let mut heap = BinaryHeap::new();
        heap.push(entry(4, 2, 2));
        heap.push(entry(3, 1, 1));
        heap.push(entry(3, 0, 0));

        let order: Vec<usize> =
            std::iter::from_fn(|| heap.pop().map(|entry| entry.index)).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn relaxed_node_keeps_first_insertion_order() {
        let mut search = Search::new(4);
        search.open(3, 9, 0);
        search.open(1, 5, 0);
        search.open(2, 5, 0);
        search.open(3, 5, 0);

        let order: Vec<(usize, u64)> = std::iter::from_fn(|| search.pop())
            .map(|entry| (entry.index, entry.sequence))
            .collect();
        assert_eq!(
            order,
            vec![(3, 0), (1, 1), (2, 2), (3, 0)],
            "the relaxed entry ranks by its first insertion, the stale one comes last"
        );
    }

    #[test]
    fn single_cell_path_when_start_equals_goal() {
        let grid = grid_from_rows(&["...", "...", "..."]);
        let path = AStar::new().find_path(&grid, CellCoord::new(1, 1), CellCoord::new(1, 1));

        assert_eq!(path.coords().collect::<Vec<_>>(), vec![CellCoord::new(1, 1)]);
        assert_eq!(path.cost(), 0);
    }

    #[test]
    fn unwalkable_endpoints_yield_empty_path() {
        let grid = grid_from_rows(&["..#", "...", "#.."]);
        let search = AStar::new();

        assert!(search
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(2, 2))
            .is_empty());
        assert!(search
            .find_path(&grid, CellCoord::new(1, 1), CellCoord::new(2, 2))
            .is_empty());
        assert!(search
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(0, 0))
            .is_empty());
    }

    #[test]
    fn out_of_bounds_endpoints_yield_empty_path() {
        let grid = grid_from_rows(&["...", "..."]);
        let search = AStar::new();

        assert!(search
            .find_path(&grid, CellCoord::new(-1, 0), CellCoord::new(1, 1))
            .is_empty());
        assert!(search
            .find_path(&grid, CellCoord::new(0, 0), CellCoord::new(3, 0))
            .is_empty());
    }

    #[test]
    fn route_detours_around_expensive_terrain() {
        let grid = grid_from_rows(&[
            ".....", //
            ".~~~.", //
            ".....",
        ]);
        let path = AStar::new().find_path(&grid, CellCoord::new(0, 1), CellCoord::new(4, 1));

        assert_eq!(path.cost(), 6, "walking around the swamp costs six entries");
        assert!(path
            .cells()
            .iter()
            .all(|cell| cell.terrain().name() != "swamp"));
    }

    #[test]
    fn equal_cost_routes_resolve_identically() {
        let grid = grid_from_rows(&["....", "....", "....", "...."]);
        let search = AStar::new();
        let first = search.find_path(&grid, CellCoord::new(0, 0), CellCoord::new(3, 3));
        let second = search.find_path(&grid, CellCoord::new(0, 0), CellCoord::new(3, 3));

        assert_eq!(first, second);
    }

    #[test]
    fn custom_heuristic_can_be_substituted() {
        #[derive(Clone, Copy)]
        struct Blind;

        impl Heuristic for Blind {
            fn estimate(&self, _from: CellCoord, _to: CellCoord) -> u64 {
                0
            }
        }

        let grid = grid_from_rows(&["..#..", "..#..", "....."]);
        let guided = AStar::new().find_path(&grid, CellCoord::new(0, 2), CellCoord::new(4, 2));
        let blind = AStar::with_heuristic(Blind).find_path(
            &grid,
            CellCoord::new(0, 2),
            CellCoord::new(4, 2),
        );

        assert_eq!(guided.cost(), blind.cost());
        assert_eq!(guided.cost(), 8);
    }
}
