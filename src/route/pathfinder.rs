// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Bounded four-direction A* over the obstacle grid.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::obstacles::{CellBounds, ObstacleIndex};
use crate::grid::GridCell;
use crate::model::Point;

/// Free cells kept around the obstacles and endpoints so detours can leave the box.
const SEARCH_MARGIN: i32 = 2;
/// Margin used when the obstacle extent would make the search area too large.
const NARROW_MARGIN: i32 = 8;
const MAX_SEARCH_CELLS: usize = 1 << 22;
const NO_DIR: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found,
    /// Start and goal share a cell.
    Trivial,
    /// The iteration cap was reached.
    Exhausted,
    /// The open set ran dry, or the area was too large to search.
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSearch {
    /// Corner points on cell centers, start and goal included.
    pub points: Vec<Point>,
    pub outcome: SearchOutcome,
    pub iterations: usize,
}

impl PathSearch {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Found | SearchOutcome::Trivial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RoutingGrid {
    min_x: i32,
    min_y: i32,
    width: usize,
    height: usize,
}

impl RoutingGrid {
    fn new(bounds: CellBounds) -> Self {
        let width = (i64::from(bounds.max.x) - i64::from(bounds.min.x) + 1) as usize;
        let height = (i64::from(bounds.max.y) - i64::from(bounds.min.y) + 1) as usize;
        Self { min_x: bounds.min.x, min_y: bounds.min.y, width, height }
    }

    fn len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }

    fn idx_of(&self, cell: GridCell) -> Option<usize> {
        let x = i64::from(cell.x) - i64::from(self.min_x);
        let y = i64::from(cell.y) - i64::from(self.min_y);
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }

    fn cell_of(&self, idx: usize) -> GridCell {
        let x = (idx % self.width) as i32 + self.min_x;
        let y = (idx / self.width) as i32 + self.min_y;
        GridCell::new(x, y)
    }
}

/// Reusable buffers for repeated searches on one thread.
///
/// Visit state and the blocked mask are generation-stamped so a new search does not
/// clear the arrays.
#[derive(Debug, Default)]
pub struct SearchScratch {
    grid: Option<RoutingGrid>,
    blocked: Vec<u32>,
    blocked_gen: u32,
    gen: u32,
    dist_gen: Vec<u32>,
    dist_cost: Vec<u32>,
    came_from: Vec<i32>,
    came_dir: Vec<u8>,
    turns: Vec<u32>,
    heap: BinaryHeap<Reverse<(u32, u32, u32)>>,
    path: Vec<GridCell>,
}

impl SearchScratch {
    fn configure(&mut self, grid: RoutingGrid, len: usize, index: &ObstacleIndex) {
        if self.grid != Some(grid) {
            self.grid = Some(grid);
            self.blocked = vec![0; len];
            self.blocked_gen = 0;
            self.dist_gen = vec![0; len];
            self.dist_cost = vec![0; len];
            self.came_from = vec![-1; len];
            self.came_dir = vec![NO_DIR; len];
            self.turns = vec![0; len];
        }
        self.blocked_gen = self.blocked_gen.wrapping_add(1);
        if self.blocked_gen == 0 {
            self.blocked.fill(0);
            self.blocked_gen = 1;
        }
        // Walk the marked cells, not the grid: the grid may span the whole diagram.
        for cell in index.marked_cells() {
            if let Some(idx) = grid.idx_of(cell) {
                self.blocked[idx] = self.blocked_gen;
            }
        }
    }

    fn is_blocked(&self, idx: usize) -> bool {
        self.blocked[idx] == self.blocked_gen
    }

    fn begin(&mut self) -> u32 {
        self.gen = self.gen.wrapping_add(1);
        if self.gen == 0 {
            self.dist_gen.fill(0);
            self.gen = 1;
        }
        self.heap.clear();
        self.path.clear();
        self.gen
    }

    fn dist(&self, idx: usize, gen: u32) -> u32 {
        if self.dist_gen[idx] == gen {
            self.dist_cost[idx]
        } else {
            u32::MAX
        }
    }

    fn set_dist(&mut self, idx: usize, gen: u32, cost: u32, came_from: i32, dir: u8, turns: u32) {
        self.dist_gen[idx] = gen;
        self.dist_cost[idx] = cost;
        self.set_parent(idx, came_from, dir, turns);
    }

    fn set_parent(&mut self, idx: usize, came_from: i32, dir: u8, turns: u32) {
        self.came_from[idx] = came_from;
        self.came_dir[idx] = dir;
        self.turns[idx] = turns;
    }
}

/// Neighbor order: moves that close the distance to `goal` first, then vertical
/// detours, then moving horizontally away.
fn neighbor_deltas_towards(current: GridCell, goal: GridCell) -> [(i32, i32); 4] {
    let primary_x = match goal.x.cmp(&current.x) {
        std::cmp::Ordering::Greater => Some((1, 0)),
        std::cmp::Ordering::Less => Some((-1, 0)),
        std::cmp::Ordering::Equal => None,
    };
    let primary_y = match goal.y.cmp(&current.y) {
        std::cmp::Ordering::Greater => Some((0, 1)),
        std::cmp::Ordering::Less => Some((0, -1)),
        std::cmp::Ordering::Equal => None,
    };

    let mut out = [(0, 0); 4];
    let mut idx = 0usize;
    for delta in primary_x.into_iter().chain(primary_y) {
        out[idx] = delta;
        idx += 1;
    }
    for delta in [(0, 1), (0, -1), (1, 0), (-1, 0)] {
        if primary_x == Some(delta) || primary_y == Some(delta) {
            continue;
        }
        out[idx] = delta;
        idx += 1;
    }
    debug_assert_eq!(idx, 4);
    out
}

fn direction_code(delta: (i32, i32)) -> u8 {
    match delta {
        (1, 0) => 0,
        (-1, 0) => 1,
        (0, 1) => 2,
        _ => 3,
    }
}

/// Drops cells where the path keeps going the same way.
fn compress_to_polyline(path: &[GridCell]) -> Vec<GridCell> {
    if path.len() <= 2 {
        return path.to_vec();
    }
    let mut points = vec![path[0]];
    let mut prev_dir = (path[1].x - path[0].x, path[1].y - path[0].y);
    for idx in 1..path.len() - 1 {
        let dir = (path[idx + 1].x - path[idx].x, path[idx + 1].y - path[idx].y);
        if dir != prev_dir {
            points.push(path[idx]);
            prev_dir = dir;
        }
    }
    points.push(path[path.len() - 1]);
    points
}

/// Horizontal-first L between the two cells.
fn fallback_polyline(start: GridCell, goal: GridCell) -> Vec<GridCell> {
    if start == goal {
        return vec![start];
    }
    if start.x == goal.x || start.y == goal.y {
        return vec![start, goal];
    }
    vec![start, GridCell::new(goal.x, start.y), goal]
}

fn search_bounds(start: GridCell, goal: GridCell, index: &ObstacleIndex) -> Option<(RoutingGrid, usize)> {
    let mut endpoints = CellBounds { min: start, max: start };
    endpoints.include(goal);

    let mut wide = endpoints;
    if let Some(extent) = index.extent() {
        wide.include(extent.min);
        wide.include(extent.max);
    }

    for (bounds, margin) in [(wide, SEARCH_MARGIN), (endpoints, NARROW_MARGIN)] {
        let bounds = CellBounds {
            min: bounds.min.offset(-margin, -margin),
            max: bounds.max.offset(margin, margin),
        };
        let grid = RoutingGrid::new(bounds);
        if let Some(len) = grid.len().filter(|&len| len <= MAX_SEARCH_CELLS) {
            return Some((grid, len));
        }
    }
    None
}

/// Shortest 4-connected path between two points, measured in grid steps.
///
/// Start and goal cells are always passable. Ties in estimated cost expand in
/// insertion order, and among equally short paths the one with fewer turns is
/// preferred. After `max_iterations` expansions, or when no path exists, the
/// result is the horizontal-first L between the two cells.
pub fn find_path(start: Point, end: Point, index: &ObstacleIndex, max_iterations: usize) -> PathSearch {
    find_path_with(start, end, index, max_iterations, &mut SearchScratch::default())
}

pub fn find_path_with(
    start: Point,
    end: Point,
    index: &ObstacleIndex,
    max_iterations: usize,
    scratch: &mut SearchScratch,
) -> PathSearch {
    let grid_size = index.grid_size();
    let start_cell = GridCell::of(start, grid_size);
    let goal_cell = GridCell::of(end, grid_size);
    let to_points = |cells: &[GridCell]| cells.iter().map(|c| c.center(grid_size)).collect::<Vec<_>>();

    if start_cell == goal_cell {
        return PathSearch { points: to_points(&[start_cell]), outcome: SearchOutcome::Trivial, iterations: 0 };
    }

    let give_up = |outcome: SearchOutcome, iterations: usize| PathSearch {
        points: to_points(&fallback_polyline(start_cell, goal_cell)),
        outcome,
        iterations,
    };

    let Some((grid, len)) = search_bounds(start_cell, goal_cell, index) else {
        return give_up(SearchOutcome::Unreachable, 0);
    };
    scratch.configure(grid, len, index);
    let (Some(start_idx), Some(goal_idx)) = (grid.idx_of(start_cell), grid.idx_of(goal_cell)) else {
        return give_up(SearchOutcome::Unreachable, 0);
    };

    let gen = scratch.begin();
    let heuristic = |cell: GridCell| cell.manhattan_to(goal_cell);
    scratch.set_dist(start_idx, gen, 0, -1, NO_DIR, 0);
    let mut seq = 0u32;
    scratch.heap.push(Reverse((heuristic(start_cell), seq, start_idx as u32)));

    let mut iterations = 0usize;
    while let Some(Reverse((f, _, current_idx))) = scratch.heap.pop() {
        if iterations >= max_iterations {
            return give_up(SearchOutcome::Exhausted, iterations);
        }
        iterations += 1;

        let current_idx = current_idx as usize;
        let current = grid.cell_of(current_idx);
        let g = scratch.dist(current_idx, gen);
        if g.saturating_add(heuristic(current)) < f {
            continue;
        }

        if current_idx == goal_idx {
            let mut cursor = goal_idx;
            scratch.path.push(goal_cell);
            while cursor != start_idx {
                let prev = scratch.came_from[cursor];
                if prev < 0 {
                    return give_up(SearchOutcome::Unreachable, iterations);
                }
                cursor = prev as usize;
                scratch.path.push(grid.cell_of(cursor));
            }
            scratch.path.reverse();
            let corners = compress_to_polyline(&scratch.path);
            return PathSearch { points: to_points(&corners), outcome: SearchOutcome::Found, iterations };
        }

        let current_dir = scratch.came_dir[current_idx];
        let current_turns = scratch.turns[current_idx];
        for delta in neighbor_deltas_towards(current, goal_cell) {
            let next = current.offset(delta.0, delta.1);
            let Some(next_idx) = grid.idx_of(next) else {
                continue;
            };
            if next_idx != goal_idx && scratch.is_blocked(next_idx) {
                continue;
            }
            let dir = direction_code(delta);
            let turns = current_turns + u32::from(current_dir != NO_DIR && current_dir != dir);
            let next_g = g + 1;
            let known = scratch.dist(next_idx, gen);
            if next_g < known {
                scratch.set_dist(next_idx, gen, next_g, current_idx as i32, dir, turns);
                seq += 1;
                scratch.heap.push(Reverse((next_g.saturating_add(heuristic(next)), seq, next_idx as u32)));
            } else if next_g == known && turns < scratch.turns[next_idx] {
                scratch.set_parent(next_idx, current_idx as i32, dir, turns);
            }
        }
    }

    give_up(SearchOutcome::Unreachable, iterations)
}
