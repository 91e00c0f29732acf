// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Grid-cell occupancy built from one diagram snapshot.

use std::collections::HashMap;

use smallvec::SmallVec;

use super::pattern::resolve_anchors;
use crate::grid::{enforce_orthogonal, GridCell};
use crate::model::{Axis, DiagramSnapshot, EdgeId, NodeId, Point, Rect};

/// Channel scans covering more cells than this give up and report no channel.
const MAX_CHANNEL_CELLS: i64 = 1 << 22;

/// What put a cell off limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObstacleOwner {
    Node(NodeId),
    Edge(EdgeId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleParams {
    pub grid_size: f64,
    pub node_margin: f64,
    pub edge_margin: f64,
}

/// Inclusive cell rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub min: GridCell,
    pub max: GridCell,
}

impl CellBounds {
    fn single(cell: GridCell) -> Self {
        Self { min: cell, max: cell }
    }

    pub fn include(&mut self, cell: GridCell) {
        self.min.x = self.min.x.min(cell.x);
        self.min.y = self.min.y.min(cell.y);
        self.max.x = self.max.x.max(cell.x);
        self.max.y = self.max.y.max(cell.y);
    }
}

/// Cells of the routing grid occupied by node boxes and existing edge paths.
///
/// Each cell remembers its owners so a single index can serve several queries that
/// ignore different obstacles.
#[derive(Debug, Clone)]
pub struct ObstacleIndex {
    grid_size: f64,
    cells: HashMap<GridCell, SmallVec<[ObstacleOwner; 2]>>,
    extent: Option<CellBounds>,
}

impl ObstacleIndex {
    pub fn empty(grid_size: f64) -> Self {
        Self { grid_size, cells: HashMap::new(), extent: None }
    }

    /// Marks every node box (grown by the node margin) and every edge path (grown by the
    /// edge margin), skipping the given ids and degenerate boxes.
    pub fn build(
        snapshot: &DiagramSnapshot,
        params: ObstacleParams,
        exclude_nodes: &[NodeId],
        exclude_edges: &[EdgeId],
    ) -> Self {
        let mut index = Self::empty(params.grid_size);

        for (id, node) in snapshot.nodes() {
            if exclude_nodes.contains(id) {
                continue;
            }
            let bounds = node.bounds();
            if bounds.is_degenerate() {
                continue;
            }
            index.mark_rect(&bounds.expand(params.node_margin), ObstacleOwner::Node(id.clone()));
        }

        for (id, edge) in snapshot.edges() {
            if exclude_edges.contains(id) {
                continue;
            }
            let (Some(source), Some(target)) = (snapshot.node(&edge.source), snapshot.node(&edge.target))
            else {
                continue;
            };
            let (source_bounds, target_bounds) = (source.bounds(), target.bounds());
            if source_bounds.is_degenerate() || target_bounds.is_degenerate() {
                continue;
            }
            let (from, to) =
                resolve_anchors(&source_bounds, &target_bounds, edge.source_anchor, edge.target_anchor);
            let mut chain = Vec::with_capacity(edge.waypoints.len() + 2);
            chain.push(from.point);
            chain.extend(edge.waypoints.iter().copied());
            chain.push(to.point);
            let chain = enforce_orthogonal(&chain);
            let owner = ObstacleOwner::Edge(id.clone());
            for pair in chain.windows(2) {
                index.mark_segment(pair[0], pair[1], params.edge_margin, &owner);
            }
        }

        index
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Every cell with at least one owner, in no particular order.
    pub(crate) fn marked_cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.cells.keys().copied()
    }

    /// Smallest cell rectangle containing every marked cell.
    pub fn extent(&self) -> Option<CellBounds> {
        self.extent
    }

    pub fn is_cell_blocked(&self, cell: GridCell, exclude: &[ObstacleOwner]) -> bool {
        self.cells
            .get(&cell)
            .is_some_and(|owners| owners.iter().any(|owner| !exclude.contains(owner)))
    }

    pub fn is_blocked(&self, point: Point, exclude: &[ObstacleOwner]) -> bool {
        self.is_cell_blocked(GridCell::of(point, self.grid_size), exclude)
    }

    /// Samples the segment at grid stride; both ends included.
    pub fn segment_collides(&self, from: Point, to: Point, exclude: &[ObstacleOwner]) -> bool {
        sample_segment(from, to, self.grid_size).any(|p| self.is_blocked(p, exclude))
    }

    pub fn path_collides(&self, points: &[Point], exclude: &[ObstacleOwner]) -> bool {
        points.windows(2).any(|pair| self.segment_collides(pair[0], pair[1], exclude))
    }

    /// Free grid lines crossing the box spanned by `a` and `b`.
    ///
    /// `Axis::Vertical` yields x positions whose whole column between `a.y` and `b.y` is
    /// free, `Axis::Horizontal` yields y positions of free rows between `a.x` and `b.x`.
    /// Lines nearest the middle of the span come first.
    pub fn clear_channels(&self, axis: Axis, a: Point, b: Point, exclude: &[ObstacleOwner]) -> Vec<f64> {
        let ca = GridCell::of(a, self.grid_size);
        let cb = GridCell::of(b, self.grid_size);
        let (lines, across) = match axis {
            Axis::Vertical => ((ca.x.min(cb.x), ca.x.max(cb.x)), (ca.y.min(cb.y), ca.y.max(cb.y))),
            Axis::Horizontal => ((ca.y.min(cb.y), ca.y.max(cb.y)), (ca.x.min(cb.x), ca.x.max(cb.x))),
        };
        let span = |(lo, hi): (i32, i32)| i64::from(hi) - i64::from(lo) + 1;
        if span(lines).saturating_mul(span(across)) > MAX_CHANNEL_CELLS {
            return Vec::new();
        }

        let mut free = (lines.0..=lines.1)
            .filter(|&line| {
                (across.0..=across.1).all(|step| {
                    let cell = match axis {
                        Axis::Vertical => GridCell::new(line, step),
                        Axis::Horizontal => GridCell::new(step, line),
                    };
                    !self.is_cell_blocked(cell, exclude)
                })
            })
            .collect::<Vec<_>>();

        let middle = i64::from(lines.0) + i64::from(lines.1);
        free.sort_by_key(|&line| ((2 * i64::from(line) - middle).abs(), line));
        free.into_iter().map(|line| f64::from(line) * self.grid_size).collect()
    }

    fn mark(&mut self, cell: GridCell, owner: &ObstacleOwner) {
        let owners = self.cells.entry(cell).or_default();
        if !owners.contains(owner) {
            owners.push(owner.clone());
        }
        match self.extent.as_mut() {
            Some(extent) => extent.include(cell),
            None => self.extent = Some(CellBounds::single(cell)),
        }
    }

    /// Marks every cell whose square overlaps `rect`, so boxes smaller than a cell still
    /// occupy at least one.
    fn mark_rect(&mut self, rect: &Rect, owner: ObstacleOwner) {
        let (x0, x1) = overlapping_cells(rect.left(), rect.right(), self.grid_size);
        let (y0, y1) = overlapping_cells(rect.top(), rect.bottom(), self.grid_size);
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.mark(GridCell::new(x, y), &owner);
            }
        }
    }

    fn mark_segment(&mut self, from: Point, to: Point, margin: f64, owner: &ObstacleOwner) {
        let reach = (margin / self.grid_size).floor() as i32;
        let samples = sample_segment(from, to, self.grid_size).collect::<Vec<_>>();
        for p in samples {
            let center = GridCell::of(p, self.grid_size);
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    self.mark(center.offset(dx, dy), owner);
                }
            }
        }
    }
}

fn overlapping_cells(low: f64, high: f64, grid_size: f64) -> (i32, i32) {
    let half = grid_size / 2.0;
    let first = (((low - half) / grid_size).floor() as i32).saturating_add(1);
    let last = (((high + half) / grid_size).ceil() as i32).saturating_sub(1);
    (first, last.max(first))
}

fn sample_segment(from: Point, to: Point, stride: f64) -> impl Iterator<Item = Point> {
    let length = from.distance_to(to);
    let steps = if length <= 0.0 { 0 } else { (length / stride).ceil() as usize };
    (0..=steps).map(move |i| {
        if steps == 0 {
            return from;
        }
        let t = i as f64 / steps as f64;
        Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
    })
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::{ObstacleIndex, ObstacleOwner, ObstacleParams};
    use crate::grid::GridCell;
    use crate::model::fixtures::{blocked_pair, edge, eid, nid, node};
    use crate::model::{Axis, DiagramSnapshot, Point, WaypointMode};

    #[fixture]
    fn params() -> ObstacleParams {
        ObstacleParams { grid_size: 20.0, node_margin: 10.0, edge_margin: 5.0 }
    }

    #[rstest]
    fn node_box_blocks_interior_not_outside(params: ObstacleParams) {
        let index = ObstacleIndex::build(&blocked_pair(), params, &[], &[]);
        assert!(index.is_blocked(Point::new(220.0, 40.0), &[]));
        assert!(index.is_blocked(Point::new(200.0, -20.0), &[]));
        assert!(!index.is_blocked(Point::new(180.0, 40.0), &[]));
        assert!(!index.is_blocked(Point::new(280.0, 40.0), &[]));
    }

    #[rstest]
    fn excluded_owners_are_ignored(params: ObstacleParams) {
        let index = ObstacleIndex::build(&blocked_pair(), params, &[nid("a")], &[]);
        assert!(!index.is_blocked(Point::new(40.0, 20.0), &[]));
        let c = ObstacleOwner::Node(nid("c"));
        assert!(!index.is_blocked(Point::new(220.0, 40.0), &[c]));
    }

    #[rstest]
    fn tiny_nodes_still_occupy_a_cell(params: ObstacleParams) {
        let snapshot = DiagramSnapshot::new([node("dot", 3.0, 3.0, 2.0, 2.0)], []);
        let params = ObstacleParams { node_margin: 0.0, ..params };
        let index = ObstacleIndex::build(&snapshot, params, &[], &[]);
        assert_eq!(index.len(), 1);
        assert!(index.is_cell_blocked(GridCell::new(0, 0), &[]));
    }

    #[rstest]
    fn degenerate_nodes_are_skipped(params: ObstacleParams) {
        let snapshot = DiagramSnapshot::new([node("flat", 0.0, 0.0, 0.0, 40.0)], []);
        assert!(ObstacleIndex::build(&snapshot, params, &[], &[]).is_empty());
    }

    #[rstest]
    fn edges_block_along_their_waypoints(params: ObstacleParams) {
        let routed = edge("e:xy", "x", "y")
            .with_waypoints(vec![Point::new(140.0, 30.0), Point::new(140.0, 230.0)], WaypointMode::Auto);
        let snapshot = DiagramSnapshot::new(
            [node("x", 0.0, 0.0, 100.0, 60.0), node("y", 180.0, 200.0, 100.0, 60.0)],
            [routed],
        );
        let index = ObstacleIndex::build(&snapshot, params, &[nid("x"), nid("y")], &[]);
        assert!(index.is_blocked(Point::new(140.0, 120.0), &[]));
        assert!(!index.is_blocked(Point::new(140.0, 120.0), &[ObstacleOwner::Edge(eid("e:xy"))]));
        let without = ObstacleIndex::build(&snapshot, params, &[nid("x"), nid("y")], &[eid("e:xy")]);
        assert!(without.is_empty());
    }

    #[rstest]
    fn segment_collision_samples_the_whole_run(params: ObstacleParams) {
        let index = ObstacleIndex::build(&blocked_pair(), params, &[nid("a"), nid("b")], &[]);
        assert!(index.segment_collides(Point::new(120.0, 30.0), Point::new(380.0, 30.0), &[]));
        assert!(!index.segment_collides(Point::new(120.0, 120.0), Point::new(380.0, 120.0), &[]));
    }

    #[rstest]
    fn channels_skip_blocked_columns_and_start_central(params: ObstacleParams) {
        let index = ObstacleIndex::build(&blocked_pair(), params, &[nid("a"), nid("b")], &[]);
        let columns =
            index.clear_channels(Axis::Vertical, Point::new(120.0, 40.0), Point::new(380.0, 40.0), &[]);
        assert!(!columns.is_empty());
        assert!(columns.iter().all(|&x| !(200.0..=260.0).contains(&x)));
        assert_eq!(columns[0], 280.0);
        assert_eq!(columns[1], 300.0);
    }

    #[rstest]
    fn far_nodes_clamp_to_the_edge_of_the_cell_space(params: ObstacleParams) {
        let far = DiagramSnapshot::new([node("far", 5e10, 0.0, 100.0, 60.0)], []);
        let index = ObstacleIndex::build(&far, params, &[], &[]);
        assert!(index.is_blocked(Point::new(5e10 + 50.0, 20.0), &[]));
        assert!(index.clear_channels(Axis::Vertical, Point::new(0.0, 0.0), Point::new(5e10, 0.0), &[]).is_empty());
    }
}
