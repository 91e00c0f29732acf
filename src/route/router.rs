// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Single-edge routing pipeline: pattern, channel, grid search, clean-up.

use std::sync::Arc;

use super::obstacles::{ObstacleIndex, ObstacleOwner, ObstacleParams};
use super::optimizer::{find_intersections, limit_waypoints, remove_redundant, segment_midpoints};
use super::pathfinder::{find_path_with, SearchOutcome, SearchScratch};
use super::pattern::{
    build_pattern, classify_direction, resolve_anchors, s_corners, select_pattern, z_corners, Anchor,
    Octant, PatternKind,
};
use super::result::{Degraded, Operation, RouteResult, RouteStrategy, Routed, RoutingWarning};
use crate::config::{PatternSplit, RoutingOptions};
use crate::grid::enforce_orthogonal;
use crate::model::{Axis, DiagramSnapshot, Edge, EdgeId, NodeId, Point, EPSILON};

/// Clear channels tried before falling back to grid search.
const MAX_CHANNEL_CANDIDATES: usize = 16;

/// The subset of [`RoutingOptions`] a routing computation reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSettings {
    pub jetty_size: f64,
    pub max_iterations: usize,
    pub max_waypoints: usize,
    pub split: PatternSplit,
    pub virtual_bends: bool,
    pub intersections: bool,
}

impl From<&RoutingOptions> for RouteSettings {
    fn from(options: &RoutingOptions) -> Self {
        Self {
            jetty_size: options.jetty_size,
            max_iterations: options.max_iterations,
            max_waypoints: options.max_waypoints,
            split: options.pattern_split,
            virtual_bends: options.enable_virtual_bends,
            intersections: options.enable_intersection_detection,
        }
    }
}

/// Everything needed to route one edge, detached from the diagram it came from.
#[derive(Debug, Clone)]
pub struct RouteJob {
    pub edge_id: EdgeId,
    pub operation: Operation,
    pub source: NodeId,
    pub target: NodeId,
    pub source_anchor: Anchor,
    pub target_anchor: Anchor,
    /// The edge's current waypoints.
    pub waypoints: Vec<Point>,
    pub pinned: bool,
    pub index: Arc<ObstacleIndex>,
    /// Current geometry of the other edges; only filled for crossing detection.
    pub others: Arc<Vec<Vec<Point>>>,
    pub settings: RouteSettings,
}

impl RouteJob {
    /// Resolves anchors and builds the obstacle index for `edge`.
    ///
    /// The index leaves out the edge itself, edges sharing an endpoint with it and the
    /// containers of either endpoint. Missing or empty endpoint boxes yield a degenerate
    /// route instead of a job.
    pub fn prepare(
        snapshot: &DiagramSnapshot,
        edge: &Edge,
        operation: Operation,
        options: &RoutingOptions,
    ) -> Result<Self, Degraded> {
        let source = snapshot.node(&edge.source);
        let target = snapshot.node(&edge.target);
        let (source, target) = match (source, target) {
            (Some(source), Some(target)) => (source, target),
            (source, target) => {
                let at = source.or(target).map(|node| node.bounds().center()).unwrap_or_default();
                let missing = if source.is_none() { &edge.source } else { &edge.target };
                return Err(degenerate(&edge.id, at, format!("node {missing} does not exist")));
            }
        };
        let (source_bounds, target_bounds) = (source.bounds(), target.bounds());
        if source_bounds.is_degenerate() || target_bounds.is_degenerate() {
            let at = source.position;
            return Err(degenerate(&edge.id, at, "endpoint box has no area".to_owned()));
        }

        let (source_anchor, target_anchor) =
            resolve_anchors(&source_bounds, &target_bounds, edge.source_anchor, edge.target_anchor);

        let mut exclude_nodes = snapshot.with_ancestors(&edge.source).split_off(1);
        exclude_nodes.extend(snapshot.with_ancestors(&edge.target).into_iter().skip(1));
        let exclude_edges = snapshot
            .edges()
            .values()
            .filter(|other| {
                other.id == edge.id
                    || other.source == edge.source
                    || other.source == edge.target
                    || other.target == edge.source
                    || other.target == edge.target
            })
            .map(|other| other.id.clone())
            .collect::<Vec<_>>();
        let params = ObstacleParams {
            grid_size: options.grid_size,
            node_margin: options.node_margin,
            edge_margin: options.edge_margin,
        };
        let index = ObstacleIndex::build(snapshot, params, &exclude_nodes, &exclude_edges);

        let others = if operation == Operation::Intersections && options.enable_intersection_detection {
            other_geometry(snapshot, &edge.id)
        } else {
            Vec::new()
        };

        Ok(Self {
            edge_id: edge.id.clone(),
            operation,
            source: edge.source.clone(),
            target: edge.target.clone(),
            source_anchor,
            target_anchor,
            waypoints: edge.waypoints.clone(),
            pinned: edge.is_pinned(),
            index: Arc::new(index),
            others: Arc::new(others),
            settings: RouteSettings::from(options),
        })
    }

    fn endpoints_exclusion(&self) -> [ObstacleOwner; 2] {
        [ObstacleOwner::Node(self.source.clone()), ObstacleOwner::Node(self.target.clone())]
    }

    fn collides(&self, points: &[Point]) -> bool {
        self.index.path_collides(points, &self.endpoints_exclusion())
    }

    fn jetties(&self) -> (Point, Point) {
        (self.source_anchor.jetty(self.settings.jetty_size), self.target_anchor.jetty(self.settings.jetty_size))
    }

    fn pattern(&self) -> PatternKind {
        select_pattern(
            Octant::of_side(self.source_anchor.side),
            classify_direction(self.source_anchor.point, self.target_anchor.point),
        )
    }

    /// Anchor, jetty, `middle`, jetty, anchor; made orthogonal and cleaned.
    fn assemble(&self, middle: &[Point]) -> Vec<Point> {
        let (source_jetty, target_jetty) = self.jetties();
        let mut raw = Vec::with_capacity(middle.len() + 4);
        raw.push(self.source_anchor.point);
        raw.push(source_jetty);
        raw.extend_from_slice(middle);
        raw.push(target_jetty);
        raw.push(self.target_anchor.point);
        remove_redundant(&enforce_orthogonal(&raw))
    }

    fn with_own_waypoints(&self) -> Vec<Point> {
        let mut raw = Vec::with_capacity(self.waypoints.len() + 2);
        raw.push(self.source_anchor.point);
        raw.extend_from_slice(&self.waypoints);
        raw.push(self.target_anchor.point);
        enforce_orthogonal(&raw)
    }

    /// Virtual bends and crossings for the operations that ask for them.
    fn decorate(&self, mut result: RouteResult) -> RouteResult {
        match self.operation {
            Operation::VirtualBends if self.settings.virtual_bends => {
                result.virtual_bends = segment_midpoints(&result.points);
            }
            Operation::Intersections if self.settings.intersections => {
                result.intersections =
                    find_intersections(&result.points, self.others.iter().map(Vec::as_slice));
            }
            _ => {}
        }
        result
    }

    /// Caps the waypoint count unless that would run the path into an obstacle.
    fn finish(&self, points: Vec<Point>, strategy: RouteStrategy) -> RouteResult {
        let limited = limit_waypoints(&points, self.settings.max_waypoints);
        let points = if limited.len() < points.len() && !self.collides(&limited) { limited } else { points };
        self.decorate(RouteResult::new(points, strategy))
    }
}

fn degenerate(edge_id: &EdgeId, at: Point, reason: String) -> Degraded {
    Degraded {
        fallback: RouteResult::degenerate(at),
        warning: RoutingWarning::InputDegenerate { edge_id: edge_id.clone(), reason },
    }
}

/// Current polyline of every edge except `skip`, in id order.
pub(crate) fn other_geometry(snapshot: &DiagramSnapshot, skip: &EdgeId) -> Vec<Vec<Point>> {
    snapshot
        .edges()
        .values()
        .filter(|edge| &edge.id != skip)
        .filter_map(|edge| {
            let source = snapshot.node(&edge.source)?.bounds();
            let target = snapshot.node(&edge.target)?.bounds();
            if source.is_degenerate() || target.is_degenerate() {
                return None;
            }
            let (from, to) = resolve_anchors(&source, &target, edge.source_anchor, edge.target_anchor);
            let mut chain = vec![from.point];
            chain.extend_from_slice(&edge.waypoints);
            chain.push(to.point);
            Some(enforce_orthogonal(&chain))
        })
        .collect()
}

fn coincident_anchors(job: &RouteJob) -> Option<Degraded> {
    job.source_anchor.point.approx_eq(job.target_anchor.point, EPSILON).then(|| {
        degenerate(&job.edge_id, job.source_anchor.point, "source and target anchors coincide".to_owned())
    })
}

fn pinned_route(job: &RouteJob) -> RouteResult {
    job.decorate(RouteResult::new(job.with_own_waypoints(), RouteStrategy::Pinned))
}

/// Tries to move the middle run of a blocked pattern into a free grid line.
fn channel_route(job: &RouteJob, pattern: PatternKind) -> Option<Vec<Point>> {
    let (source_jetty, target_jetty) = job.jetties();
    let dx = (target_jetty.x - source_jetty.x).abs();
    let dy = (target_jetty.y - source_jetty.y).abs();
    if dx <= EPSILON || dy <= EPSILON {
        return None;
    }

    if pattern == PatternKind::LShape {
        let flipped = if dx >= dy {
            Point::new(source_jetty.x, target_jetty.y)
        } else {
            Point::new(target_jetty.x, source_jetty.y)
        };
        let points = job.assemble(&[flipped]);
        return (!job.collides(&points)).then_some(points);
    }

    let jog = match pattern {
        PatternKind::ZShape => Axis::Vertical,
        PatternKind::SShape => Axis::Horizontal,
        PatternKind::Direct if dx >= dy => Axis::Vertical,
        _ => Axis::Horizontal,
    };
    let exclude = job.endpoints_exclusion();
    job.index
        .clear_channels(jog, source_jetty, target_jetty, &exclude)
        .into_iter()
        .take(MAX_CHANNEL_CANDIDATES)
        .map(|line| match jog {
            Axis::Vertical => z_corners(source_jetty, target_jetty, line),
            Axis::Horizontal => s_corners(source_jetty, target_jetty, line),
        })
        .map(|corners| job.assemble(&corners))
        .find(|points| !job.collides(points))
}

/// Full routing for one edge.
///
/// Order of attempts: keep the current waypoints (optimize only), canonical pattern,
/// pattern moved into a clear channel, grid search. A search that gives up yields the
/// deterministic L-shaped fallback as a degraded route.
pub fn compute_route(job: &RouteJob, scratch: &mut SearchScratch) -> Routed {
    if job.pinned {
        return Ok(pinned_route(job));
    }
    if let Some(degraded) = coincident_anchors(job) {
        return Err(degraded);
    }

    if job.operation == Operation::Optimize && !job.waypoints.is_empty() {
        let current = remove_redundant(&job.with_own_waypoints());
        if !job.collides(&current) {
            return Ok(job.decorate(RouteResult::new(current, RouteStrategy::Reused)));
        }
    }

    let (source_jetty, target_jetty) = job.jetties();
    let pattern = job.pattern();
    let corners =
        build_pattern(source_jetty, target_jetty, pattern, job.settings.jetty_size, job.settings.split);
    let points = job.assemble(&corners);
    if !job.collides(&points) {
        return Ok(job.finish(points, RouteStrategy::Pattern).with_pattern(pattern));
    }

    if let Some(points) = channel_route(job, pattern) {
        return Ok(job.finish(points, RouteStrategy::Channel).with_pattern(pattern));
    }

    let search = find_path_with(source_jetty, target_jetty, &job.index, job.settings.max_iterations, scratch);
    let points = job.assemble(&search.points);
    match search.outcome {
        SearchOutcome::Found | SearchOutcome::Trivial => Ok(job.finish(points, RouteStrategy::Search)),
        SearchOutcome::Exhausted | SearchOutcome::Unreachable => {
            tracing::debug!(
                edge = %job.edge_id,
                iterations = search.iterations,
                outcome = ?search.outcome,
                "route search gave up, using fallback path"
            );
            Err(Degraded {
                fallback: job.decorate(RouteResult::new(points, RouteStrategy::SearchFallback)),
                warning: RoutingWarning::SearchExhausted {
                    edge_id: job.edge_id.clone(),
                    iterations: search.iterations,
                },
            })
        }
    }
}

/// Pattern-only routing used when no worker is available. Ignores obstacles.
pub fn fallback_route(job: &RouteJob) -> Routed {
    if job.pinned {
        return Ok(pinned_route(job));
    }
    if let Some(degraded) = coincident_anchors(job) {
        return Err(degraded);
    }
    let (source_jetty, target_jetty) = job.jetties();
    let pattern = job.pattern();
    let corners =
        build_pattern(source_jetty, target_jetty, pattern, job.settings.jetty_size, job.settings.split);
    let result = RouteResult::new(job.assemble(&corners), RouteStrategy::DirectFallback).with_pattern(pattern);
    Ok(job.decorate(result))
}
