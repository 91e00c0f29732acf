// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Polyline clean-up passes. None of them move the first or last point.

use std::collections::BTreeMap;

use crate::model::{Axis, EdgeId, Point, EPSILON};

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    (same(a.x, b.x) && same(b.x, c.x)) || (same(a.y, b.y) && same(b.y, c.y))
}

/// Drops consecutive duplicates and middle points of axis-collinear triples.
///
/// Idempotent. The first and last point always survive.
pub fn remove_redundant(points: &[Point]) -> Vec<Point> {
    let mut out = Vec::<Point>::with_capacity(points.len());
    'points: for &p in points {
        loop {
            let n = out.len();
            if n >= 1 && out[n - 1].approx_eq(p, EPSILON) {
                continue 'points;
            }
            if n >= 2 && collinear(out[n - 2], out[n - 1], p) {
                out.pop();
                continue;
            }
            break;
        }
        out.push(p);
    }
    out
}

/// Collapses jogs until at most `max_waypoints` interior points remain.
///
/// A jog is two interior corners between which the path steps sideways; it is
/// replaced by one corner. The first and last segments are left alone, so a path that
/// cannot be reduced further is returned with more than `max_waypoints` points.
pub fn limit_waypoints(points: &[Point], max_waypoints: usize) -> Vec<Point> {
    let mut out = remove_redundant(points);
    while out.len().saturating_sub(2) > max_waypoints && out.len() >= 6 {
        let a = out[1];
        let d = out[4];
        let horizontal_first = same(out[1].y, out[2].y);
        let corner = if horizontal_first { Point::new(d.x, a.y) } else { Point::new(a.x, d.y) };
        out.splice(2..4, [corner]);
        out = remove_redundant(&out);
    }
    out
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    axis: Axis,
    /// y for horizontal, x for vertical.
    line: f64,
    lo: f64,
    hi: f64,
}

impl Segment {
    fn of(a: Point, b: Point) -> Option<Self> {
        if same(a.y, b.y) && !same(a.x, b.x) {
            Some(Self { axis: Axis::Horizontal, line: a.y, lo: a.x.min(b.x), hi: a.x.max(b.x) })
        } else if same(a.x, b.x) && !same(a.y, b.y) {
            Some(Self { axis: Axis::Vertical, line: a.x, lo: a.y.min(b.y), hi: a.y.max(b.y) })
        } else {
            None
        }
    }

    fn overlaps(&self, other: &Segment) -> bool {
        self.axis == other.axis
            && same(self.line, other.line)
            && self.lo.max(other.lo) < self.hi.min(other.hi) - EPSILON
    }
}

fn segments(points: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    points.windows(2).filter_map(|pair| Segment::of(pair[0], pair[1]))
}

/// Moves the interior segment `points[i]..points[i + 1]` sideways by `offset`.
/// Returns `None` when that would collapse or reverse a neighboring segment.
fn shift_segment(points: &[Point], i: usize, offset: f64) -> Option<Vec<Point>> {
    let seg = Segment::of(points[i], points[i + 1])?;
    let shift = |p: Point| match seg.axis {
        Axis::Horizontal => Point::new(p.x, p.y + offset),
        Axis::Vertical => Point::new(p.x + offset, p.y),
    };
    let keeps_direction = |from: Point, old: Point, new: Point| {
        let (before, after) = match seg.axis {
            Axis::Horizontal => (old.y - from.y, new.y - from.y),
            Axis::Vertical => (old.x - from.x, new.x - from.x),
        };
        after.abs() > EPSILON && before.signum() == after.signum()
    };

    let moved_a = shift(points[i]);
    let moved_b = shift(points[i + 1]);
    if !keeps_direction(points[i - 1], points[i], moved_a)
        || !keeps_direction(points[i + 2], points[i + 1], moved_b)
    {
        return None;
    }
    let mut out = points.to_vec();
    out[i] = moved_a;
    out[i + 1] = moved_b;
    Some(out)
}

/// Separates collinear overlapping segments of different edges.
///
/// Edges are settled in id order: an interior segment of a later edge that runs on top
/// of an earlier edge is shifted by `step` or `2 * step` to either side, whichever
/// first clears every earlier edge. Segments with no clear offset stay put. Applying
/// the pass to its own output changes nothing.
pub fn merge_overlaps(routes: &BTreeMap<EdgeId, Vec<Point>>, step: f64) -> BTreeMap<EdgeId, Vec<Point>> {
    let mut settled = BTreeMap::<EdgeId, Vec<Point>>::new();
    let mut earlier = Vec::<Segment>::new();

    for (id, points) in routes {
        let mut points = remove_redundant(points);
        let mut rounds = 4 * points.len();
        loop {
            let mut changed = false;
            for i in 1..points.len().saturating_sub(2) {
                let Some(seg) = Segment::of(points[i], points[i + 1]) else {
                    continue;
                };
                if !earlier.iter().any(|other| seg.overlaps(other)) {
                    continue;
                }
                for offset in [step, -step, 2.0 * step, -2.0 * step] {
                    let Some(candidate) = shift_segment(&points, i, offset) else {
                        continue;
                    };
                    let clear = segments(&candidate[i - 1..=i + 2])
                        .all(|moved| !earlier.iter().any(|other| moved.overlaps(other)));
                    if clear {
                        points = candidate;
                        changed = true;
                        break;
                    }
                }
            }
            rounds = rounds.saturating_sub(1);
            if !changed || rounds == 0 {
                break;
            }
        }
        earlier.extend(segments(&points));
        settled.insert(id.clone(), points);
    }

    settled
}

/// Midpoint of every non-empty segment.
pub fn segment_midpoints(points: &[Point]) -> Vec<Point> {
    points
        .windows(2)
        .filter(|pair| !pair[0].approx_eq(pair[1], EPSILON))
        .map(|pair| Point::new((pair[0].x + pair[1].x) / 2.0, (pair[0].y + pair[1].y) / 2.0))
        .collect()
}

/// Points where `route` crosses any of `others` at a right angle, in route order.
///
/// Touching at a segment end does not count as a crossing.
pub fn find_intersections<'a>(route: &[Point], others: impl IntoIterator<Item = &'a [Point]>) -> Vec<Point> {
    let others = others.into_iter().flat_map(segments).collect::<Vec<_>>();
    let mut out = Vec::<Point>::new();
    for pair in route.windows(2) {
        let Some(ours) = Segment::of(pair[0], pair[1]) else {
            continue;
        };
        let mut hits = others
            .iter()
            .filter(|theirs| theirs.axis != ours.axis)
            .filter(|theirs| {
                theirs.line > ours.lo + EPSILON
                    && theirs.line < ours.hi - EPSILON
                    && ours.line > theirs.lo + EPSILON
                    && ours.line < theirs.hi - EPSILON
            })
            .map(|theirs| match ours.axis {
                Axis::Horizontal => Point::new(theirs.line, ours.line),
                Axis::Vertical => Point::new(ours.line, theirs.line),
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| pair[0].manhattan_to(*a).total_cmp(&pair[0].manhattan_to(*b)));
        for hit in hits {
            if !out.iter().any(|seen| seen.approx_eq(hit, EPSILON)) {
                out.push(hit);
            }
        }
    }
    out
}
