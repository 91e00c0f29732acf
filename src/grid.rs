// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Grid snapping, orthogonality enforcement and alignment guides.

use crate::model::{Axis, Point, Rect, EPSILON};

/// Integer address of a grid cell: a plane point divided by the grid size and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub x: i32,
    pub y: i32,
}

impl GridCell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn of(point: Point, grid_size: f64) -> Self {
        Self::new((point.x / grid_size).round() as i32, (point.y / grid_size).round() as i32)
    }

    pub fn center(self, grid_size: f64) -> Point {
        Point::new(f64::from(self.x) * grid_size, f64::from(self.y) * grid_size)
    }

    pub fn manhattan_to(self, other: GridCell) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Saturates at the edges of the cell space; far coordinates already clamp there.
    pub(crate) fn offset(self, dx: i32, dy: i32) -> Self {
        Self { x: self.x.saturating_add(dx), y: self.y.saturating_add(dy) }
    }
}

pub fn snap_value(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).round() * grid_size
}

/// Rounds both coordinates to the nearest multiple of `grid_size`.
pub fn snap(point: Point, grid_size: f64) -> Point {
    Point::new(snap_value(point.x, grid_size), snap_value(point.y, grid_size))
}

fn same_coord(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Inserts corners so that every segment of the polyline is axis-aligned.
///
/// A diagonal step moves along its dominant axis first. Equal `|dx|` and `|dy|` move
/// horizontally first. Consecutive duplicate points are dropped.
pub fn enforce_orthogonal(points: &[Point]) -> Vec<Point> {
    let mut out = Vec::<Point>::with_capacity(points.len() * 2);
    for &p in points {
        let Some(&last) = out.last() else {
            out.push(p);
            continue;
        };
        if last.approx_eq(p, EPSILON) {
            continue;
        }
        if !same_coord(last.x, p.x) && !same_coord(last.y, p.y) {
            let dx = (p.x - last.x).abs();
            let dy = (p.y - last.y).abs();
            let corner = if dx >= dy { Point::new(p.x, last.y) } else { Point::new(last.x, p.y) };
            out.push(corner);
        }
        out.push(p);
    }
    out
}

/// Every consecutive pair differs in exactly one coordinate.
pub fn is_orthogonal(points: &[Point]) -> bool {
    points.windows(2).all(|pair| {
        let (a, b) = (pair[0], pair[1]);
        same_coord(a.x, b.x) != same_coord(a.y, b.y)
    })
}

/// A guide line the editor can draw while a box is being dragged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentGuide {
    /// `Vertical` guides are lines of constant x, `Horizontal` of constant y.
    pub axis: Axis,
    pub position: f64,
    /// Shift that would put the moving box exactly on the guide.
    pub delta: f64,
}

/// Guides where the moving rectangle's edges or center line up with another rectangle.
///
/// Results are ordered by axis, then by how far the moving box is from the guide.
pub fn alignment_guides(moving: &Rect, others: &[Rect], tolerance: f64) -> Vec<AlignmentGuide> {
    let moving_x = [moving.left(), moving.center().x, moving.right()];
    let moving_y = [moving.top(), moving.center().y, moving.bottom()];

    let mut guides = Vec::<AlignmentGuide>::new();
    let mut push = |axis: Axis, position: f64, delta: f64| {
        let duplicate = guides
            .iter()
            .any(|g| g.axis == axis && same_coord(g.position, position) && same_coord(g.delta, delta));
        if !duplicate {
            guides.push(AlignmentGuide { axis, position, delta });
        }
    };

    for other in others {
        for target in [other.left(), other.center().x, other.right()] {
            for value in moving_x {
                if (target - value).abs() <= tolerance {
                    push(Axis::Vertical, target, target - value);
                }
            }
        }
        for target in [other.top(), other.center().y, other.bottom()] {
            for value in moving_y {
                if (target - value).abs() <= tolerance {
                    push(Axis::Horizontal, target, target - value);
                }
            }
        }
    }

    guides.sort_by(|a, b| {
        a.axis
            .cmp(&b.axis)
            .then(a.delta.abs().total_cmp(&b.delta.abs()))
            .then(a.position.total_cmp(&b.position))
    });
    guides
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{alignment_guides, enforce_orthogonal, is_orthogonal, snap, GridCell};
    use crate::model::{Axis, Point, Rect};

    #[rstest]
    #[case(Point::new(0.0, 0.0))]
    #[case(Point::new(9.9, 10.1))]
    #[case(Point::new(-31.0, 47.5))]
    #[case(Point::new(1234.5, -0.4))]
    fn snap_is_idempotent(#[case] p: Point) {
        let once = snap(p, 20.0);
        assert_eq!(snap(once, 20.0), once);
        assert_eq!(once.x % 20.0, 0.0);
    }

    #[test]
    fn cells_round_to_nearest() {
        assert_eq!(GridCell::of(Point::new(29.0, -31.0), 20.0), GridCell::new(1, -2));
        assert_eq!(GridCell::new(3, -1).center(20.0), Point::new(60.0, -20.0));
    }

    #[test]
    fn enforce_inserts_dominant_axis_corner() {
        let out = enforce_orthogonal(&[Point::new(0.0, 0.0), Point::new(10.0, 40.0)]);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(0.0, 40.0), Point::new(10.0, 40.0)]);

        let out = enforce_orthogonal(&[Point::new(0.0, 0.0), Point::new(40.0, 10.0)]);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(40.0, 0.0), Point::new(40.0, 10.0)]);
    }

    #[test]
    fn enforce_breaks_ties_horizontally() {
        let out = enforce_orthogonal(&[Point::new(0.0, 0.0), Point::new(30.0, 30.0)]);
        assert_eq!(out, vec![Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 30.0)]);
    }

    #[test]
    fn enforce_drops_duplicates_and_keeps_orthogonal_input() {
        let input = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 20.0),
        ];
        let out = enforce_orthogonal(&input);
        assert_eq!(out, input[1..].to_vec());
        assert!(is_orthogonal(&out));
    }

    #[test]
    fn orthogonality_rejects_diagonals_and_zero_length_segments() {
        assert!(!is_orthogonal(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]));
        assert!(!is_orthogonal(&[Point::new(0.0, 0.0), Point::new(0.0, 0.0)]));
        assert!(is_orthogonal(&[Point::new(5.0, 5.0)]));
    }

    #[test]
    fn guides_report_center_and_edge_alignment() {
        let moving = Rect::new(102.0, 300.0, 50.0, 40.0);
        let other = Rect::new(100.0, 0.0, 100.0, 40.0);
        let guides = alignment_guides(&moving, &[other], 3.0);

        // Left edges line up at x=100 and the moving right edge sits next to the other's center.
        assert_eq!(guides.len(), 2);
        assert!(guides.iter().all(|g| g.axis == Axis::Vertical && g.delta == -2.0));
        assert_eq!(guides[0].position, 100.0);
        assert_eq!(guides[1].position, 150.0);
    }

    #[test]
    fn guides_are_empty_when_nothing_is_close() {
        let moving = Rect::new(500.0, 500.0, 10.0, 10.0);
        let other = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(alignment_guides(&moving, &[other], 2.0).is_empty());
    }
}
