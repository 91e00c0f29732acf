// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Canonical route shapes chosen from the relative direction of the two endpoints.

use serde::{Deserialize, Serialize};

use crate::config::PatternSplit;
use crate::model::{AnchorSide, Point, Rect, EPSILON};

/// One of eight 45° compass sectors. `y` grows downwards, so `S` is "below".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Octant {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl Octant {
    /// Clockwise order starting at north; matches the row/column order of the pattern table.
    pub const ALL: [Octant; 8] =
        [Octant::N, Octant::NE, Octant::E, Octant::SE, Octant::S, Octant::SW, Octant::W, Octant::NW];

    fn index(self) -> usize {
        self as usize
    }

    pub fn of_side(side: AnchorSide) -> Self {
        match side {
            AnchorSide::Top => Self::N,
            AnchorSide::Right => Self::E,
            AnchorSide::Bottom => Self::S,
            AnchorSide::Left => Self::W,
        }
    }
}

/// Sector of the direction from `from` to `to`.
///
/// Sectors are centered on the compass directions, so east covers [-22.5°, 22.5°).
/// Coincident points classify as `E`.
pub fn classify_direction(from: Point, to: Point) -> Octant {
    let angle = (to.y - from.y).atan2(to.x - from.x).to_degrees();
    // 0° = E, 90° = S (y down). Shift so that N is sector 0.
    let sector = ((angle + 90.0) / 45.0).round() as i64;
    Octant::ALL[sector.rem_euclid(8) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// Straight line between aligned jetties.
    Direct,
    /// One corner.
    LShape,
    /// Horizontal, vertical, horizontal.
    ZShape,
    /// Vertical, horizontal, vertical.
    SShape,
}

use PatternKind::{Direct as D, LShape as L, SShape as S, ZShape as Z};

/// Rows: exit direction of the source side. Columns: where the target anchor lies.
/// Diagonal exits never come out of a box side and stay unmapped.
const PATTERN_TABLE: [[Option<PatternKind>; 8]; 8] = [
    //  N        NE       E        SE       S        SW       W        NW
    [Some(D), Some(S), Some(L), Some(Z), Some(Z), Some(Z), Some(L), Some(S)], // N
    [None, None, None, None, None, None, None, None],                         // NE
    [Some(L), Some(Z), Some(D), Some(Z), Some(L), Some(S), Some(S), Some(S)], // E
    [None, None, None, None, None, None, None, None],                         // SE
    [Some(Z), Some(Z), Some(L), Some(S), Some(D), Some(S), Some(L), Some(Z)], // S
    [None, None, None, None, None, None, None, None],                         // SW
    [Some(L), Some(S), Some(S), Some(S), Some(L), Some(Z), Some(D), Some(Z)], // W
    [None, None, None, None, None, None, None, None],                         // NW
];

/// Looks up the canonical shape. Combinations missing from the table route as `LShape`.
pub fn select_pattern(source: Octant, target: Octant) -> PatternKind {
    PATTERN_TABLE[source.index()][target.index()].unwrap_or(PatternKind::LShape)
}

/// The point `jetty_size` away from `anchor`, straight out of `side`.
pub fn jetty_point(anchor: Point, side: AnchorSide, jetty_size: f64) -> Point {
    let (dx, dy) = side.outward();
    anchor.offset(dx * jetty_size, dy * jetty_size)
}

fn split_at(from: f64, to: f64, split: PatternSplit) -> f64 {
    match split {
        PatternSplit::Midpoint => (from + to) / 2.0,
        PatternSplit::Thirds => from + (to - from) / 3.0,
    }
}

/// Corners of the z-shape with its vertical run at `x`.
pub(crate) fn z_corners(source: Point, target: Point, x: f64) -> Vec<Point> {
    vec![Point::new(x, source.y), Point::new(x, target.y)]
}

/// Corners of the s-shape with its horizontal run at `y`.
pub(crate) fn s_corners(source: Point, target: Point, y: f64) -> Vec<Point> {
    vec![Point::new(source.x, y), Point::new(target.x, y)]
}

/// Waypoints strictly between the two jetty points for the given shape.
///
/// Jetties closer than two jetty lengths are joined directly. Shapes that need no
/// corner for the given geometry (aligned jetties) also come back empty.
pub fn build_pattern(
    source_jetty: Point,
    target_jetty: Point,
    pattern: PatternKind,
    jetty_size: f64,
    split: PatternSplit,
) -> Vec<Point> {
    if source_jetty.distance_to(target_jetty) < 2.0 * jetty_size {
        return Vec::new();
    }
    let dx = target_jetty.x - source_jetty.x;
    let dy = target_jetty.y - source_jetty.y;
    let aligned_x = dx.abs() <= EPSILON;
    let aligned_y = dy.abs() <= EPSILON;
    if aligned_x || aligned_y {
        return Vec::new();
    }

    match pattern {
        PatternKind::Direct if dx.abs() >= dy.abs() => {
            z_corners(source_jetty, target_jetty, split_at(source_jetty.x, target_jetty.x, split))
        }
        PatternKind::Direct => {
            s_corners(source_jetty, target_jetty, split_at(source_jetty.y, target_jetty.y, split))
        }
        PatternKind::LShape if dx.abs() >= dy.abs() => vec![Point::new(target_jetty.x, source_jetty.y)],
        PatternKind::LShape => vec![Point::new(source_jetty.x, target_jetty.y)],
        PatternKind::ZShape => {
            z_corners(source_jetty, target_jetty, split_at(source_jetty.x, target_jetty.x, split))
        }
        PatternKind::SShape => {
            s_corners(source_jetty, target_jetty, split_at(source_jetty.y, target_jetty.y, split))
        }
    }
}

/// Where an edge meets a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub point: Point,
    pub side: AnchorSide,
}

impl Anchor {
    pub fn on(rect: &Rect, side: AnchorSide) -> Self {
        Self { point: side.anchor_on(rect), side }
    }

    pub fn jetty(&self, jetty_size: f64) -> Point {
        jetty_point(self.point, self.side, jetty_size)
    }
}

/// Side of `from` that faces `to` along the dominant axis between the centers.
/// Equal offsets favor the horizontal sides.
fn facing_side(from: &Rect, to: &Rect) -> AnchorSide {
    let a = from.center();
    let b = to.center();
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 {
            AnchorSide::Right
        } else {
            AnchorSide::Left
        }
    } else if dy > 0.0 {
        AnchorSide::Bottom
    } else {
        AnchorSide::Top
    }
}

/// Resolves both anchors, inferring sides the edge leaves unset.
pub fn resolve_anchors(
    source: &Rect,
    target: &Rect,
    source_side: Option<AnchorSide>,
    target_side: Option<AnchorSide>,
) -> (Anchor, Anchor) {
    let source_side = source_side.unwrap_or_else(|| facing_side(source, target));
    let target_side = target_side.unwrap_or_else(|| facing_side(target, source));
    (Anchor::on(source, source_side), Anchor::on(target, target_side))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        build_pattern, classify_direction, jetty_point, resolve_anchors, select_pattern, Octant,
        PatternKind,
    };
    use crate::config::PatternSplit;
    use crate::model::{AnchorSide, Point, Rect};

    #[rstest]
    #[case(Point::new(10.0, 0.0), Octant::E)]
    #[case(Point::new(10.0, 10.0), Octant::SE)]
    #[case(Point::new(0.0, 10.0), Octant::S)]
    #[case(Point::new(-10.0, 10.0), Octant::SW)]
    #[case(Point::new(-10.0, 0.0), Octant::W)]
    #[case(Point::new(-10.0, -10.0), Octant::NW)]
    #[case(Point::new(0.0, -10.0), Octant::N)]
    #[case(Point::new(10.0, -10.0), Octant::NE)]
    #[case(Point::new(10.0, 3.0), Octant::E)]
    fn directions_classify_into_compass_sectors(#[case] to: Point, #[case] expected: Octant) {
        assert_eq!(classify_direction(Point::new(0.0, 0.0), to), expected);
    }

    #[test]
    fn every_pair_has_a_pattern() {
        for source in Octant::ALL {
            for target in Octant::ALL {
                let _ = select_pattern(source, target);
            }
        }
        assert_eq!(select_pattern(Octant::NE, Octant::SW), PatternKind::LShape);
    }

    #[rstest]
    #[case(Octant::E, Octant::E, PatternKind::Direct)]
    #[case(Octant::S, Octant::S, PatternKind::Direct)]
    #[case(Octant::E, Octant::SE, PatternKind::ZShape)]
    #[case(Octant::E, Octant::S, PatternKind::LShape)]
    #[case(Octant::E, Octant::W, PatternKind::SShape)]
    #[case(Octant::N, Octant::NE, PatternKind::SShape)]
    fn table_picks_expected_shapes(
        #[case] source: Octant,
        #[case] target: Octant,
        #[case] expected: PatternKind,
    ) {
        assert_eq!(select_pattern(source, target), expected);
    }

    #[test]
    fn jetty_moves_out_of_the_side() {
        let anchor = Point::new(100.0, 30.0);
        assert_eq!(jetty_point(anchor, AnchorSide::Right, 20.0), Point::new(120.0, 30.0));
        assert_eq!(jetty_point(anchor, AnchorSide::Top, 20.0), Point::new(100.0, 10.0));
    }

    #[test]
    fn z_shape_turns_at_the_midpoint() {
        let corners = build_pattern(
            Point::new(120.0, 30.0),
            Point::new(280.0, 330.0),
            PatternKind::ZShape,
            20.0,
            PatternSplit::Midpoint,
        );
        assert_eq!(corners, vec![Point::new(200.0, 30.0), Point::new(200.0, 330.0)]);
    }

    #[test]
    fn thirds_split_moves_the_jog_towards_the_source() {
        let corners = build_pattern(
            Point::new(0.0, 0.0),
            Point::new(300.0, 90.0),
            PatternKind::ZShape,
            20.0,
            PatternSplit::Thirds,
        );
        assert_eq!(corners, vec![Point::new(100.0, 0.0), Point::new(100.0, 90.0)]);
    }

    #[test]
    fn l_shape_runs_the_longer_axis_first() {
        let corners = build_pattern(
            Point::new(0.0, 0.0),
            Point::new(200.0, 60.0),
            PatternKind::LShape,
            20.0,
            PatternSplit::Midpoint,
        );
        assert_eq!(corners, vec![Point::new(200.0, 0.0)]);
    }

    #[test]
    fn close_jetties_connect_directly() {
        let corners = build_pattern(
            Point::new(0.0, 0.0),
            Point::new(20.0, 20.0),
            PatternKind::ZShape,
            20.0,
            PatternSplit::Midpoint,
        );
        assert!(corners.is_empty());
    }

    #[test]
    fn inferred_anchors_face_each_other() {
        let a = Rect::new(0.0, 0.0, 100.0, 60.0);
        let b = Rect::new(300.0, 300.0, 100.0, 60.0);
        let (source, target) = resolve_anchors(&a, &b, None, None);
        assert_eq!(source.side, AnchorSide::Right);
        assert_eq!(source.point, Point::new(100.0, 30.0));
        assert_eq!(target.side, AnchorSide::Left);
        assert_eq!(target.point, Point::new(300.0, 330.0));
    }

    #[test]
    fn explicit_sides_win_over_inference() {
        let a = Rect::new(0.0, 0.0, 100.0, 60.0);
        let b = Rect::new(300.0, 0.0, 100.0, 60.0);
        let (source, target) = resolve_anchors(&a, &b, Some(AnchorSide::Bottom), None);
        assert_eq!(source.side, AnchorSide::Bottom);
        assert_eq!(target.side, AnchorSide::Left);
    }
}
