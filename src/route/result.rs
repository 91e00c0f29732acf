// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::pattern::PatternKind;
use crate::grid::is_orthogonal;
use crate::model::{EdgeId, Point};

/// What the editor asked the router to do with an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Keep the edge's current waypoints when they are still valid, otherwise re-route.
    Optimize,
    FullRoute,
    /// Full route plus segment midpoints the editor can offer as drag handles.
    VirtualBends,
    /// Full route plus crossing points with the other edges.
    Intersections,
}

impl Operation {
    pub const ALL: [Operation; 4] =
        [Operation::Optimize, Operation::FullRoute, Operation::VirtualBends, Operation::Intersections];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Optimize => "optimize",
            Self::FullRoute => "fullRoute",
            Self::VirtualBends => "virtualBends",
            Self::Intersections => "intersections",
        }
    }

    /// Debounce multiplier relative to the configured base interval.
    pub fn debounce_factor(self) -> f64 {
        match self {
            Self::FullRoute | Self::VirtualBends => 1.0,
            Self::Optimize => 1.5,
            Self::Intersections => 2.0,
        }
    }

    /// Operations whose result is written back onto the edge.
    pub fn writes_back(self) -> bool {
        matches!(self, Self::FullRoute | Self::Optimize)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// How a route was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteStrategy {
    /// Canonical pattern, no obstacle in the way.
    Pattern,
    /// Pattern whose middle segment was moved into a clear channel.
    Channel,
    /// Grid search.
    Search,
    /// The edge's existing waypoints were kept.
    Reused,
    /// User-pinned waypoints.
    Pinned,
    /// Grid search gave up; deterministic L-shaped path.
    SearchFallback,
    /// Pattern-only route computed without obstacle checks.
    DirectFallback,
    /// Endpoints coincide or are missing.
    Degenerate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    /// Source anchor to target anchor, inclusive.
    pub points: Vec<Point>,
    pub segment_count: usize,
    pub total_length: f64,
    pub orthogonal: bool,
    pub used_fallback: bool,
    pub strategy: RouteStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<PatternKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub virtual_bends: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intersections: Vec<Point>,
}

impl RouteResult {
    pub fn new(points: Vec<Point>, strategy: RouteStrategy) -> Self {
        let segment_count = points.len().saturating_sub(1);
        let total_length = points.windows(2).map(|pair| pair[0].manhattan_to(pair[1])).sum();
        let orthogonal = is_orthogonal(&points);
        let used_fallback = matches!(
            strategy,
            RouteStrategy::SearchFallback | RouteStrategy::DirectFallback | RouteStrategy::Degenerate
        );
        Self {
            points,
            segment_count,
            total_length,
            orthogonal,
            used_fallback,
            strategy,
            pattern: None,
            virtual_bends: Vec::new(),
            intersections: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: PatternKind) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn degenerate(at: Point) -> Self {
        Self::new(vec![at], RouteStrategy::Degenerate)
    }

    /// Interior points, i.e. everything except the two anchors.
    pub fn waypoints(&self) -> &[Point] {
        if self.points.len() <= 2 {
            return &[];
        }
        &self.points[1..self.points.len() - 1]
    }
}

/// A recoverable problem the router absorbed while producing a route.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingWarning {
    InputDegenerate { edge_id: EdgeId, reason: String },
    SearchExhausted { edge_id: EdgeId, iterations: usize },
    WorkerUnavailable { reason: String },
}

impl fmt::Display for RoutingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputDegenerate { edge_id, reason } => {
                write!(f, "edge {edge_id} has degenerate input: {reason}")
            }
            Self::SearchExhausted { edge_id, iterations } => {
                write!(f, "route search for edge {edge_id} gave up after {iterations} iterations")
            }
            Self::WorkerUnavailable { reason } => {
                write!(f, "routing worker unavailable, using synchronous fallback: {reason}")
            }
        }
    }
}

impl std::error::Error for RoutingWarning {}

/// A route that could only be produced in degraded form.
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded {
    pub fallback: RouteResult,
    pub warning: RoutingWarning,
}

/// Internal routing outcome. `Err` still carries a usable route.
pub type Routed = Result<RouteResult, Degraded>;

/// Collapses an internal outcome into the always-valid public result, handing the
/// warning (if any) to `report`.
pub fn collapse(routed: Routed, mut report: impl FnMut(RoutingWarning)) -> RouteResult {
    match routed {
        Ok(result) => result,
        Err(Degraded { fallback, warning }) => {
            report(warning);
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{collapse, Degraded, Operation, RouteResult, RouteStrategy, RoutingWarning};
    use crate::model::{EdgeId, Point};

    #[test]
    fn metadata_is_derived_from_points() {
        let result = RouteResult::new(
            vec![Point::new(0.0, 0.0), Point::new(30.0, 0.0), Point::new(30.0, 40.0)],
            RouteStrategy::Pattern,
        );
        assert_eq!(result.segment_count, 2);
        assert_eq!(result.total_length, 70.0);
        assert!(result.orthogonal);
        assert!(!result.used_fallback);
        assert_eq!(result.waypoints(), &[Point::new(30.0, 0.0)]);
    }

    #[test]
    fn degenerate_results_are_flagged_as_fallback() {
        let result = RouteResult::degenerate(Point::new(5.0, 5.0));
        assert!(result.used_fallback);
        assert!(result.waypoints().is_empty());
        assert_eq!(result.segment_count, 0);
    }

    #[test]
    fn collapse_reports_warning_and_keeps_fallback() {
        let fallback = RouteResult::degenerate(Point::new(1.0, 1.0));
        let warning = RoutingWarning::SearchExhausted { edge_id: EdgeId::new("e").unwrap(), iterations: 3 };
        let mut seen = Vec::new();
        let out = collapse(
            Err(Degraded { fallback: fallback.clone(), warning: warning.clone() }),
            |w| seen.push(w),
        );
        assert_eq!(out, fallback);
        assert_eq!(seen, vec![warning]);
    }

    #[test]
    fn operations_parse_from_editor_names() {
        assert_eq!("fullRoute".parse::<Operation>(), Ok(Operation::FullRoute));
        assert_eq!("INTERSECTIONS".parse::<Operation>(), Ok(Operation::Intersections));
        assert!("reroute".parse::<Operation>().is_err());
    }
}
