// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Orthogonal routing of a single edge.
//!
//! A route starts at the source anchor, leaves the node through a short jetty, follows a
//! canonical pattern when nothing is in the way and falls back to grid search when
//! something is. Every produced polyline is axis-aligned.

pub mod obstacles;
pub mod optimizer;
pub mod pathfinder;
pub mod pattern;
pub mod result;
pub mod router;

pub use obstacles::{ObstacleIndex, ObstacleOwner, ObstacleParams};
pub use optimizer::{limit_waypoints, merge_overlaps, remove_redundant};
pub use pathfinder::{find_path, PathSearch, SearchOutcome, SearchScratch};
pub use pattern::{build_pattern, classify_direction, jetty_point, select_pattern, Anchor, Octant, PatternKind};
pub use result::{Operation, RouteResult, RouteStrategy, RoutingWarning};
pub use router::{compute_route, fallback_route, RouteJob, RouteSettings};
