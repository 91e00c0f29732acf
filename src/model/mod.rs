// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Diagram data as the router sees it: ids, plane geometry and node/edge snapshots.

pub mod diagram;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod ids;

pub use diagram::{DiagramSnapshot, Edge, Node, WaypointMode};
pub use geometry::{AnchorSide, Axis, Point, Rect, EPSILON};
pub use ids::{EdgeId, EdgeIdTag, Id, IdError, NodeId, NodeIdTag};
