// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::geometry::{AnchorSide, Point, Rect};
use super::ids::{EdgeId, NodeId};

/// A box on the canvas. Owned by the editor; the router only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub position: Point,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { id, position: Point::new(x, y), width, height, parent_id: None }
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.width, self.height)
    }
}

/// Whether an edge's waypoints belong to the router or to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointMode {
    #[default]
    Auto,
    Pinned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_anchor: Option<AnchorSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_anchor: Option<AnchorSide>,
    #[serde(default)]
    pub waypoints: Vec<Point>,
    #[serde(default)]
    pub mode: WaypointMode,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            source_anchor: None,
            target_anchor: None,
            waypoints: Vec::new(),
            mode: WaypointMode::Auto,
        }
    }

    pub fn with_anchors(mut self, source: AnchorSide, target: AnchorSide) -> Self {
        self.source_anchor = Some(source);
        self.target_anchor = Some(target);
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<Point>, mode: WaypointMode) -> Self {
        self.waypoints = waypoints;
        self.mode = mode;
        self
    }

    pub fn is_pinned(&self) -> bool {
        self.mode == WaypointMode::Pinned
    }
}

/// An immutable copy of the caller's node/edge arrays at one instant.
///
/// Both maps are ordered by id so that anything derived from a snapshot
/// (obstacle indexes, cache fingerprints) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramSnapshot {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl DiagramSnapshot {
    pub fn new(nodes: impl IntoIterator<Item = Node>, edges: impl IntoIterator<Item = Edge>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
            edges: edges.into_iter().map(|edge| (edge.id.clone(), edge)).collect(),
        }
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    pub fn edges(&self) -> &BTreeMap<EdgeId, Edge> {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn insert_edge(&mut self, edge: Edge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Returns `node_id` followed by its container chain, innermost first.
    ///
    /// Parent cycles and dangling parent ids terminate the walk.
    pub fn with_ancestors(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut chain = vec![node_id.clone()];
        let mut seen = BTreeSet::from([node_id.clone()]);
        let mut cursor = self.nodes.get(node_id).and_then(|node| node.parent_id.as_ref());
        while let Some(parent_id) = cursor {
            if !seen.insert(parent_id.clone()) {
                break;
            }
            chain.push(parent_id.clone());
            cursor = self.nodes.get(parent_id).and_then(|node| node.parent_id.as_ref());
        }
        chain
    }
}
