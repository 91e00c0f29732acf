// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use super::diagram::{DiagramSnapshot, Edge, Node};
use super::ids::{EdgeId, NodeId};

pub(crate) fn nid(value: &str) -> NodeId {
    NodeId::new(value).expect("node id")
}

pub(crate) fn eid(value: &str) -> EdgeId {
    EdgeId::new(value).expect("edge id")
}

pub(crate) fn node(id: &str, x: f64, y: f64, width: f64, height: f64) -> Node {
    Node::new(nid(id), x, y, width, height)
}

pub(crate) fn edge(id: &str, source: &str, target: &str) -> Edge {
    Edge::new(eid(id), nid(source), nid(target))
}

/// A at the origin, B down and to the right of it.
pub(crate) fn diagonal_pair() -> DiagramSnapshot {
    DiagramSnapshot::new(
        [node("a", 0.0, 0.0, 100.0, 60.0), node("b", 300.0, 300.0, 100.0, 60.0)],
        [edge("e:ab", "a", "b")],
    )
}

/// A and B on the same row with nothing between them.
pub(crate) fn aligned_pair() -> DiagramSnapshot {
    DiagramSnapshot::new(
        [node("a", 0.0, 0.0, 100.0, 60.0), node("b", 300.0, 0.0, 100.0, 60.0)],
        [edge("e:ab", "a", "b")],
    )
}

/// A and B on the same row with C sitting on the straight line between them.
pub(crate) fn blocked_pair() -> DiagramSnapshot {
    DiagramSnapshot::new(
        [
            node("a", 0.0, 0.0, 100.0, 60.0),
            node("c", 200.0, -20.0, 60.0, 100.0),
            node("b", 400.0, 0.0, 100.0, 60.0),
        ],
        [edge("e:ab", "a", "b")],
    )
}
