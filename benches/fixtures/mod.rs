// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark scenes (no RNG).

use orthoroute::model::{DiagramSnapshot, Edge, EdgeId, Node, NodeId};

const NODE_WIDTH: f64 = 120.0;
const NODE_HEIGHT: f64 = 60.0;
const COLUMN_PITCH: f64 = 200.0;
const ROW_PITCH: f64 = 160.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneParams {
    pub rows: usize,
    pub columns: usize,
    /// Edges from each node into the next row.
    pub fanout: usize,
    /// Extra edges from each node skipping rows, which have to get past other nodes.
    pub long_edges_per_node: usize,
}

impl SceneParams {
    pub const fn new(rows: usize, columns: usize, fanout: usize, long_edges_per_node: usize) -> Self {
        Self { rows, columns, fanout, long_edges_per_node }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Small,
    MediumDense,
    LargeLongEdges,
}

impl Case {
    pub const fn id(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::MediumDense => "medium_dense",
            Self::LargeLongEdges => "large_long_edges",
        }
    }

    pub const fn params(self) -> SceneParams {
        match self {
            Self::Small => SceneParams::new(4, 5, 2, 0),
            Self::MediumDense => SceneParams::new(8, 10, 3, 1),
            Self::LargeLongEdges => SceneParams::new(14, 16, 3, 2),
        }
    }

    pub const ALL: [Case; 3] = [Self::Small, Self::MediumDense, Self::LargeLongEdges];
}

fn node_id(row: usize, column: usize) -> NodeId {
    NodeId::new(format!("n:r{row:02}c{column:03}")).expect("valid node id")
}

fn edge_id(index: usize) -> EdgeId {
    EdgeId::new(format!("e:{index:06}")).expect("valid edge id")
}

/// Nodes on a staggered grid; edges always point to a later row.
pub fn scene(params: SceneParams) -> DiagramSnapshot {
    assert!(params.rows >= 2, "rows must be >= 2");
    assert!(params.columns >= 1, "columns must be >= 1");

    let mut nodes = Vec::with_capacity(params.rows * params.columns);
    for row in 0..params.rows {
        let stagger = if row % 2 == 1 { COLUMN_PITCH / 3.0 } else { 0.0 };
        for column in 0..params.columns {
            let x = column as f64 * COLUMN_PITCH + stagger;
            let y = row as f64 * ROW_PITCH;
            nodes.push(Node::new(node_id(row, column), x, y, NODE_WIDTH, NODE_HEIGHT));
        }
    }

    let mut edges = Vec::new();
    let fanout = params.fanout.min(params.columns);
    for row in 0..params.rows - 1 {
        for column in 0..params.columns {
            let from = node_id(row, column);
            for k in 0..fanout {
                let to = node_id(row + 1, (column + k) % params.columns);
                edges.push(Edge::new(edge_id(edges.len()), from.clone(), to));
            }
            if row + 2 >= params.rows {
                continue;
            }
            let span = params.rows - (row + 2);
            for k in 0..params.long_edges_per_node {
                let to = node_id(row + 2 + (k % span), (column + 1 + 3 * k) % params.columns);
                edges.push(Edge::new(edge_id(edges.len()), from.clone(), to));
            }
        }
    }

    DiagramSnapshot::new(nodes, edges)
}

pub fn fixture(case: Case) -> DiagramSnapshot {
    scene(case.params())
}
