// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The editor-side collaborators the engine reads from and writes to.

use std::sync::Mutex;

use crate::model::{DiagramSnapshot, EdgeId, Point};

/// Current diagram geometry. Called once per routing request.
pub trait DiagramSource: Send + Sync {
    fn snapshot(&self) -> DiagramSnapshot;
}

/// Receives computed waypoints for auto-routed edges. Must not block.
pub trait WaypointSink: Send + Sync {
    fn write_waypoints(&self, edge_id: &EdgeId, waypoints: Vec<Point>);
}

/// A diagram kept in memory, usable as both source and sink.
#[derive(Debug, Default)]
pub struct InMemoryDiagram {
    snapshot: Mutex<DiagramSnapshot>,
}

impl InMemoryDiagram {
    pub fn new(snapshot: DiagramSnapshot) -> Self {
        Self { snapshot: Mutex::new(snapshot) }
    }

    /// Applies an edit, e.g. moving a node.
    pub fn update<R>(&self, edit: impl FnOnce(&mut DiagramSnapshot) -> R) -> R {
        edit(&mut self.snapshot.lock().expect("diagram lock poisoned"))
    }
}

impl DiagramSource for InMemoryDiagram {
    fn snapshot(&self) -> DiagramSnapshot {
        self.snapshot.lock().expect("diagram lock poisoned").clone()
    }
}

impl WaypointSink for InMemoryDiagram {
    fn write_waypoints(&self, edge_id: &EdgeId, waypoints: Vec<Point>) {
        let mut snapshot = self.snapshot.lock().expect("diagram lock poisoned");
        match snapshot.edge_mut(edge_id) {
            Some(edge) if !edge.is_pinned() => edge.waypoints = waypoints,
            Some(_) => tracing::debug!(edge = %edge_id, "ignoring write-back to pinned edge"),
            None => tracing::debug!(edge = %edge_id, "ignoring write-back to removed edge"),
        }
    }
}
