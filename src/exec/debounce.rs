// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Per-edge trailing-edge debounce.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::model::EdgeId;
use crate::route::Operation;

/// Delay for `operation` given the configured base interval in milliseconds.
pub fn debounce_delay(base_ms: u64, operation: Operation) -> Duration {
    Duration::from_secs_f64(base_ms as f64 * operation.debounce_factor() / 1_000.0)
}

/// Tracks the latest request per edge. Only the request that is still the latest once
/// its delay has passed gets to run.
#[derive(Debug, Default)]
pub struct Debouncer {
    next: AtomicU64,
    latest: Mutex<HashMap<EdgeId, u64>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    fn latest(&self) -> std::sync::MutexGuard<'_, HashMap<EdgeId, u64>> {
        self.latest.lock().expect("debounce lock poisoned")
    }

    /// Registers a new request for `edge_id`, superseding any earlier one.
    pub fn schedule(&self, edge_id: &EdgeId) -> u64 {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.latest().insert(edge_id.clone(), ticket);
        ticket
    }

    /// True when `ticket` is still the latest request for `edge_id`; the edge is then
    /// forgotten.
    pub fn claim(&self, edge_id: &EdgeId, ticket: u64) -> bool {
        let mut latest = self.latest();
        if latest.get(edge_id) == Some(&ticket) {
            latest.remove(edge_id);
            true
        } else {
            false
        }
    }

    /// True when a request newer than `ticket` has been scheduled for `edge_id`.
    pub fn superseded(&self, edge_id: &EdgeId, ticket: u64) -> bool {
        self.latest().get(edge_id).is_some_and(|latest| *latest > ticket)
    }

    /// Waits `delay`; returns the request's ticket when it is still the latest.
    pub async fn settle(&self, edge_id: &EdgeId, delay: Duration) -> Option<u64> {
        let ticket = self.schedule(edge_id);
        tokio::time::sleep(delay).await;
        if self.claim(edge_id, ticket) {
            Some(ticket)
        } else {
            tracing::debug!(edge = %edge_id, "debounced request superseded");
            None
        }
    }

    /// Edges with a request still waiting out its delay.
    pub fn waiting(&self) -> usize {
        self.latest().len()
    }
}
