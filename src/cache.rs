// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Memoized routes keyed by a fingerprint of everything a route depends on.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::{PatternSplit, RoutingOptions};
use crate::model::{AnchorSide, DiagramSnapshot, Edge, Point, WaypointMode};
use crate::route::{Operation, RouteResult};

/// Rough per-entry overhead beyond the stored points, in bytes.
const ENTRY_OVERHEAD_BYTES: usize = 160;

/// Deterministic cache key for one routing request.
///
/// Covers the operation, the edge and its anchors, every node box in id order, every
/// other edge's waypoints in id order and the options that change geometry. The edge's
/// own waypoints only count for pinned edges and for `optimize`, the only cases where
/// they shape the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(
        snapshot: &DiagramSnapshot,
        edge: &Edge,
        operation: Operation,
        options: &RoutingOptions,
    ) -> Self {
        let mut key = String::with_capacity(64 + 48 * snapshot.nodes().len());
        let mut ints = itoa::Buffer::new();

        key.push_str(operation.as_str());
        key.push('|');
        key.push_str(edge.id.as_str());
        key.push('|');
        key.push_str(edge.source.as_str());
        key.push('>');
        key.push_str(edge.target.as_str());
        push_side(&mut key, edge.source_anchor);
        push_side(&mut key, edge.target_anchor);
        key.push(match edge.mode {
            WaypointMode::Auto => 'a',
            WaypointMode::Pinned => 'p',
        });
        if edge.is_pinned() || operation == Operation::Optimize {
            push_points(&mut key, &edge.waypoints);
        }

        key.push_str("|o");
        for value in [options.grid_size, options.jetty_size, options.node_margin, options.edge_margin] {
            push_f64(&mut key, value);
        }
        for value in [options.max_iterations, options.max_waypoints] {
            key.push(',');
            key.push_str(ints.format(value));
        }
        key.push(',');
        key.push_str(match options.pattern_split {
            PatternSplit::Midpoint => "mid",
            PatternSplit::Thirds => "thirds",
        });
        key.push(if options.enable_virtual_bends { 'V' } else { 'v' });
        key.push(if options.enable_intersection_detection { 'I' } else { 'i' });

        key.push_str("|n");
        key.push_str(ints.format(snapshot.nodes().len()));
        for node in snapshot.nodes().values() {
            key.push(';');
            key.push_str(node.id.as_str());
            for value in [node.position.x, node.position.y, node.width, node.height] {
                push_f64(&mut key, value);
            }
            if let Some(parent) = &node.parent_id {
                key.push('^');
                key.push_str(parent.as_str());
            }
        }

        key.push_str("|e");
        for other in snapshot.edges().values().filter(|other| other.id != edge.id) {
            key.push(';');
            key.push_str(other.id.as_str());
            key.push(':');
            key.push_str(other.source.as_str());
            key.push('>');
            key.push_str(other.target.as_str());
            push_side(&mut key, other.source_anchor);
            push_side(&mut key, other.target_anchor);
            push_points(&mut key, &other.waypoints);
        }

        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Bit pattern of `value`, with both zeros written the same.
fn push_f64(key: &mut String, value: f64) {
    let bits = if value == 0.0 { 0 } else { value.to_bits() };
    key.push(',');
    key.push_str(itoa::Buffer::new().format(bits));
}

fn push_points(key: &mut String, points: &[Point]) {
    key.push('[');
    for p in points {
        push_f64(key, p.x);
        push_f64(key, p.y);
    }
    key.push(']');
}

fn push_side(key: &mut String, side: Option<AnchorSide>) {
    key.push(match side {
        None => '*',
        Some(AnchorSide::Top) => 'T',
        Some(AnchorSide::Right) => 'R',
        Some(AnchorSide::Bottom) => 'B',
        Some(AnchorSide::Left) => 'L',
    });
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: RouteResult,
    created: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheCounters {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Bounded, time-limited route memo.
///
/// Expired entries are dropped when looked up. Inserting past the size limit evicts the
/// oldest half of the entries.
#[derive(Debug)]
pub struct RoutingCache {
    entries: HashMap<Fingerprint, CacheEntry>,
    max_size: usize,
    expiry: Duration,
    counters: CacheCounters,
}

impl RoutingCache {
    pub fn new(max_size: usize, expiry: Duration) -> Self {
        Self { entries: HashMap::new(), max_size: max_size.max(1), expiry, counters: CacheCounters::default() }
    }

    pub fn from_options(options: &RoutingOptions) -> Self {
        Self::new(options.cache_max_size, options.cache_expiry())
    }

    /// Applies new limits; shrinking below the current size evicts immediately.
    pub fn reconfigure(&mut self, max_size: usize, expiry: Duration) {
        self.max_size = max_size.max(1);
        self.expiry = expiry;
        if self.entries.len() > self.max_size {
            self.evict_oldest_half();
        }
    }

    pub fn get(&mut self, key: &Fingerprint) -> Option<RouteResult> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &Fingerprint, now: Instant) -> Option<RouteResult> {
        let expired = match self.entries.get(key) {
            None => {
                self.counters.misses += 1;
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.created) > self.expiry,
        };
        if expired {
            self.entries.remove(key);
            self.counters.expirations += 1;
            self.counters.misses += 1;
            return None;
        }
        self.counters.hits += 1;
        self.entries.get(key).map(|entry| entry.result.clone())
    }

    pub fn put(&mut self, key: Fingerprint, result: RouteResult) {
        self.put_at(key, result, Instant::now());
    }

    pub(crate) fn put_at(&mut self, key: Fingerprint, result: RouteResult, now: Instant) {
        self.entries.insert(key, CacheEntry { result, created: now });
        if self.entries.len() > self.max_size {
            self.evict_oldest_half();
        }
    }

    fn evict_oldest_half(&mut self) {
        let mut by_age =
            self.entries.iter().map(|(key, entry)| (entry.created, key.clone())).collect::<Vec<_>>();
        by_age.sort();
        let dropped = (self.entries.len() / 2).max(self.entries.len().saturating_sub(self.max_size));
        for (_, key) in by_age.into_iter().take(dropped) {
            self.entries.remove(&key);
            self.counters.evictions += 1;
        }
        tracing::debug!(dropped, remaining = self.entries.len(), "route cache evicted entries");
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counters(&self) -> CacheCounters {
        self.counters
    }

    /// Approximate heap footprint of the stored routes.
    pub fn estimated_bytes(&self) -> usize {
        self.entries
            .iter()
            .map(|(key, entry)| {
                let points = entry.result.points.len()
                    + entry.result.virtual_bends.len()
                    + entry.result.intersections.len();
                ENTRY_OVERHEAD_BYTES + key.0.len() + points * std::mem::size_of::<Point>()
            })
            .sum()
    }
}
