// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! The routing service the editor talks to.
//!
//! [`RoutingEngine`] ties the pieces together: it snapshots the diagram, consults the
//! route cache, hands the work to the executor, collapses degraded routes into usable
//! ones (forwarding the warnings to the monitor) and writes auto-routed waypoints back.
//! At most one computation per edge is in flight; concurrent requests for the same edge
//! share its result.

pub mod source;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::oneshot;

pub use source::{DiagramSource, InMemoryDiagram, WaypointSink};

use crate::cache::{Fingerprint, RoutingCache};
use crate::config::{ConfigError, RoutingOptions};
use crate::exec::{
    debounce_delay, Debouncer, ExecutionMode, Executor, TaskCounters, TaskPayload, TaskReply, ThreadWorkerFactory,
    WorkerFactory,
};
use crate::model::{DiagramSnapshot, Edge, EdgeId, Point};
use crate::monitor::{Alert, MonitorConfig, OptimizationAction, PerformanceMonitor};
use crate::route::optimizer::{find_intersections, segment_midpoints};
use crate::route::result::{collapse, Routed};
use crate::route::router::other_geometry;
use crate::route::{fallback_route, merge_overlaps, Operation, RouteJob, RouteResult, RouteStrategy};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The edge was never registered with the engine.
    UnregisteredEdge { edge_id: EdgeId },
    /// The edge is registered but the diagram no longer contains it.
    UnknownEdge { edge_id: EdgeId },
    Config(ConfigError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnregisteredEdge { edge_id } => write!(f, "edge {edge_id} is not registered for routing"),
            Self::UnknownEdge { edge_id } => write!(f, "edge {edge_id} does not exist in the diagram"),
            Self::Config(err) => write!(f, "invalid routing options: {err}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub cache_size: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    /// Milliseconds, averaged over the monitor's windows. Zero before the first route.
    pub average_processing_time: f64,
    pub queue_depth: usize,
    pub registered_edges: usize,
    /// Routes actually computed, i.e. not served from cache or shared with a concurrent
    /// request.
    pub computations: u64,
    pub execution_mode: ExecutionMode,
    pub tasks: TaskCounters,
    pub warnings: u64,
    pub recommendations: Vec<String>,
}

pub struct EngineBuilder {
    source: Arc<dyn DiagramSource>,
    sink: Option<Arc<dyn WaypointSink>>,
    options: RoutingOptions,
    worker_factory: Arc<dyn WorkerFactory>,
    monitor: MonitorConfig,
}

impl EngineBuilder {
    pub fn with_sink(mut self, sink: Arc<dyn WaypointSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_options(mut self, options: RoutingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_worker_factory(mut self, factory: Arc<dyn WorkerFactory>) -> Self {
        self.worker_factory = factory;
        self
    }

    pub fn with_monitor_config(mut self, config: MonitorConfig) -> Self {
        self.monitor = config;
        self
    }

    pub fn build(self) -> Result<RoutingEngine, EngineError> {
        self.options.validate()?;
        Ok(RoutingEngine {
            source: self.source,
            sink: self.sink,
            cache: Mutex::new(RoutingCache::from_options(&self.options)),
            executor: Executor::new(self.worker_factory, self.options.max_worker_start_attempts),
            options: Mutex::new(self.options),
            registered: Mutex::new(BTreeSet::new()),
            in_flight: Mutex::new(HashMap::new()),
            debouncer: Debouncer::new(),
            monitor: PerformanceMonitor::new(self.monitor),
            computations: AtomicU64::new(0),
            routing_calls: AtomicU64::new(0),
        })
    }
}

type Waiters = HashMap<EdgeId, Vec<oneshot::Sender<RouteResult>>>;

enum Turn<'a> {
    Lead(InFlight<'a>),
    Follow(oneshot::Receiver<RouteResult>),
}

/// Marks an edge as being routed. Dropping it without [`InFlight::finish`] releases the
/// waiting requests, which then retry on their own.
struct InFlight<'a> {
    waiters: &'a Mutex<Waiters>,
    edge_id: EdgeId,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, result: &RouteResult) {
        let waiting = self.waiters.lock().expect("in-flight lock poisoned").remove(&self.edge_id);
        for waiter in waiting.into_iter().flatten() {
            let _ = waiter.send(result.clone());
        }
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.remove(&self.edge_id);
        }
    }
}

pub struct RoutingEngine {
    source: Arc<dyn DiagramSource>,
    sink: Option<Arc<dyn WaypointSink>>,
    options: Mutex<RoutingOptions>,
    registered: Mutex<BTreeSet<EdgeId>>,
    cache: Mutex<RoutingCache>,
    in_flight: Mutex<Waiters>,
    executor: Executor,
    debouncer: Debouncer,
    monitor: PerformanceMonitor,
    computations: AtomicU64,
    /// Routing calls completed so far; drives the automatic rule evaluation.
    routing_calls: AtomicU64,
}

impl fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("options", &self.options())
            .field("mode", &self.executor.mode())
            .finish_non_exhaustive()
    }
}

impl RoutingEngine {
    /// Starts configuring an engine reading from `source`. Defaults: default options, a
    /// thread worker, no write-back.
    pub fn builder(source: Arc<dyn DiagramSource>) -> EngineBuilder {
        EngineBuilder {
            source,
            sink: None,
            options: RoutingOptions::default(),
            worker_factory: Arc::new(ThreadWorkerFactory),
            monitor: MonitorConfig::default(),
        }
    }

    /// Engine that reads from and writes back to `diagram`.
    pub fn in_memory(diagram: Arc<InMemoryDiagram>, options: RoutingOptions) -> Result<Self, EngineError> {
        Self::builder(diagram.clone()).with_sink(diagram).with_options(options).build()
    }

    pub fn options(&self) -> RoutingOptions {
        self.options.lock().expect("routing options lock poisoned").clone()
    }

    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }

    pub fn subscribe(&self, listener: impl Fn(&Alert) + Send + Sync + 'static) {
        self.monitor.subscribe(listener);
    }

    fn cache(&self) -> MutexGuard<'_, RoutingCache> {
        self.cache.lock().expect("route cache lock poisoned")
    }

    fn registered(&self) -> MutexGuard<'_, BTreeSet<EdgeId>> {
        self.registered.lock().expect("registered edges lock poisoned")
    }

    /// Returns `false` when the edge was already registered.
    pub fn register_edge(&self, edge_id: EdgeId) -> bool {
        self.registered().insert(edge_id)
    }

    /// Returns how many of the edges were new.
    pub fn register_edges(&self, edge_ids: impl IntoIterator<Item = EdgeId>) -> usize {
        let mut registered = self.registered();
        edge_ids.into_iter().filter(|id| registered.insert(id.clone())).count()
    }

    pub fn unregister_edge(&self, edge_id: &EdgeId) -> bool {
        self.registered().remove(edge_id)
    }

    pub fn is_registered(&self, edge_id: &EdgeId) -> bool {
        self.registered().contains(edge_id)
    }

    fn ensure_registered(&self, edge_id: &EdgeId) -> Result<(), EngineError> {
        if self.is_registered(edge_id) {
            Ok(())
        } else {
            Err(EngineError::UnregisteredEdge { edge_id: edge_id.clone() })
        }
    }

    /// Validates and applies new options. Invalid options leave the current ones in place.
    pub fn update_config(&self, options: RoutingOptions) -> Result<(), EngineError> {
        options.validate()?;
        self.cache().reconfigure(options.cache_max_size, options.cache_expiry());
        self.executor.set_max_start_attempts(options.max_worker_start_attempts);
        tracing::info!(
            grid_size = options.grid_size,
            batch_size = options.batch_size,
            debounce_ms = options.debounce_time_ms,
            "routing options updated"
        );
        *self.options.lock().expect("routing options lock poisoned") = options;
        Ok(())
    }

    /// Routes one edge. Always yields a usable orthogonal route for a registered edge
    /// present in the diagram.
    pub async fn route_edge(&self, edge_id: &EdgeId, operation: Operation) -> Result<RouteResult, EngineError> {
        self.ensure_registered(edge_id)?;
        loop {
            match self.take_turn(edge_id) {
                Turn::Follow(receiver) => {
                    tracing::debug!(edge = %edge_id, op = %operation, "joining in-flight route");
                    if let Ok(result) = receiver.await {
                        return Ok(result);
                    }
                }
                Turn::Lead(in_flight) => {
                    let result = self.route_single(edge_id, operation).await?;
                    in_flight.finish(&result);
                    return Ok(result);
                }
            }
        }
    }

    /// Waits out the operation's debounce delay first. `None` means a newer request for
    /// the same edge superseded this one, either before or while it was routed.
    pub async fn route_edge_debounced(
        &self,
        edge_id: &EdgeId,
        operation: Operation,
    ) -> Result<Option<RouteResult>, EngineError> {
        self.ensure_registered(edge_id)?;
        let delay = debounce_delay(self.options().debounce_time_ms, operation);
        let Some(ticket) = self.debouncer.settle(edge_id, delay).await else {
            return Ok(None);
        };
        let result = self.route_edge(edge_id, operation).await?;
        if self.debouncer.superseded(edge_id, ticket) {
            tracing::debug!(edge = %edge_id, "discarding route of superseded request");
            return Ok(None);
        }
        Ok(Some(result))
    }

    fn take_turn(&self, edge_id: &EdgeId) -> Turn<'_> {
        let mut waiters = self.in_flight.lock().expect("in-flight lock poisoned");
        if let Some(waiting) = waiters.get_mut(edge_id) {
            let (sender, receiver) = oneshot::channel();
            waiting.push(sender);
            return Turn::Follow(receiver);
        }
        waiters.insert(edge_id.clone(), Vec::new());
        Turn::Lead(InFlight { waiters: &self.in_flight, edge_id: edge_id.clone(), finished: false })
    }

    async fn route_single(&self, edge_id: &EdgeId, operation: Operation) -> Result<RouteResult, EngineError> {
        let started = Instant::now();
        let snapshot = self.source.snapshot();
        let edge = snapshot.edge(edge_id).ok_or_else(|| EngineError::UnknownEdge { edge_id: edge_id.clone() })?;
        let options = self.options();

        let key = Fingerprint::compute(&snapshot, edge, operation, &options);
        let cached = self.cache().get(&key);
        let result = match cached {
            Some(result) => {
                tracing::debug!(edge = %edge_id, op = %operation, "route cache hit");
                result
            }
            None => {
                tracing::debug!(edge = %edge_id, op = %operation, "route cache miss");
                self.compute(&snapshot, edge, operation, &options, key).await
            }
        };

        self.write_back(edge, operation, &result);
        self.monitor.record_processing(operation, started.elapsed());
        self.after_routing();
        Ok(result)
    }

    async fn compute(
        &self,
        snapshot: &DiagramSnapshot,
        edge: &Edge,
        operation: Operation,
        options: &RoutingOptions,
        key: Fingerprint,
    ) -> RouteResult {
        self.computations.fetch_add(1, Ordering::Relaxed);
        let job = match RouteJob::prepare(snapshot, edge, operation, options) {
            Ok(job) => job,
            Err(degraded) => return self.collapse(Err(degraded)),
        };

        self.monitor.record_queue_depth(self.executor.queue_depth() + 1);
        let execution =
            self.executor.run(TaskPayload::Route(Box::new(job.clone())), options.worker_timeout()).await;
        if let Some(warning) = execution.warning {
            self.monitor.report_warning(warning);
        }
        let routed = match execution.reply {
            TaskReply::Route(routed) => routed,
            TaskReply::Batch(replies) => {
                replies.into_iter().next().map_or_else(|| fallback_route(&job), |(_, routed)| routed)
            }
        };
        let result = self.collapse(routed);
        if self.cacheable(execution.mode) {
            self.cache().put(key, result.clone());
        }
        result
    }

    /// Routes several edges against one diagram snapshot. Cache misses are sent to the
    /// executor in chunks of `batchSize` (one by one when batching is off), yielding to
    /// other tasks between chunks. Overlapping parallel segments are pulled apart before
    /// the routes are returned.
    ///
    /// Edges already being routed by another request are not computed again; the batch
    /// waits for that result once its own edges are done.
    pub async fn batch_route(
        &self,
        edge_ids: &[EdgeId],
        operation: Operation,
    ) -> Result<BTreeMap<EdgeId, RouteResult>, EngineError> {
        for edge_id in edge_ids {
            self.ensure_registered(edge_id)?;
        }
        let started = Instant::now();
        let snapshot = self.source.snapshot();
        let options = self.options();

        let mut results = BTreeMap::<EdgeId, RouteResult>::new();
        let mut pending = Vec::<(RouteJob, Fingerprint)>::new();
        let mut leading = Vec::<InFlight<'_>>::new();
        let mut following = Vec::<(EdgeId, oneshot::Receiver<RouteResult>)>::new();
        for edge_id in edge_ids.iter().collect::<BTreeSet<_>>() {
            let edge =
                snapshot.edge(edge_id).ok_or_else(|| EngineError::UnknownEdge { edge_id: edge_id.clone() })?;
            match self.take_turn(edge_id) {
                Turn::Follow(receiver) => {
                    tracing::debug!(edge = %edge_id, op = %operation, "batch joining in-flight route");
                    following.push((edge_id.clone(), receiver));
                    continue;
                }
                Turn::Lead(in_flight) => leading.push(in_flight),
            }
            let key = Fingerprint::compute(&snapshot, edge, operation, &options);
            let cached = self.cache().get(&key);
            if let Some(result) = cached {
                results.insert(edge_id.clone(), result);
                continue;
            }
            self.computations.fetch_add(1, Ordering::Relaxed);
            match RouteJob::prepare(&snapshot, edge, operation, &options) {
                Ok(job) => pending.push((job, key)),
                Err(degraded) => {
                    results.insert(edge_id.clone(), self.collapse(Err(degraded)));
                }
            }
        }

        let chunk_size = if options.enable_batching { options.batch_size.max(1) } else { 1 };
        let mut remaining = pending.len();
        for (index, chunk) in pending.chunks(chunk_size).enumerate() {
            if index > 0 {
                tokio::task::yield_now().await;
            }
            self.monitor.record_queue_depth(self.executor.queue_depth() + remaining);
            remaining -= chunk.len();

            let payload = match chunk {
                [(job, _)] if !options.enable_batching => TaskPayload::Route(Box::new(job.clone())),
                _ => TaskPayload::Batch(chunk.iter().map(|(job, _)| job.clone()).collect()),
            };
            let execution = self.executor.run(payload, options.worker_timeout()).await;
            if let Some(warning) = execution.warning {
                self.monitor.report_warning(warning);
            }
            let mut replies: HashMap<EdgeId, Routed> = match execution.reply {
                TaskReply::Route(routed) => chunk.iter().map(|(job, _)| (job.edge_id.clone(), routed.clone())).collect(),
                TaskReply::Batch(replies) => replies.into_iter().collect(),
            };
            let cacheable = self.cacheable(execution.mode);
            for (job, key) in chunk {
                let routed = replies.remove(&job.edge_id).unwrap_or_else(|| fallback_route(job));
                let result = self.collapse(routed);
                if cacheable {
                    self.cache().put(key.clone(), result.clone());
                }
                results.insert(job.edge_id.clone(), result);
            }
        }

        let recount_crossings = operation == Operation::Intersections && options.enable_intersection_detection;
        separate_overlaps(&mut results, options.grid_size, &snapshot, recount_crossings);

        for (edge_id, result) in &results {
            if let Some(edge) = snapshot.edge(edge_id) {
                self.write_back(edge, operation, result);
            }
        }
        if !results.is_empty() {
            self.monitor.record_processing(operation, started.elapsed().div_f64(results.len() as f64));
        }
        for in_flight in leading {
            if let Some(result) = results.get(&in_flight.edge_id) {
                in_flight.finish(result);
            }
        }
        self.after_routing();

        for (edge_id, receiver) in following {
            let result = match receiver.await {
                Ok(result) => result,
                Err(_) => self.route_edge(&edge_id, operation).await?,
            };
            results.insert(edge_id, result);
        }
        Ok(results)
    }

    fn collapse(&self, routed: Routed) -> RouteResult {
        collapse(routed, |warning| self.monitor.report_warning(warning))
    }

    /// Results from a transient fallback are not cached, so the next request gets another
    /// chance at a full route.
    fn cacheable(&self, mode: ExecutionMode) -> bool {
        mode == ExecutionMode::Worker || self.executor.mode() == ExecutionMode::Fallback
    }

    fn write_back(&self, edge: &Edge, operation: Operation, result: &RouteResult) {
        let Some(sink) = &self.sink else {
            return;
        };
        if !operation.writes_back()
            || edge.is_pinned()
            || matches!(result.strategy, RouteStrategy::Degenerate | RouteStrategy::Pinned)
            || edge.waypoints.as_slice() == result.waypoints()
        {
            return;
        }
        sink.write_waypoints(&edge.id, result.waypoints().to_vec());
    }

    fn observe(&self) {
        let (hit_rate, bytes) = {
            let cache = self.cache();
            (cache.counters().hit_rate(), cache.estimated_bytes())
        };
        self.monitor.record_hit_rate(hit_rate);
        self.monitor.record_memory(bytes);
        self.monitor.record_queue_depth(self.executor.queue_depth());
        self.monitor.set_edge_count(self.registered().len());
    }

    /// Records the end of a routing call and runs the rule table every
    /// `evaluateEvery` calls.
    fn after_routing(&self) {
        self.observe();
        let every = u64::from(self.monitor.config().evaluate_every);
        let calls = self.routing_calls.fetch_add(1, Ordering::Relaxed) + 1;
        if every > 0 && calls % every == 0 {
            let actions = self.monitor.evaluate(&self.options());
            self.apply(&actions);
        }
    }

    pub fn get_statistics(&self) -> Statistics {
        let (cache_size, counters) = {
            let cache = self.cache();
            (cache.len(), cache.counters())
        };
        Statistics {
            cache_size,
            cache_hits: counters.hits,
            cache_misses: counters.misses,
            cache_hit_rate: counters.hit_rate(),
            average_processing_time: self.monitor.average_processing_ms().unwrap_or(0.0),
            queue_depth: self.executor.queue_depth(),
            registered_edges: self.registered().len(),
            computations: self.computations.load(Ordering::Relaxed),
            execution_mode: self.executor.mode(),
            tasks: self.executor.counters(),
            warnings: self.monitor.warnings_reported(),
            recommendations: self.monitor.recommendations(),
        }
    }

    /// Evaluates the monitor's rules right away and applies the resulting actions.
    /// Returns every action, including the ones that are only recommendations.
    ///
    /// Routing calls already do this every `evaluateEvery` calls.
    pub fn apply_optimizations(&self) -> Vec<OptimizationAction> {
        self.observe();
        let actions = self.monitor.evaluate(&self.options());
        self.apply(&actions);
        actions
    }

    fn apply(&self, actions: &[OptimizationAction]) {
        if actions.is_empty() {
            return;
        }
        let mut options = self.options();
        for action in actions {
            match *action {
                OptimizationAction::IncreaseDebounce { to_ms, .. } => options.debounce_time_ms = to_ms,
                OptimizationAction::ClearCache => self.cache().clear(),
                OptimizationAction::EnableBatching => options.enable_batching = true,
                OptimizationAction::ShrinkBatchSize { to, .. } => options.batch_size = to,
                OptimizationAction::DisableIntersectionDetection => options.enable_intersection_detection = false,
                OptimizationAction::SuggestVirtualization { edge_count } => {
                    tracing::info!(edge_count, "diagram would benefit from virtualized routing");
                    continue;
                }
            }
            tracing::info!(?action, "applied routing optimization");
        }
        *self.options.lock().expect("routing options lock poisoned") = options;
    }
}

/// Runs the overlap pass over every auto-routed result and rebuilds the ones it moved.
/// Crossings of a moved route are counted again against the other edges in `snapshot`.
fn separate_overlaps(
    results: &mut BTreeMap<EdgeId, RouteResult>,
    step: f64,
    snapshot: &DiagramSnapshot,
    recount_crossings: bool,
) {
    let movable = results
        .iter()
        .filter(|(_, result)| {
            result.points.len() >= 2
                && !matches!(result.strategy, RouteStrategy::Pinned | RouteStrategy::Degenerate)
        })
        .map(|(edge_id, result)| (edge_id.clone(), result.points.clone()))
        .collect::<BTreeMap<_, Vec<Point>>>();

    for (edge_id, points) in merge_overlaps(&movable, step) {
        let Some(result) = results.get_mut(&edge_id) else {
            continue;
        };
        if result.points == points {
            continue;
        }
        let mut moved = RouteResult::new(points, result.strategy);
        moved.pattern = result.pattern;
        if !result.virtual_bends.is_empty() {
            moved.virtual_bends = segment_midpoints(&moved.points);
        }
        if recount_crossings {
            let others = other_geometry(snapshot, &edge_id);
            moved.intersections = find_intersections(&moved.points, others.iter().map(Vec::as_slice));
        }
        *result = moved;
    }
}
