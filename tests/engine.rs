// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orthoroute::exec::worker::execute;
use orthoroute::exec::{ExecError, ExecutionMode, ReplySink, Worker, WorkerFactory, WorkerRequest, WorkerResponse};
use orthoroute::model::{DiagramSnapshot, Edge, EdgeId, Node, NodeId};
use orthoroute::route::{RouteStrategy, SearchScratch};
use orthoroute::{InMemoryDiagram, Operation, RoutingEngine, RoutingOptions};

fn nid(id: &str) -> NodeId {
    NodeId::new(id).expect("node id")
}

fn eid(id: &str) -> EdgeId {
    EdgeId::new(id).expect("edge id")
}

fn diagram() -> Arc<InMemoryDiagram> {
    Arc::new(InMemoryDiagram::new(DiagramSnapshot::new(
        [Node::new(nid("a"), 0.0, 0.0, 100.0, 60.0), Node::new(nid("b"), 300.0, 300.0, 100.0, 60.0)],
        [Edge::new(eid("e"), nid("a"), nid("b"))],
    )))
}

/// Never answers.
struct Mute;

impl Worker for Mute {
    fn post(&self, _request: WorkerRequest) -> Result<(), ExecError> {
        Ok(())
    }
}

/// Answers from a helper thread after a pause; counts how many tasks it ran.
struct Slow {
    replies: ReplySink,
    runs: Arc<AtomicUsize>,
}

impl Worker for Slow {
    fn post(&self, request: WorkerRequest) -> Result<(), ExecError> {
        if let WorkerRequest::Run { task_id, payload } = request {
            let replies = self.replies.clone();
            let runs = self.runs.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(25));
                runs.fetch_add(1, Ordering::SeqCst);
                let reply = execute(&payload, &mut SearchScratch::default());
                replies.deliver(WorkerResponse::Completed { task_id, reply });
            });
        }
        Ok(())
    }
}

enum Factory {
    Mute,
    Slow(Arc<AtomicUsize>),
}

impl WorkerFactory for Factory {
    fn start(&self, replies: ReplySink) -> Result<Arc<dyn Worker>, String> {
        Ok(match self {
            Self::Mute => Arc::new(Mute),
            Self::Slow(runs) => Arc::new(Slow { replies, runs: runs.clone() }),
        })
    }
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() {
    let engine = RoutingEngine::in_memory(diagram(), RoutingOptions::default()).expect("engine");
    engine.register_edge(eid("e"));

    let first = engine.route_edge(&eid("e"), Operation::FullRoute).await.expect("first");
    let second = engine.route_edge(&eid("e"), Operation::FullRoute).await.expect("second");
    assert_eq!(first, second);
    assert_eq!(first.strategy, RouteStrategy::Pattern);

    let stats = engine.get_statistics();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.execution_mode, ExecutionMode::Worker);
    assert_eq!(stats.tasks.succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn unresponsive_worker_resolves_within_the_timeout() {
    let diagram = diagram();
    let options = RoutingOptions { worker_timeout_ms: 200, ..RoutingOptions::default() };
    let engine = RoutingEngine::builder(diagram.clone())
        .with_sink(diagram)
        .with_options(options)
        .with_worker_factory(Arc::new(Factory::Mute))
        .build()
        .expect("engine");
    engine.register_edge(eid("e"));

    let started = tokio::time::Instant::now();
    let result = engine.route_edge(&eid("e"), Operation::FullRoute).await.expect("route");
    assert!(started.elapsed() <= Duration::from_millis(200));
    assert_eq!(result.strategy, RouteStrategy::DirectFallback);
    assert!(result.used_fallback);
    assert!(result.orthogonal);
    assert_eq!(engine.get_statistics().tasks.timed_out, 1);
}

#[tokio::test]
async fn concurrent_requests_for_one_edge_run_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let diagram = diagram();
    let engine = RoutingEngine::builder(diagram.clone())
        .with_sink(diagram)
        .with_worker_factory(Arc::new(Factory::Slow(runs.clone())))
        .build()
        .expect("engine");
    assert!(engine.register_edge(eid("e")));
    assert!(!engine.register_edge(eid("e")));

    let id = eid("e");
    let (first, second) =
        tokio::join!(engine.route_edge(&id, Operation::FullRoute), engine.route_edge(&id, Operation::FullRoute));
    assert_eq!(first.expect("first"), second.expect("second"));
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(engine.get_statistics().computations, 1);
}
