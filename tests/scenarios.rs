// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use orthoroute::model::{DiagramSnapshot, Edge, EdgeId, Node, NodeId, Point, Rect};
use orthoroute::route::pattern::PatternKind;
use orthoroute::route::{
    compute_route, fallback_route, find_path, ObstacleIndex, ObstacleParams, RouteJob, SearchOutcome,
    SearchScratch,
};
use orthoroute::{InMemoryDiagram, Operation, RouteResult, RoutingEngine, RoutingOptions};

fn nid(id: &str) -> NodeId {
    NodeId::new(id).expect("node id")
}

fn eid(id: &str) -> EdgeId {
    EdgeId::new(id).expect("edge id")
}

fn node(id: &str, x: f64, y: f64) -> Node {
    Node::new(nid(id), x, y, 100.0, 60.0)
}

fn scene(nodes: Vec<Node>) -> DiagramSnapshot {
    DiagramSnapshot::new(nodes, [Edge::new(eid("e"), nid("a"), nid("b"))])
}

fn assert_orthogonal(points: &[Point]) {
    for pair in points.windows(2) {
        let same_x = (pair[0].x - pair[1].x).abs() <= 1e-6;
        let same_y = (pair[0].y - pair[1].y).abs() <= 1e-6;
        assert!(same_x != same_y, "segment {:?} -> {:?} is not axis-aligned", pair[0], pair[1]);
    }
}

async fn route_once(snapshot: DiagramSnapshot) -> RouteResult {
    let diagram = Arc::new(InMemoryDiagram::new(snapshot));
    let engine = RoutingEngine::in_memory(diagram, RoutingOptions::default()).expect("engine");
    engine.register_edge(eid("e"));
    engine.route_edge(&eid("e"), Operation::FullRoute).await.expect("route")
}

#[tokio::test]
async fn diagonal_neighbours_get_two_waypoints() {
    let result = route_once(scene(vec![node("a", 0.0, 0.0), node("b", 300.0, 300.0)])).await;
    assert!(matches!(result.pattern, Some(PatternKind::ZShape | PatternKind::SShape)));
    assert_eq!(result.waypoints().len(), 2);
    assert!(result.orthogonal);
    assert_orthogonal(&result.points);
}

#[tokio::test]
async fn aligned_neighbours_connect_directly() {
    let result = route_once(scene(vec![node("a", 0.0, 0.0), node("b", 400.0, 0.0)])).await;
    assert_eq!(result.pattern, Some(PatternKind::Direct));
    assert!(result.waypoints().is_empty());
}

#[tokio::test]
async fn obstacle_on_the_straight_line_is_avoided() {
    let blocker = Node::new(nid("c"), 200.0, -20.0, 60.0, 100.0);
    let snapshot = scene(vec![node("a", 0.0, 0.0), blocker.clone(), node("b", 400.0, 0.0)]);
    let options = RoutingOptions::default();
    let params = ObstacleParams {
        grid_size: options.grid_size,
        node_margin: options.node_margin,
        edge_margin: options.edge_margin,
    };
    let index = ObstacleIndex::build(&snapshot, params, &[nid("a"), nid("b")], &[eid("e")]);

    let search = find_path(Point::new(120.0, 30.0), Point::new(380.0, 30.0), &index, options.max_iterations);
    assert_eq!(search.outcome, SearchOutcome::Found);
    assert!(search.points.len() > 2);
    assert!(!index.path_collides(&search.points, &[]));

    let result = route_once(snapshot).await;
    assert!(!result.waypoints().is_empty());
    assert!(!index.path_collides(&result.points, &[]));
    let grown: Rect = blocker.bounds().expand(options.node_margin);
    assert!(result.points.iter().all(|p| !grown.contains_strict(*p)));
    assert_orthogonal(&result.points);
}

#[test]
fn zero_iterations_yield_the_fallback_path() {
    let blocker = Node::new(nid("c"), 200.0, -20.0, 60.0, 100.0);
    let snapshot = scene(vec![node("a", 0.0, 0.0), blocker, node("b", 400.0, 0.0)]);
    let params = ObstacleParams { grid_size: 20.0, node_margin: 10.0, edge_margin: 5.0 };
    let index = ObstacleIndex::build(&snapshot, params, &[nid("a"), nid("b")], &[eid("e")]);
    let search = find_path(Point::new(120.0, 30.0), Point::new(380.0, 90.0), &index, 0);
    assert_eq!(search.outcome, SearchOutcome::Exhausted);
    assert_eq!(
        search.points,
        vec![Point::new(120.0, 40.0), Point::new(380.0, 40.0), Point::new(380.0, 100.0)]
    );
    assert_orthogonal(&search.points);
}

#[test]
fn every_route_over_a_scene_grid_is_orthogonal() {
    let options = RoutingOptions::default();
    let mut scratch = SearchScratch::default();
    let offsets = [-390.0, -170.0, -60.0, 0.0, 45.0, 130.0, 260.0, 410.0];
    for dx in offsets {
        for dy in offsets {
            let snapshot = scene(vec![
                node("a", 0.0, 0.0),
                node("b", dx, dy),
                Node::new(nid("wall"), dx / 2.0 + 10.0, dy / 2.0 - 40.0, 40.0, 80.0),
            ]);
            let edge = snapshot.edge(&eid("e")).expect("edge");
            for op in Operation::ALL {
                let routed = match RouteJob::prepare(&snapshot, edge, op, &options) {
                    Ok(job) => [compute_route(&job, &mut scratch), fallback_route(&job)],
                    Err(degraded) => [Err(degraded.clone()), Err(degraded)],
                };
                for outcome in routed {
                    let result = match outcome {
                        Ok(result) => result,
                        Err(degraded) => degraded.fallback,
                    };
                    assert_orthogonal(&result.points);
                    assert!(result.orthogonal, "dx={dx} dy={dy} op={op}");
                }
            }
        }
    }
}
