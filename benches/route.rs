// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use orthoroute::route::{compute_route, ObstacleIndex, ObstacleParams, RouteJob, SearchScratch};
use orthoroute::{InMemoryDiagram, Operation, RoutingEngine, RoutingOptions};

mod fixtures;
mod profiler;

// Benchmark identity (keep stable):
// - Group names in this file: `route.obstacles`, `route.single`, `route.batch`
// - Case IDs (after the `/`) stay stable across refactors so results remain comparable.
fn benches_route(c: &mut Criterion) {
    let options = RoutingOptions::default();
    let params = ObstacleParams {
        grid_size: options.grid_size,
        node_margin: options.node_margin,
        edge_margin: options.edge_margin,
    };

    {
        let mut group = c.benchmark_group("route.obstacles");
        for case in fixtures::Case::ALL {
            let snapshot = fixtures::fixture(case);
            group.throughput(Throughput::Elements(snapshot.nodes().len() as u64));
            group.bench_function(case.id(), move |b| {
                b.iter(|| {
                    let index = ObstacleIndex::build(black_box(&snapshot), params, &[], &[]);
                    black_box(index.len())
                })
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("route.single");
        for case in fixtures::Case::ALL {
            let snapshot = fixtures::fixture(case);
            let jobs = snapshot
                .edges()
                .values()
                .filter_map(|edge| RouteJob::prepare(&snapshot, edge, Operation::FullRoute, &options).ok())
                .collect::<Vec<_>>();
            group.throughput(Throughput::Elements(jobs.len() as u64));
            group.bench_function(case.id(), move |b| {
                let mut scratch = SearchScratch::default();
                b.iter(|| {
                    let mut acc = 0u64;
                    for job in &jobs {
                        let result = match compute_route(black_box(job), &mut scratch) {
                            Ok(result) => result,
                            Err(degraded) => degraded.fallback,
                        };
                        acc = acc.wrapping_add(result.points.len() as u64);
                        acc = acc.wrapping_add(result.total_length as u64);
                    }
                    black_box(acc)
                })
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("route.batch");
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime");
        for case in [fixtures::Case::Small, fixtures::Case::MediumDense] {
            let snapshot = fixtures::fixture(case);
            let ids = snapshot.edges().keys().cloned().collect::<Vec<_>>();
            group.throughput(Throughput::Elements(ids.len() as u64));
            group.bench_function(case.id(), |b| {
                b.iter_batched(
                    || {
                        let diagram = Arc::new(InMemoryDiagram::new(snapshot.clone()));
                        let engine = RoutingEngine::builder(diagram).build().expect("engine");
                        engine.register_edges(ids.iter().cloned());
                        engine
                    },
                    |engine| {
                        let routes = runtime.block_on(engine.batch_route(&ids, Operation::FullRoute)).expect("batch");
                        black_box(routes.len())
                    },
                    BatchSize::PerIteration,
                )
            });
        }
        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_route
}
criterion_main!(benches);
