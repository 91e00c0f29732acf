// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use criterion::Criterion;

use pprof::criterion::{Output, PProfProfiler};

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|raw| raw.trim().parse::<T>().ok())
}

/// Criterion settings shared by all routing benches.
///
/// `ROUTE_BENCH_PROFILE=0` turns the flamegraph profiler off; the other knobs are
/// `ROUTE_BENCH_PROFILE_FREQ`, `ROUTE_BENCH_SAMPLES`, `ROUTE_BENCH_WARMUP_SECS` and
/// `ROUTE_BENCH_MEASURE_SECS`.
pub fn criterion() -> Criterion {
    let sample_size = env_parse::<usize>("ROUTE_BENCH_SAMPLES").unwrap_or(50).clamp(10, 200);
    let warmup = env_parse::<u64>("ROUTE_BENCH_WARMUP_SECS").unwrap_or(2).clamp(1, 60);
    let measure = env_parse::<u64>("ROUTE_BENCH_MEASURE_SECS").unwrap_or(5).clamp(1, 120);

    let criterion = Criterion::default()
        .sample_size(sample_size)
        .warm_up_time(Duration::from_secs(warmup))
        .measurement_time(Duration::from_secs(measure));

    if env_parse::<u8>("ROUTE_BENCH_PROFILE") == Some(0) {
        return criterion;
    }
    let frequency = env_parse::<i32>("ROUTE_BENCH_PROFILE_FREQ").unwrap_or(100).clamp(1, 1000);
    criterion.with_profiler(PProfProfiler::new(frequency, Output::Flamegraph(None)))
}
