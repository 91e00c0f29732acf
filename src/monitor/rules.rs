// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Condition → action table evaluated by the monitor.

use serde::Serialize;

use super::MonitorConfig;
use crate::config::RoutingOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertKind {
    SlowProcessing,
    CriticalProcessing,
    MemoryPressure,
    QueueBacklog,
    QueueGrowing,
    TooManyEdges,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SlowProcessing => "slowProcessing",
            Self::CriticalProcessing => "criticalProcessing",
            Self::MemoryPressure => "memoryPressure",
            Self::QueueBacklog => "queueBacklog",
            Self::QueueGrowing => "queueGrowing",
            Self::TooManyEdges => "tooManyEdges",
        }
    }
}

/// A change the monitor proposes. Everything except [`SuggestVirtualization`] is applied
/// by the engine; virtualization is only ever recommended.
///
/// [`SuggestVirtualization`]: OptimizationAction::SuggestVirtualization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum OptimizationAction {
    #[serde(rename_all = "camelCase")]
    IncreaseDebounce { from_ms: u64, to_ms: u64 },
    ClearCache,
    EnableBatching,
    ShrinkBatchSize { from: usize, to: usize },
    DisableIntersectionDetection,
    #[serde(rename_all = "camelCase")]
    SuggestVirtualization { edge_count: usize },
}

impl OptimizationAction {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, Self::SuggestVirtualization { .. })
    }
}

/// What the monitor currently knows, condensed from its rolling windows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observations {
    pub average_processing_ms: Option<f64>,
    pub memory_bytes: Option<f64>,
    pub queue_depth: Option<f64>,
    /// Queue depth change per sample.
    pub queue_trend: f64,
    pub queue_samples: usize,
    pub edge_count: usize,
}

pub(crate) struct Rule {
    pub kind: AlertKind,
    pub advice: &'static str,
    /// Measured value when the condition holds.
    pub tripped: fn(&Observations, &MonitorConfig) -> Option<f64>,
    pub action: fn(&Observations, &RoutingOptions) -> Option<OptimizationAction>,
}

/// Fewest queue samples a trend is trusted on.
const MIN_TREND_SAMPLES: usize = 4;

pub(crate) const RULES: &[Rule] = &[
    Rule {
        kind: AlertKind::SlowProcessing,
        advice: "routing is slower than the frame budget; the debounce interval was raised",
        tripped: |obs, cfg| obs.average_processing_ms.filter(|ms| *ms > cfg.processing_warn_ms),
        action: |_, options| {
            let from_ms = options.debounce_time_ms;
            let to_ms = (from_ms + from_ms / 2).max(from_ms + 1).min(options.max_debounce_ms);
            (to_ms > from_ms).then_some(OptimizationAction::IncreaseDebounce { from_ms, to_ms })
        },
    },
    Rule {
        kind: AlertKind::CriticalProcessing,
        advice: "routing is critically slow; intersection detection was turned off",
        tripped: |obs, cfg| obs.average_processing_ms.filter(|ms| *ms > cfg.processing_critical_ms),
        action: |_, options| {
            options
                .enable_intersection_detection
                .then_some(OptimizationAction::DisableIntersectionDetection)
        },
    },
    Rule {
        kind: AlertKind::MemoryPressure,
        advice: "route cache exceeded its memory budget and was cleared",
        tripped: |obs, cfg| obs.memory_bytes.filter(|bytes| *bytes > cfg.memory_warn_bytes as f64),
        action: |_, _| Some(OptimizationAction::ClearCache),
    },
    Rule {
        kind: AlertKind::QueueBacklog,
        advice: "routing requests are queueing up; batch mode is on",
        tripped: |obs, cfg| obs.queue_depth.filter(|depth| *depth > cfg.queue_warn_depth as f64),
        action: |_, options| (!options.enable_batching).then_some(OptimizationAction::EnableBatching),
    },
    Rule {
        kind: AlertKind::QueueGrowing,
        advice: "the routing queue keeps growing; batches were made smaller",
        tripped: |obs, _| {
            let growing = obs.queue_samples >= MIN_TREND_SAMPLES
                && obs.queue_trend > 0.0
                && obs.queue_depth.is_some_and(|depth| depth > 0.0);
            growing.then_some(obs.queue_trend)
        },
        action: |_, options| {
            let from = options.batch_size;
            (options.enable_batching && from > 1)
                .then_some(OptimizationAction::ShrinkBatchSize { from, to: (from / 2).max(1) })
        },
    },
    Rule {
        kind: AlertKind::TooManyEdges,
        advice: "the diagram has more edges than can be routed interactively; consider virtualizing",
        tripped: |obs, cfg| (obs.edge_count > cfg.edge_ceiling).then_some(obs.edge_count as f64),
        action: |obs, _| Some(OptimizationAction::SuggestVirtualization { edge_count: obs.edge_count }),
    },
];

pub(crate) fn advice(kind: AlertKind) -> &'static str {
    RULES.iter().find(|rule| rule.kind == kind).map_or("", |rule| rule.advice)
}
