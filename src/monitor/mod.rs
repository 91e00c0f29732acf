// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Rolling performance statistics and the adaptation rules built on them.
//!
//! The monitor never fails: listeners that panic are logged and skipped.

pub mod ring;
pub mod rules;

use std::collections::BTreeSet;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use ring::RingBuffer;
pub use rules::{AlertKind, Observations, OptimizationAction};

use crate::config::RoutingOptions;
use crate::route::{Operation, RoutingWarning};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    pub processing_warn_ms: f64,
    pub processing_critical_ms: f64,
    pub memory_warn_bytes: u64,
    pub queue_warn_depth: usize,
    pub edge_ceiling: usize,
    /// Samples kept per rolling window.
    pub window_size: usize,
    /// Completed routing calls between automatic rule evaluations. Zero leaves
    /// evaluation to explicit calls.
    pub evaluate_every: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            processing_warn_ms: 16.0,
            processing_critical_ms: 50.0,
            memory_warn_bytes: 8 * 1024 * 1024,
            queue_warn_depth: 8,
            edge_ceiling: 1000,
            window_size: 64,
            evaluate_every: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A rule started to hold. Sent once; the rule has to clear before it alerts again.
    Threshold { kind: AlertKind, value: f64, advice: &'static str },
    /// Something the router recovered from.
    Routing(RoutingWarning),
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold { kind, value, advice } => write!(f, "{} ({value:.2}): {advice}", kind.as_str()),
            Self::Routing(warning) => write!(f, "{warning}"),
        }
    }
}

pub type AlertListener = Box<dyn Fn(&Alert) + Send + Sync>;

#[derive(Debug)]
struct MonitorState {
    processing: Vec<RingBuffer>,
    memory: RingBuffer,
    queue: RingBuffer,
    hit_rate: RingBuffer,
    edge_count: usize,
    active: BTreeSet<AlertKind>,
    warnings: u64,
}

pub struct PerformanceMonitor {
    config: MonitorConfig,
    state: Mutex<MonitorState>,
    listeners: Mutex<Vec<AlertListener>>,
}

impl fmt::Debug for PerformanceMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerformanceMonitor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

fn slot(operation: Operation) -> usize {
    Operation::ALL.iter().position(|op| *op == operation).unwrap_or(0)
}

impl PerformanceMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        let window = config.window_size;
        let state = MonitorState {
            processing: Operation::ALL.iter().map(|_| RingBuffer::new(window)).collect(),
            memory: RingBuffer::new(window),
            queue: RingBuffer::new(window),
            hit_rate: RingBuffer::new(window),
            edge_count: 0,
            active: BTreeSet::new(),
            warnings: 0,
        };
        Self { config, state: Mutex::new(state), listeners: Mutex::new(Vec::new()) }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MonitorState> {
        self.state.lock().expect("monitor lock poisoned")
    }

    pub fn record_processing(&self, operation: Operation, elapsed: Duration) {
        self.state().processing[slot(operation)].push(elapsed.as_secs_f64() * 1_000.0);
    }

    pub fn record_memory(&self, bytes: usize) {
        self.state().memory.push(bytes as f64);
    }

    pub fn record_queue_depth(&self, depth: usize) {
        self.state().queue.push(depth as f64);
    }

    pub fn record_hit_rate(&self, rate: f64) {
        self.state().hit_rate.push(rate);
    }

    pub fn set_edge_count(&self, count: usize) {
        self.state().edge_count = count;
    }

    /// Mean over every operation's window, in milliseconds.
    pub fn average_processing_ms(&self) -> Option<f64> {
        let state = self.state();
        let (sum, count) = state
            .processing
            .iter()
            .flat_map(|ring| ring.iter())
            .fold((0.0, 0usize), |(sum, count), ms| (sum + ms, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn average_for(&self, operation: Operation) -> Option<f64> {
        self.state().processing[slot(operation)].mean()
    }

    pub fn average_hit_rate(&self) -> Option<f64> {
        self.state().hit_rate.mean()
    }

    pub fn observations(&self) -> Observations {
        let average_processing_ms = self.average_processing_ms();
        let state = self.state();
        Observations {
            average_processing_ms,
            memory_bytes: state.memory.last(),
            queue_depth: state.queue.last(),
            queue_trend: state.queue.slope(),
            queue_samples: state.queue.len(),
            edge_count: state.edge_count,
        }
    }

    /// Runs the rule table against current observations. Returns every action whose
    /// condition holds now; alerts go out only for conditions that were not already
    /// holding at the previous evaluation.
    pub fn evaluate(&self, options: &RoutingOptions) -> Vec<OptimizationAction> {
        let obs = self.observations();
        let mut actions = Vec::new();
        let mut raised = Vec::new();
        {
            let mut state = self.state();
            for rule in rules::RULES {
                match (rule.tripped)(&obs, &self.config) {
                    Some(value) => {
                        if state.active.insert(rule.kind) {
                            raised.push(Alert::Threshold { kind: rule.kind, value, advice: rule.advice });
                        }
                        actions.extend((rule.action)(&obs, options));
                    }
                    None => {
                        state.active.remove(&rule.kind);
                    }
                }
            }
        }
        for alert in &raised {
            self.emit(alert);
        }
        actions
    }

    pub fn active_alerts(&self) -> Vec<AlertKind> {
        self.state().active.iter().copied().collect()
    }

    /// Advice for every condition currently holding.
    pub fn recommendations(&self) -> Vec<String> {
        self.state().active.iter().map(|kind| rules::advice(*kind).to_owned()).collect()
    }

    pub fn report_warning(&self, warning: RoutingWarning) {
        self.state().warnings += 1;
        self.emit(&Alert::Routing(warning));
    }

    pub fn warnings_reported(&self) -> u64 {
        self.state().warnings
    }

    /// Listeners must not subscribe from inside a callback.
    pub fn subscribe(&self, listener: impl Fn(&Alert) + Send + Sync + 'static) {
        self.listeners.lock().expect("monitor listeners lock poisoned").push(Box::new(listener));
    }

    fn emit(&self, alert: &Alert) {
        let listeners = self.listeners.lock().expect("monitor listeners lock poisoned");
        for (index, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(alert))).is_err() {
                tracing::error!(listener = index, %alert, "alert listener panicked");
            }
        }
    }
}
