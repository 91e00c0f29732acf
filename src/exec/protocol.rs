// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Typed messages exchanged with the routing worker.

use std::fmt;
use std::time::Duration;

use crate::model::EdgeId;
use crate::route::result::Routed;
use crate::route::{fallback_route, RouteJob};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum TaskPayload {
    Route(Box<RouteJob>),
    Batch(Vec<RouteJob>),
}

impl TaskPayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Route(_) => 1,
            Self::Batch(jobs) => jobs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obstacle-blind routing on the calling thread.
    pub fn run_fallback(&self) -> TaskReply {
        match self {
            Self::Route(job) => TaskReply::Route(fallback_route(job)),
            Self::Batch(jobs) => {
                TaskReply::Batch(jobs.iter().map(|job| (job.edge_id.clone(), fallback_route(job))).collect())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum WorkerRequest {
    Run { task_id: TaskId, payload: TaskPayload },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskReply {
    Route(Routed),
    /// One entry per job, in submission order.
    Batch(Vec<(EdgeId, Routed)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerResponse {
    Completed { task_id: TaskId, reply: TaskReply },
    Failed { task_id: TaskId, reason: String },
}

impl WorkerResponse {
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Completed { task_id, .. } | Self::Failed { task_id, .. } => *task_id,
        }
    }
}

/// Lifecycle of a submitted task. Terminal states are only ever counted, the pending
/// table forgets the task once it gets there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Dispatched,
    Succeeded,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecError {
    /// No worker could be started, or the executor gave up on workers.
    Unavailable { reason: String },
    Timeout { task_id: TaskId, after: Duration },
    /// The worker caught a panic while running the task.
    WorkerFailed { task_id: TaskId, reason: String },
    /// The worker went away before replying.
    Disconnected { task_id: Option<TaskId> },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "routing worker unavailable: {reason}"),
            Self::Timeout { task_id, after } => {
                write!(f, "{task_id} timed out after {} ms", after.as_millis())
            }
            Self::WorkerFailed { task_id, reason } => write!(f, "{task_id} failed in worker: {reason}"),
            Self::Disconnected { task_id: Some(task_id) } => {
                write!(f, "routing worker disconnected before answering {task_id}")
            }
            Self::Disconnected { task_id: None } => write!(f, "routing worker disconnected"),
        }
    }
}

impl std::error::Error for ExecError {}
