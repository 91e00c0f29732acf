// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Background routing worker.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

use rayon::prelude::*;

use super::executor::ReplySink;
use super::protocol::{ExecError, TaskId, TaskPayload, TaskReply, WorkerRequest, WorkerResponse};
use crate::route::{compute_route, SearchScratch};

/// Accepts requests for one running worker. Replies travel through the [`ReplySink`]
/// handed to the factory.
pub trait Worker: Send + Sync {
    fn post(&self, request: WorkerRequest) -> Result<(), ExecError>;
}

/// Starts workers. The executor calls this lazily and again after a worker is dropped.
pub trait WorkerFactory: Send + Sync {
    fn start(&self, replies: ReplySink) -> Result<Arc<dyn Worker>, String>;
}

/// Runs tasks on a dedicated OS thread; batches fan out over the rayon pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadWorkerFactory;

impl WorkerFactory for ThreadWorkerFactory {
    fn start(&self, replies: ReplySink) -> Result<Arc<dyn Worker>, String> {
        let worker = ThreadWorker::spawn(replies).map_err(|err| format!("spawn routing worker: {err}"))?;
        Ok(Arc::new(worker))
    }
}

#[derive(Debug, Default)]
struct WorkerQueue {
    tasks: VecDeque<(TaskId, TaskPayload)>,
    shutdown: bool,
}

#[derive(Debug)]
struct WorkerInner {
    state: Mutex<WorkerQueue>,
    cv: Condvar,
}

pub struct ThreadWorker {
    inner: Arc<WorkerInner>,
}

impl fmt::Debug for ThreadWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadWorker").finish_non_exhaustive()
    }
}

impl ThreadWorker {
    pub fn spawn(replies: ReplySink) -> std::io::Result<Self> {
        let inner =
            Arc::new(WorkerInner { state: Mutex::new(WorkerQueue::default()), cv: Condvar::new() });

        std::thread::Builder::new().name("orthoroute-route-worker".to_owned()).spawn({
            let inner = inner.clone();
            move || run_worker(inner, replies)
        })?;

        Ok(Self { inner })
    }
}

impl Worker for ThreadWorker {
    fn post(&self, request: WorkerRequest) -> Result<(), ExecError> {
        let mut state = self.inner.state.lock().expect("route worker lock poisoned");
        match request {
            WorkerRequest::Run { task_id, payload } => {
                if state.shutdown {
                    return Err(ExecError::Disconnected { task_id: Some(task_id) });
                }
                state.tasks.push_back((task_id, payload));
                self.inner.cv.notify_one();
            }
            WorkerRequest::Shutdown => {
                state.shutdown = true;
                self.inner.cv.notify_all();
            }
        }
        Ok(())
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        let _ = self.post(WorkerRequest::Shutdown);
    }
}

fn run_worker(inner: Arc<WorkerInner>, replies: ReplySink) {
    let mut scratch = SearchScratch::default();
    loop {
        let (task_id, payload) = {
            let mut state = inner.state.lock().expect("route worker lock poisoned");
            loop {
                if let Some(task) = state.tasks.pop_front() {
                    break task;
                }
                if state.shutdown {
                    tracing::debug!("route worker stopped");
                    return;
                }
                state = inner.cv.wait(state).expect("route worker cv poisoned");
            }
        };

        let response = match catch_unwind(AssertUnwindSafe(|| execute(&payload, &mut scratch))) {
            Ok(reply) => WorkerResponse::Completed { task_id, reply },
            Err(panic) => {
                // Buffers may be half-written.
                scratch = SearchScratch::default();
                WorkerResponse::Failed { task_id, reason: panic_message(panic.as_ref()) }
            }
        };
        replies.deliver(response);
    }
}

/// Runs one payload to completion. Batch jobs are routed in parallel, each rayon task
/// with its own search buffers.
pub fn execute(payload: &TaskPayload, scratch: &mut SearchScratch) -> TaskReply {
    match payload {
        TaskPayload::Route(job) => TaskReply::Route(compute_route(job, scratch)),
        TaskPayload::Batch(jobs) => TaskReply::Batch(
            jobs.par_iter()
                .map_init(SearchScratch::default, |scratch, job| (job.edge_id.clone(), compute_route(job, scratch)))
                .collect(),
        ),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_owned()
    }
}
