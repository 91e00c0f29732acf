// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Task submission with timeouts, correlation and a permanent synchronous fallback.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;

use super::protocol::{ExecError, TaskId, TaskPayload, TaskReply, TaskState, WorkerRequest, WorkerResponse};
use super::worker::{Worker, WorkerFactory};
use crate::route::RoutingWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    /// Tasks go to a background worker (started on first use).
    Worker,
    /// Workers failed too often; everything is routed on the caller.
    Fallback,
}

#[derive(Debug)]
struct PendingTask {
    state: TaskState,
    reply: Option<oneshot::Sender<WorkerResponse>>,
}

#[derive(Debug, Default)]
struct PendingTasks {
    tasks: HashMap<TaskId, PendingTask>,
}

/// Worker-side handle for answering tasks. Replies for tasks nobody waits for any more
/// (timed out, cancelled) are dropped.
#[derive(Debug, Clone)]
pub struct ReplySink {
    pending: Arc<Mutex<PendingTasks>>,
}

impl ReplySink {
    pub fn deliver(&self, response: WorkerResponse) {
        let task_id = response.task_id();
        let sender = {
            let mut pending = self.pending.lock().expect("pending tasks lock poisoned");
            pending.tasks.remove(&task_id).and_then(|task| task.reply)
        };
        match sender {
            Some(sender) => {
                let _ = sender.send(response);
            }
            None => tracing::debug!(task = %task_id, "dropping reply for unknown task"),
        }
    }
}

/// Removes the pending entry when the waiting future finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingTasks>,
    task_id: TaskId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.tasks.remove(&self.task_id);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounters {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
}

struct Lifecycle {
    worker: Option<Arc<dyn Worker>>,
    failures: u32,
    max_failures: u32,
    mode: ExecutionMode,
    /// Set on the switch to fallback mode until someone reports it.
    unreported: Option<String>,
    counters: TaskCounters,
}

/// Result of [`Executor::run`]: a reply is always present.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub reply: TaskReply,
    pub mode: ExecutionMode,
    /// Present exactly once, on the call that switched to fallback mode.
    pub warning: Option<RoutingWarning>,
}

/// Sends routing tasks to a lazily started worker.
///
/// Startup failures, timeouts and lost workers count against one budget; a success
/// resets it. Once the budget is spent the executor stops starting workers for good
/// and every task is routed synchronously with the obstacle-blind fallback.
pub struct Executor {
    factory: Arc<dyn WorkerFactory>,
    lifecycle: Mutex<Lifecycle>,
    pending: Arc<Mutex<PendingTasks>>,
    next_task: AtomicU64,
}

impl Executor {
    pub fn new(factory: Arc<dyn WorkerFactory>, max_start_attempts: u32) -> Self {
        Self {
            factory,
            lifecycle: Mutex::new(Lifecycle {
                worker: None,
                failures: 0,
                max_failures: max_start_attempts,
                mode: ExecutionMode::Worker,
                unreported: None,
                counters: TaskCounters::default(),
            }),
            pending: Arc::new(Mutex::new(PendingTasks::default())),
            next_task: AtomicU64::new(1),
        }
    }

    pub fn set_max_start_attempts(&self, attempts: u32) {
        self.lifecycle().max_failures = attempts;
    }

    pub fn mode(&self) -> ExecutionMode {
        self.lifecycle().mode
    }

    pub fn counters(&self) -> TaskCounters {
        self.lifecycle().counters
    }

    /// Tasks submitted and not yet answered.
    pub fn queue_depth(&self) -> usize {
        self.pending.lock().expect("pending tasks lock poisoned").tasks.len()
    }

    /// State of a task still waiting for its reply.
    pub fn task_state(&self, task_id: TaskId) -> Option<TaskState> {
        let pending = self.pending.lock().expect("pending tasks lock poisoned");
        pending.tasks.get(&task_id).map(|task| task.state)
    }

    fn lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().expect("executor lifecycle lock poisoned")
    }

    fn reply_sink(&self) -> ReplySink {
        ReplySink { pending: self.pending.clone() }
    }

    fn ensure_worker(&self) -> Result<Arc<dyn Worker>, ExecError> {
        let mut life = self.lifecycle();
        if life.mode == ExecutionMode::Fallback {
            return Err(ExecError::Unavailable { reason: "fallback mode".to_owned() });
        }
        if let Some(worker) = &life.worker {
            return Ok(worker.clone());
        }
        if life.failures >= life.max_failures {
            let reason = "no worker start attempts left".to_owned();
            Self::enter_fallback(&mut life, &reason);
            return Err(ExecError::Unavailable { reason });
        }
        match self.factory.start(self.reply_sink()) {
            Ok(worker) => {
                tracing::debug!(attempt = life.failures + 1, "route worker started");
                life.worker = Some(worker.clone());
                Ok(worker)
            }
            Err(reason) => {
                Self::note_failure(&mut life, &reason, false);
                Err(ExecError::Unavailable { reason })
            }
        }
    }

    fn enter_fallback(life: &mut Lifecycle, reason: &str) {
        if life.mode == ExecutionMode::Fallback {
            return;
        }
        life.mode = ExecutionMode::Fallback;
        life.worker = None;
        life.unreported = Some(reason.to_owned());
        tracing::warn!(
            reason,
            failures = life.failures,
            "routing worker unavailable, switching to synchronous fallback"
        );
    }

    fn note_failure(life: &mut Lifecycle, reason: &str, keep_worker: bool) {
        life.failures += 1;
        if !keep_worker {
            life.worker = None;
        }
        tracing::debug!(reason, failures = life.failures, "route worker failure");
        if life.failures >= life.max_failures {
            Self::enter_fallback(life, reason);
        }
    }

    fn record_failure(&self, error: &ExecError) {
        let mut life = self.lifecycle();
        let keep_worker = matches!(error, ExecError::WorkerFailed { .. });
        match error {
            ExecError::Timeout { .. } => life.counters.timed_out += 1,
            _ => life.counters.failed += 1,
        }
        Self::note_failure(&mut life, &error.to_string(), keep_worker);
    }

    fn record_success(&self) {
        let mut life = self.lifecycle();
        life.failures = 0;
        life.counters.succeeded += 1;
    }

    /// Submits `payload` to the worker and waits at most `timeout` for the answer.
    pub async fn send_task(&self, payload: TaskPayload, timeout: Duration) -> Result<TaskReply, ExecError> {
        let worker = self.ensure_worker()?;
        let task_id = TaskId::new(self.next_task.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().expect("pending tasks lock poisoned");
            pending.tasks.insert(task_id, PendingTask { state: TaskState::Queued, reply: Some(sender) });
        }
        let _guard = PendingGuard { pending: &self.pending, task_id };
        self.lifecycle().counters.submitted += 1;

        if let Err(error) = worker.post(WorkerRequest::Run { task_id, payload }) {
            self.record_failure(&error);
            return Err(error);
        }
        if let Some(task) = self.pending.lock().expect("pending tasks lock poisoned").tasks.get_mut(&task_id) {
            task.state = TaskState::Dispatched;
        }

        let outcome = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(WorkerResponse::Completed { reply, .. })) => Ok(reply),
            Ok(Ok(WorkerResponse::Failed { task_id, reason })) => Err(ExecError::WorkerFailed { task_id, reason }),
            Ok(Err(_)) => Err(ExecError::Disconnected { task_id: Some(task_id) }),
            Err(_) => Err(ExecError::Timeout { task_id, after: timeout }),
        };
        match &outcome {
            Ok(_) => self.record_success(),
            Err(error) => self.record_failure(error),
        }
        outcome
    }

    /// Like [`Executor::send_task`], but never fails: any error routes `payload` with the
    /// synchronous fallback instead.
    pub async fn run(&self, payload: TaskPayload, timeout: Duration) -> Execution {
        let (reply, mode) = match self.send_task(payload.clone(), timeout).await {
            Ok(reply) => (reply, ExecutionMode::Worker),
            Err(error) => {
                tracing::debug!(%error, jobs = payload.len(), "routing on the calling thread");
                (payload.run_fallback(), ExecutionMode::Fallback)
            }
        };
        let warning = self
            .lifecycle()
            .unreported
            .take()
            .map(|reason| RoutingWarning::WorkerUnavailable { reason });
        Execution { reply, mode, warning }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::{ExecutionMode, Executor, ReplySink};
    use crate::config::RoutingOptions;
    use crate::exec::protocol::{ExecError, TaskId, TaskPayload, TaskReply, WorkerRequest, WorkerResponse};
    use crate::exec::worker::{ThreadWorkerFactory, Worker, WorkerFactory};
    use crate::model::fixtures::{blocked_pair, eid};
    use crate::route::{Operation, RouteJob, RouteStrategy, RoutingWarning};

    fn payload() -> TaskPayload {
        let snapshot = blocked_pair();
        let edge = snapshot.edge(&eid("e:ab")).expect("edge");
        let job = RouteJob::prepare(&snapshot, edge, Operation::FullRoute, &RoutingOptions::default())
            .expect("job");
        TaskPayload::Route(Box::new(job))
    }

    fn strategy(reply: &TaskReply) -> RouteStrategy {
        match reply {
            TaskReply::Route(Ok(result)) => result.strategy,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    /// Accepts every task and never answers.
    struct Silent;

    impl Worker for Silent {
        fn post(&self, _request: WorkerRequest) -> Result<(), ExecError> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct SilentFactory {
        starts: AtomicUsize,
    }

    impl WorkerFactory for SilentFactory {
        fn start(&self, _replies: ReplySink) -> Result<Arc<dyn Worker>, String> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Silent))
        }
    }

    #[derive(Default)]
    struct BrokenFactory {
        starts: AtomicUsize,
    }

    impl WorkerFactory for BrokenFactory {
        fn start(&self, _replies: ReplySink) -> Result<Arc<dyn Worker>, String> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Err("no threads today".to_owned())
        }
    }

    /// Answers every task with a failure, from the posting thread.
    struct Failing {
        replies: ReplySink,
    }

    impl Worker for Failing {
        fn post(&self, request: WorkerRequest) -> Result<(), ExecError> {
            if let WorkerRequest::Run { task_id, .. } = request {
                self.replies.deliver(WorkerResponse::Failed { task_id, reason: "boom".to_owned() });
            }
            Ok(())
        }
    }

    struct FailingFactory;

    impl WorkerFactory for FailingFactory {
        fn start(&self, replies: ReplySink) -> Result<Arc<dyn Worker>, String> {
            Ok(Arc::new(Failing { replies }))
        }
    }

    #[tokio::test]
    async fn thread_worker_routes_tasks() {
        let executor = Executor::new(Arc::new(ThreadWorkerFactory), 3);
        let reply = executor.send_task(payload(), Duration::from_secs(10)).await.expect("reply");
        assert_eq!(strategy(&reply), RouteStrategy::Search);
        assert_eq!(executor.queue_depth(), 0);
        assert_eq!(executor.counters().succeeded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_worker_times_out_and_run_falls_back() {
        let executor = Executor::new(Arc::new(SilentFactory::default()), 3);
        let error = executor.send_task(payload(), Duration::from_millis(50)).await.expect_err("timeout");
        assert!(matches!(error, ExecError::Timeout { .. }));
        assert_eq!(executor.queue_depth(), 0);

        let execution = executor.run(payload(), Duration::from_millis(50)).await;
        assert_eq!(execution.mode, ExecutionMode::Fallback);
        assert_eq!(strategy(&execution.reply), RouteStrategy::DirectFallback);
        assert_eq!(executor.counters().timed_out, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_timeouts_switch_to_fallback_and_warn_once() {
        let factory = Arc::new(SilentFactory::default());
        let executor = Executor::new(factory.clone(), 2);
        let mut warnings = Vec::new();
        for _ in 0..4 {
            let execution = executor.run(payload(), Duration::from_millis(10)).await;
            warnings.extend(execution.warning);
        }
        assert_eq!(executor.mode(), ExecutionMode::Fallback);
        assert_eq!(factory.starts.load(Ordering::SeqCst), 2);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], RoutingWarning::WorkerUnavailable { .. }));
    }

    #[tokio::test]
    async fn startup_failures_are_bounded() {
        let factory = Arc::new(BrokenFactory::default());
        let executor = Executor::new(factory.clone(), 3);
        let mut warnings = 0;
        for _ in 0..6 {
            let execution = executor.run(payload(), Duration::from_secs(1)).await;
            assert_eq!(strategy(&execution.reply), RouteStrategy::DirectFallback);
            warnings += usize::from(execution.warning.is_some());
        }
        assert_eq!(factory.starts.load(Ordering::SeqCst), 3);
        assert_eq!(warnings, 1);
        assert_eq!(executor.mode(), ExecutionMode::Fallback);
    }

    #[tokio::test]
    async fn worker_failures_surface_as_errors() {
        let executor = Executor::new(Arc::new(FailingFactory), 3);
        let error = executor.send_task(payload(), Duration::from_secs(1)).await.expect_err("failed");
        assert!(matches!(error, ExecError::WorkerFailed { ref reason, .. } if reason == "boom"));
        assert_eq!(executor.counters().failed, 1);
    }

    #[tokio::test]
    async fn late_replies_for_unknown_tasks_are_ignored() {
        let executor = Executor::new(Arc::new(SilentFactory::default()), 3);
        executor
            .reply_sink()
            .deliver(WorkerResponse::Failed { task_id: TaskId::new(999), reason: "late".to_owned() });
        assert_eq!(executor.queue_depth(), 0);
    }
}
