// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Running routing work off the caller's thread.

pub mod debounce;
pub mod executor;
pub mod protocol;
pub mod worker;

pub use debounce::{debounce_delay, Debouncer};
pub use executor::{Execution, ExecutionMode, Executor, ReplySink, TaskCounters};
pub use protocol::{ExecError, TaskId, TaskPayload, TaskReply, TaskState, WorkerRequest, WorkerResponse};
pub use worker::{ThreadWorker, ThreadWorkerFactory, Worker, WorkerFactory};
