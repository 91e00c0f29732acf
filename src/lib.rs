// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Orthoroute: orthogonal edge routing for interactive diagram editors.
//!
//! The entry point is [`engine::RoutingEngine`]; the `route` modules can also be used
//! directly for one-off routing without caching or background work.

pub mod cache;
pub mod config;
pub mod engine;
pub mod exec;
pub mod grid;
pub mod model;
pub mod monitor;
pub mod route;

pub use config::{ConfigError, PatternSplit, RoutingOptions};
pub use engine::{DiagramSource, EngineError, InMemoryDiagram, RoutingEngine, Statistics, WaypointSink};
pub use route::{Operation, RouteResult};
