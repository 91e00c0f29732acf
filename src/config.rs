// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Orthoroute and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Routing configuration surface.
//!
//! Options arrive from the editor as JSON with camelCase keys. Missing keys take their
//! defaults and unknown keys are ignored; values are validated eagerly and invalid values
//! are rejected rather than clamped.

use std::fmt;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the two corners of a Z/S pattern are placed between the jetty points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatternSplit {
    /// Both corners share the midpoint of the travel axis.
    #[default]
    Midpoint,
    /// Corners sit at the 1/3 and 2/3 marks.
    Thirds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingOptions {
    pub grid_size: f64,
    pub jetty_size: f64,
    pub node_margin: f64,
    pub edge_margin: f64,
    pub max_iterations: usize,
    pub batch_size: usize,
    pub debounce_time_ms: u64,
    pub max_debounce_ms: u64,
    pub cache_max_size: usize,
    pub cache_expiry_ms: u64,
    pub enable_batching: bool,
    pub enable_virtual_bends: bool,
    pub enable_intersection_detection: bool,
    pub worker_timeout_ms: u64,
    pub max_worker_start_attempts: u32,
    pub max_waypoints: usize,
    pub pattern_split: PatternSplit,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            jetty_size: 20.0,
            node_margin: 10.0,
            edge_margin: 5.0,
            max_iterations: 5_000,
            batch_size: 10,
            debounce_time_ms: 100,
            max_debounce_ms: 1_000,
            cache_max_size: 500,
            cache_expiry_ms: 30_000,
            enable_batching: true,
            enable_virtual_bends: true,
            enable_intersection_detection: true,
            worker_timeout_ms: 10_000,
            max_worker_start_attempts: 3,
            max_waypoints: 8,
            pattern_split: PatternSplit::Midpoint,
        }
    }
}

impl RoutingOptions {
    /// Parses editor-supplied JSON and validates the result.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let options: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Json { message: err.to_string() })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("gridSize", self.grid_size)?;
        non_negative("jettySize", self.jetty_size)?;
        non_negative("nodeMargin", self.node_margin)?;
        non_negative("edgeMargin", self.edge_margin)?;
        nonzero("batchSize", self.batch_size as u64)?;
        nonzero("cacheMaxSize", self.cache_max_size as u64)?;
        nonzero("cacheExpiryMs", self.cache_expiry_ms)?;
        nonzero("workerTimeoutMs", self.worker_timeout_ms)?;
        if self.max_debounce_ms < self.debounce_time_ms {
            return Err(ConfigError::OutOfRange {
                field: "maxDebounceMs",
                message: format!(
                    "must be at least debounceTimeMs ({}), got {}",
                    self.debounce_time_ms, self.max_debounce_ms
                ),
            });
        }
        Ok(())
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    pub fn cache_expiry(&self) -> Duration {
        Duration::from_millis(self.cache_expiry_ms)
    }

    /// JSON schema of the accepted option document.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(RoutingOptions)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Zero { field });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NotPositive { field: &'static str, value: f64 },
    Negative { field: &'static str, value: f64 },
    NotFinite { field: &'static str },
    Zero { field: &'static str },
    OutOfRange { field: &'static str, message: String },
    Json { message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive { field, value } => {
                write!(f, "{field} must be greater than zero, got {value}")
            }
            Self::Negative { field, value } => write!(f, "{field} must not be negative, got {value}"),
            Self::NotFinite { field } => write!(f, "{field} must be a finite number"),
            Self::Zero { field } => write!(f, "{field} must not be zero"),
            Self::OutOfRange { field, message } => write!(f, "{field} {message}"),
            Self::Json { message } => write!(f, "invalid routing options: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}
