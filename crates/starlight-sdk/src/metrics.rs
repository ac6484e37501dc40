// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Diagnostic snapshot of the whole engine.

use serde::Serialize;
use starlight_control::{FpsSummary, GateStats, QualitySnapshot};
use starlight_core::telemetry::PressureLevel;
use starlight_data::PoolStats;

use crate::effects::EffectParameters;

/// Memory figures as seen by the monitor.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MemoryMetrics {
    /// Current pressure level.
    pub pressure_level: PressureLevel,
    /// Smoothed usage ratio, once sampled.
    pub usage_ratio: Option<f64>,
    /// Bytes in use at the last sample.
    pub used_bytes: Option<u64>,
    /// Highest usage seen.
    pub peak_used_bytes: u64,
    /// Successful samples.
    pub sample_count: u64,
    /// Failed polls.
    pub failure_count: u64,
    /// Source serving the samples.
    pub source: Option<String>,
}

/// Everything a diagnostics overlay needs, captured in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// When the snapshot was taken.
    pub at_ms: f64,
    /// FPS estimate and recent statistics.
    pub fps: FpsSummary,
    /// Quality controller state.
    pub quality: QualitySnapshot,
    /// Memory monitor state.
    pub memory: MemoryMetrics,
    /// Frame admission counters.
    pub frames: GateStats,
    /// Star pool statistics.
    pub star_pool: PoolStats,
    /// Canvas pool statistics.
    pub canvas_pool: PoolStats,
    /// Whether the surface is visible.
    pub visible: bool,
    /// Effect parameters for the current quality.
    pub effects: EffectParameters,
}

impl PerformanceMetrics {
    /// Serializes the snapshot as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
