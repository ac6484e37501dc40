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

//! Engine configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use starlight_control::{FrameRateConfig, HostContext, QualityConfig};
use starlight_core::error::{ensure_positive, ConfigError};
use starlight_data::PoolConfig;
use starlight_telemetry::MemoryMonitorConfig;

/// Every tunable of the [`PerformanceEngine`](crate::PerformanceEngine).
///
/// All fields have defaults, so a JSON document only needs the options it
/// overrides:
///
/// ```
/// use starlight_sdk::EngineConfig;
///
/// let config = EngineConfig::from_json_str(r#"{ "quality": { "min_quality": 0.3 } }"#).unwrap();
/// assert_eq!(config.quality.min_quality, 0.3);
/// assert_eq!(config.quality.max_quality, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quality controller settings.
    pub quality: QualityConfig,
    /// FPS estimator and frame gate settings.
    ///
    /// `frame_rate.gate.target_fps` is ignored: the engine always sets it to
    /// `quality.target_fps`, so one target drives both components.
    pub frame_rate: FrameRateConfig,
    /// Memory monitor settings.
    pub memory: MemoryMonitorConfig,
    /// Star particle pool.
    pub star_pool: PoolConfig,
    /// Offscreen canvas pool.
    pub canvas_pool: PoolConfig,
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    /// Period of the pool hibernation sweep.
    pub pool_sweep_interval_ms: u64,
    /// Limit used by the pool-based memory estimate when the primary memory
    /// source is unavailable.
    pub estimated_memory_limit_bytes: u64,
    /// Capacity of the telemetry event queue; events beyond it are dropped.
    pub telemetry_buffer_size: usize,
    /// Host signals at start-up.
    pub host: HostContext,
    /// Start the memory polling and pool sweep timers. When off, call
    /// `poll_memory` and `sweep_pools` yourself.
    pub background_services: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            frame_rate: FrameRateConfig::default(),
            memory: MemoryMonitorConfig::default(),
            star_pool: PoolConfig {
                max_pool_size: 800,
                ..PoolConfig::default()
            },
            canvas_pool: PoolConfig {
                max_pool_size: 4,
                ..PoolConfig::default()
            },
            canvas_width: 1280,
            canvas_height: 720,
            pool_sweep_interval_ms: 10_000,
            estimated_memory_limit_bytes: 256 * 1024 * 1024,
            telemetry_buffer_size: 1024,
            host: HostContext::default(),
            background_services: true,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("invalid engine configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json_string(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize engine configuration")
    }

    /// Checks every section for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quality.validate()?;
        self.frame_rate.fps.validate()?;
        self.frame_rate.gate.validate()?;
        self.memory.validate()?;
        self.star_pool.validate()?;
        self.canvas_pool.validate()?;
        ensure_positive("pool_sweep_interval_ms", self.pool_sweep_interval_ms as f64)?;
        ensure_positive("telemetry_buffer_size", self.telemetry_buffer_size as f64)
    }
}
