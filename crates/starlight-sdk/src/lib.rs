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

//! # Starlight SDK
//!
//! The public entry point of the adaptive effect layer. A host creates one
//! [`PerformanceEngine`] per rendering surface, calls
//! [`tick`](PerformanceEngine::tick) from its frame callback, and reads the
//! quality (or the derived [`EffectParameters`]) to decide how much to draw.
//!
//! ```no_run
//! use std::sync::Arc;
//! use starlight_sdk::prelude::*;
//!
//! let engine = PerformanceEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(SystemClock::new()),
//!     Box::new(SysinfoMemorySource::new()),
//! )?;
//! let _quality = engine.subscribe_quality(|q| println!("quality is now {q:.2}"));
//! if engine.tick() {
//!     let params = engine.effect_parameters();
//!     println!("drawing {} stars", params.star_count);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod effects;
pub mod engine;
pub mod metrics;

pub use config::EngineConfig;
pub use effects::EffectParameters;
pub use engine::PerformanceEngine;
pub use metrics::{MemoryMetrics, PerformanceMetrics};

/// The types most hosts need.
pub mod prelude {
    pub use crate::{EffectParameters, EngineConfig, PerformanceEngine, PerformanceMetrics};
    pub use starlight_control::{HostContext, QualityConfig};
    pub use starlight_core::clock::{Clock, ManualClock, SystemClock};
    pub use starlight_core::platform::{DeviceHints, DeviceProfile, DeviceTier, PowerSignals};
    pub use starlight_core::telemetry::{PressureEvent, PressureLevel, TelemetryEvent};
    pub use starlight_core::Subscription;
    pub use starlight_data::ClearStrategy;
    pub use starlight_telemetry::{EstimatedMemorySource, SysinfoMemorySource};
}
