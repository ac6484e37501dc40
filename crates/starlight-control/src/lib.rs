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

//! # Starlight Control
//!
//! The adaptive frame-rate and quality loop: a windowed FPS estimator, the
//! quality controller that owns the quality scalar, the per-frame admission
//! gate, and the [`FrameRateController`] that wires them to the host's tick.

#![warn(missing_docs)]

pub mod analysis;
pub mod context;
pub mod fps;
pub mod gate;
pub mod metrics;
pub mod quality;
pub mod service;

pub use analysis::{AdjustmentBranch, QualityHeuristic};
pub use context::HostContext;
pub use fps::{FpsConfig, FpsEstimator, FpsMeasurement, SampleWindow};
pub use gate::{FrameAdmissionGate, FrameGateConfig, GateStats};
pub use quality::{Adjustment, QualityConfig, QualityController, QualitySnapshot};
pub use service::{FpsSummary, FrameRateConfig, FrameRateController, WindowReport};
