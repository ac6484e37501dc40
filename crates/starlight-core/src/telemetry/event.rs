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

//! Event types for diagnostic telemetry.

use crate::quality::CeilingSource;
use crate::telemetry::pressure::PressureEvent;

/// A high-level telemetry event published by the performance engine.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A measurement window closed.
    FpsMeasured {
        /// Smoothed frames per second.
        fps: f32,
        /// Unsmoothed, clamped frames per second of this window.
        raw_fps: f32,
        /// When the window closed.
        at_ms: f64,
    },
    /// The effective quality changed.
    QualityChanged {
        /// Value before the change.
        previous: f32,
        /// Value after the change.
        current: f32,
    },
    /// A quality ceiling was installed or lifted.
    CeilingChanged {
        /// Owner of the ceiling.
        source: CeilingSource,
        /// The new ceiling, `None` when lifted.
        ceiling: Option<f32>,
    },
    /// The memory pressure level changed.
    PressureChanged(PressureEvent),
    /// The host surface became visible or hidden.
    VisibilityChanged(bool),
}
