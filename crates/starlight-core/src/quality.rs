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

//! Shared vocabulary for the quality scalar.
//!
//! The quality scalar is owned by a single controller. Other subsystems never
//! write it; they propose constraints through [`QualityGovernor`], and the
//! controller folds every active constraint into one effective value.

use serde::{Deserialize, Serialize};

/// Who imposed a hard upper bound on quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CeilingSource {
    /// Capability class of the device.
    DeviceTier,
    /// Battery saver mode.
    Battery,
    /// Data saver mode.
    DataSaver,
    /// The platform's reduced-motion preference.
    ReducedMotion,
    /// Memory pressure reported by the memory monitor.
    MemoryPressure,
    /// An explicit user setting.
    User,
}

impl std::fmt::Display for CeilingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CeilingSource::DeviceTier => "device_tier",
            CeilingSource::Battery => "battery",
            CeilingSource::DataSaver => "data_saver",
            CeilingSource::ReducedMotion => "reduced_motion",
            CeilingSource::MemoryPressure => "memory_pressure",
            CeilingSource::User => "user",
        };
        f.write_str(name)
    }
}

/// The write side of the quality controller exposed to other subsystems.
///
/// Callers can only narrow quality through it. Lifting a ceiling restores
/// whatever the controller's own value allows; it never pushes quality up.
pub trait QualityGovernor: Send + Sync {
    /// Returns the current effective quality.
    fn quality(&self) -> f32;

    /// Installs (`Some`) or lifts (`None`) the ceiling owned by `source`.
    fn set_ceiling(&self, source: CeilingSource, ceiling: Option<f32>);

    /// Lowers the controller's own value to at most `ceiling`, at time `now_ms`.
    ///
    /// If quality is already at or below `ceiling` nothing changes.
    fn clamp_down(&self, ceiling: f32, now_ms: f64);
}
