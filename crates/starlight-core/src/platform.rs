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

//! Host platform inputs consumed by the control loop.
//!
//! Device classification itself happens outside Starlight; these types are
//! the read-only shape in which its results, and the host's power-saving
//! preferences, are handed in.

use serde::{Deserialize, Serialize};

/// Coarse capability class of the device running the effect layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTier {
    /// Low-end hardware: few cores, little memory, usually mobile.
    Low,
    /// Typical hardware.
    #[default]
    Medium,
    /// High-end hardware.
    High,
}

impl DeviceTier {
    /// The frame-skip bias the admission gate starts from on this tier.
    ///
    /// | Tier | Bias |
    /// |---|---|
    /// | Low | 1.0 |
    /// | Medium | 0.5 |
    /// | High | 0.0 |
    pub fn base_frame_skip(self) -> f32 {
        match self {
            DeviceTier::Low => 1.0,
            DeviceTier::Medium => 0.5,
            DeviceTier::High => 0.0,
        }
    }
}

/// Raw hints collected alongside the tier.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceHints {
    /// Logical CPU cores, if reported.
    pub cpu_cores: Option<u32>,
    /// Approximate device memory in gigabytes, if reported.
    pub memory_gb: Option<f32>,
    /// Whether the host looks like a phone or tablet.
    pub is_mobile: bool,
    /// The user asked the platform to minimise motion.
    pub prefers_reduced_motion: bool,
}

/// A classified device: tier plus the hints it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Capability class.
    pub tier: DeviceTier,
    /// Raw capability hints.
    pub hints: DeviceHints,
}

impl DeviceProfile {
    /// Derives a tier from raw hints.
    ///
    /// Unknown values count as "typical", so a host that reports nothing is
    /// classified as [`DeviceTier::Medium`].
    pub fn from_hints(hints: DeviceHints) -> Self {
        let cores = hints.cpu_cores.unwrap_or(4);
        let memory = hints.memory_gb.unwrap_or(4.0);

        let tier = if cores <= 2 || memory <= 2.0 || (hints.is_mobile && cores <= 4) {
            DeviceTier::Low
        } else if !hints.is_mobile && cores >= 8 && memory >= 8.0 {
            DeviceTier::High
        } else {
            DeviceTier::Medium
        };

        Self { tier, hints }
    }
}

/// Power and bandwidth preferences that impose hard quality ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSignals {
    /// Battery saver / low power mode is active.
    pub battery_saver: bool,
    /// The user asked to reduce data and rendering cost.
    pub data_saver: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hints_classify_as_medium() {
        let profile = DeviceProfile::from_hints(DeviceHints::default());
        assert_eq!(profile.tier, DeviceTier::Medium);
    }

    #[test]
    fn small_mobile_is_low_tier() {
        let profile = DeviceProfile::from_hints(DeviceHints {
            cpu_cores: Some(4),
            memory_gb: Some(3.0),
            is_mobile: true,
            prefers_reduced_motion: false,
        });
        assert_eq!(profile.tier, DeviceTier::Low);
    }

    #[test]
    fn large_desktop_is_high_tier() {
        let profile = DeviceProfile::from_hints(DeviceHints {
            cpu_cores: Some(16),
            memory_gb: Some(32.0),
            ..Default::default()
        });
        assert_eq!(profile.tier, DeviceTier::High);
    }

    #[test]
    fn base_skip_decreases_with_tier() {
        assert!(DeviceTier::Low.base_frame_skip() > DeviceTier::Medium.base_frame_skip());
        assert!(DeviceTier::Medium.base_frame_skip() > DeviceTier::High.base_frame_skip());
    }

    #[test]
    fn tier_serializes_as_snake_case() {
        let json = serde_json::to_string(&DeviceTier::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
