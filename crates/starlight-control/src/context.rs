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

//! Host signals consumed by the control loop.

use serde::{Deserialize, Serialize};
use starlight_core::platform::{DeviceProfile, DeviceTier, PowerSignals};
use starlight_core::quality::CeilingSource;

/// Quality ceiling imposed by battery saver mode.
pub const BATTERY_SAVER_CEILING: f32 = 0.6;
/// Quality ceiling imposed by data saver mode.
pub const DATA_SAVER_CEILING: f32 = 0.7;

/// Everything the host tells the control loop about its environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostContext {
    /// Whether the rendering surface is currently visible.
    pub visible: bool,
    /// Device classification.
    pub device: DeviceProfile,
    /// Power and bandwidth preferences.
    pub power: PowerSignals,
}

impl Default for HostContext {
    fn default() -> Self {
        Self {
            visible: true,
            device: DeviceProfile::default(),
            power: PowerSignals::default(),
        }
    }
}

/// The ceiling a device tier imposes on quality.
pub fn tier_ceiling(tier: DeviceTier) -> f32 {
    match tier {
        DeviceTier::Low => 0.6,
        DeviceTier::Medium => 0.8,
        DeviceTier::High => 1.0,
    }
}

impl HostContext {
    /// The quality ceilings implied by this context.
    ///
    /// Every host-owned [`CeilingSource`] is listed, with `None` for ceilings
    /// that are not active, so applying the whole list also lifts stale ones.
    pub fn ceilings(&self, min_quality: f32) -> [(CeilingSource, Option<f32>); 4] {
        [
            (CeilingSource::DeviceTier, Some(tier_ceiling(self.device.tier))),
            (
                CeilingSource::ReducedMotion,
                self.device.hints.prefers_reduced_motion.then_some(min_quality),
            ),
            (
                CeilingSource::Battery,
                self.power.battery_saver.then_some(BATTERY_SAVER_CEILING),
            ),
            (
                CeilingSource::DataSaver,
                self.power.data_saver.then_some(DATA_SAVER_CEILING),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlight_core::platform::DeviceHints;

    #[test]
    fn default_context_only_has_tier_ceiling() {
        let ceilings = HostContext::default().ceilings(0.4);
        assert_eq!(ceilings[0], (CeilingSource::DeviceTier, Some(0.8)));
        assert!(ceilings[1..].iter().all(|(_, c)| c.is_none()));
    }

    #[test]
    fn preferences_map_to_ceilings() {
        let context = HostContext {
            visible: true,
            device: DeviceProfile {
                tier: DeviceTier::High,
                hints: DeviceHints {
                    prefers_reduced_motion: true,
                    ..Default::default()
                },
            },
            power: PowerSignals {
                battery_saver: true,
                data_saver: true,
            },
        };
        let ceilings = context.ceilings(0.4);
        assert_eq!(ceilings[0].1, Some(1.0));
        assert_eq!(ceilings[1].1, Some(0.4));
        assert_eq!(ceilings[2].1, Some(BATTERY_SAVER_CEILING));
        assert_eq!(ceilings[3].1, Some(DATA_SAVER_CEILING));
    }
}
