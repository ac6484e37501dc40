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

//! Per-frame render/skip decisions.

use serde::{Deserialize, Serialize};
use starlight_core::error::{ensure_positive, ensure_unit_range, ConfigError};
use starlight_core::platform::DeviceTier;

/// Configuration for the [`FrameAdmissionGate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameGateConfig {
    /// Frame rate the host is aiming for.
    pub target_fps: f32,
    /// Longest allowed gap between two rendered frames.
    pub floor_interval_ms: f64,
    /// Upper bound on consecutive skipped frames.
    pub max_skip: u32,
    /// Below `aggressive_ratio * target_fps` the full skip budget is used.
    pub aggressive_ratio: f32,
}

impl Default for FrameGateConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            floor_interval_ms: 33.3,
            max_skip: 3,
            aggressive_ratio: 0.7,
        }
    }
}

impl FrameGateConfig {
    /// Checks the configuration for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("target_fps", self.target_fps as f64)?;
        ensure_positive("floor_interval_ms", self.floor_interval_ms)?;
        ensure_unit_range("aggressive_ratio", self.aggressive_ratio as f64)
    }
}

/// Counters describing what the gate decided so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GateStats {
    /// Frames admitted.
    pub rendered: u64,
    /// Frames skipped while visible.
    pub skipped: u64,
    /// Frames rejected because the surface was hidden.
    pub hidden: u64,
}

impl GateStats {
    /// Fraction of visible frames that were skipped.
    pub fn skip_ratio(&self) -> f64 {
        let total = self.rendered + self.skipped;
        if total == 0 {
            0.0
        } else {
            self.skipped as f64 / total as f64
        }
    }
}

/// Decides, frame by frame, whether the surface should paint.
///
/// A rendered frame is guaranteed at least every `floor_interval_ms`; between
/// floors the gate skips a quality- and load-dependent number of frames.
#[derive(Debug, Clone)]
pub struct FrameAdmissionGate {
    config: FrameGateConfig,
    base_skip: f32,
    last_render_ms: Option<f64>,
    skip_counter: u32,
    stats: GateStats,
}

impl FrameAdmissionGate {
    /// Creates a gate for a device of the given tier.
    pub fn new(config: FrameGateConfig, tier: DeviceTier) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            base_skip: tier.base_frame_skip(),
            last_render_ms: None,
            skip_counter: 0,
            stats: GateStats::default(),
        })
    }

    /// Switches the device bias, e.g. after a viewport change reclassified the host.
    pub fn set_device_tier(&mut self, tier: DeviceTier) {
        self.base_skip = tier.base_frame_skip();
    }

    /// The number of frames to skip between renders for this quality and load.
    pub fn skip_budget(&self, quality: f32, fps: f32) -> u32 {
        let quality_factor = (2.0 - quality * 2.0).max(0.0);
        let skip_rate = ((self.base_skip + quality_factor).floor().max(0.0) as u32)
            .min(self.config.max_skip);
        if fps < self.config.aggressive_ratio * self.config.target_fps {
            skip_rate
        } else {
            skip_rate.saturating_sub(1)
        }
    }

    /// Returns `true` if the frame at `now_ms` should be rendered.
    pub fn should_render(&mut self, now_ms: f64, quality: f32, fps: f32, visible: bool) -> bool {
        if !visible {
            self.stats.hidden += 1;
            return false;
        }

        let Some(last) = self.last_render_ms else {
            return self.admit(now_ms);
        };
        if now_ms - last > self.config.floor_interval_ms {
            return self.admit(now_ms);
        }

        let budget = self.skip_budget(quality, fps);
        if self.skip_counter < budget {
            self.skip_counter += 1;
            self.stats.skipped += 1;
            log::trace!("Skipping frame ({}/{budget})", self.skip_counter);
            false
        } else {
            self.admit(now_ms)
        }
    }

    /// Forgets the last render so the next visible frame renders at once.
    pub fn reset(&mut self) {
        self.last_render_ms = None;
        self.skip_counter = 0;
    }

    /// Decision counters.
    pub fn stats(&self) -> GateStats {
        self.stats
    }

    /// The active configuration.
    pub fn config(&self) -> &FrameGateConfig {
        &self.config
    }

    fn admit(&mut self, now_ms: f64) -> bool {
        self.last_render_ms = Some(now_ms);
        self.skip_counter = 0;
        self.stats.rendered += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(tier: DeviceTier) -> FrameAdmissionGate {
        FrameAdmissionGate::new(FrameGateConfig::default(), tier).unwrap()
    }

    #[test]
    fn first_frame_always_renders() {
        let mut g = gate(DeviceTier::Low);
        assert!(g.should_render(0.0, 0.4, 10.0, true));
    }

    #[test]
    fn hidden_surface_never_renders() {
        let mut g = gate(DeviceTier::High);
        for i in 0..10 {
            assert!(!g.should_render(i as f64 * 100.0, 1.0, 60.0, false));
        }
        assert_eq!(g.stats().hidden, 10);
        assert_eq!(g.stats().rendered, 0);
    }

    #[test]
    fn full_quality_on_high_tier_renders_every_frame() {
        let mut g = gate(DeviceTier::High);
        assert_eq!(g.skip_budget(1.0, 60.0), 0);
        for i in 0..20 {
            assert!(g.should_render(i as f64 * 16.0, 1.0, 60.0, true));
        }
    }

    #[test]
    fn skip_budget_follows_quality_and_load() {
        let g = gate(DeviceTier::Low);
        // base 1.0 + factor 1.2 -> 2, aggressive when fps < 42
        assert_eq!(g.skip_budget(0.4, 30.0), 2);
        assert_eq!(g.skip_budget(0.4, 60.0), 1);
        // factor 2.0 caps at max_skip
        assert_eq!(g.skip_budget(0.0, 10.0), 3);

        let g = gate(DeviceTier::Medium);
        assert_eq!(g.skip_budget(1.0, 10.0), 0);
        assert_eq!(g.skip_budget(0.7, 10.0), 1);
    }

    #[test]
    fn skips_until_budget_then_renders() {
        let mut g = gate(DeviceTier::Low);
        let (q, fps) = (0.4, 30.0); // budget 2
        assert!(g.should_render(0.0, q, fps, true));
        assert!(!g.should_render(5.0, q, fps, true));
        assert!(!g.should_render(10.0, q, fps, true));
        assert!(g.should_render(15.0, q, fps, true));
        assert_eq!(g.stats().rendered, 2);
        assert_eq!(g.stats().skipped, 2);
    }

    #[test]
    fn floor_interval_forces_a_render() {
        let mut g = gate(DeviceTier::Low);
        assert!(g.should_render(0.0, 0.0, 10.0, true));
        assert!(!g.should_render(10.0, 0.0, 10.0, true));
        assert!(g.should_render(40.0, 0.0, 10.0, true));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = FrameGateConfig {
            floor_interval_ms: 0.0,
            ..Default::default()
        };
        assert!(FrameAdmissionGate::new(config, DeviceTier::Medium).is_err());
    }
}
