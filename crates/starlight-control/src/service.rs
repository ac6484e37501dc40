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

//! The frame-rate controller: FPS estimation, quality adaptation and frame
//! admission wired into one per-tick entry point.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use starlight_core::error::ConfigError;
use starlight_core::event::{SubscriberSet, Subscription};
use starlight_core::platform::{DeviceProfile, PowerSignals};

use crate::context::HostContext;
use crate::fps::{FpsConfig, FpsEstimator, FpsMeasurement, FPS_HISTORY_LEN};
use crate::gate::{FrameAdmissionGate, FrameGateConfig, GateStats};
use crate::metrics::RingBuffer;
use crate::quality::{Adjustment, QualityController};

/// Configuration for the measuring and admission half of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameRateConfig {
    /// FPS estimator settings.
    pub fps: FpsConfig,
    /// Frame admission settings.
    pub gate: FrameGateConfig,
}

/// What happened when a measurement window closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    /// The closed window and its estimate.
    pub measurement: FpsMeasurement,
    /// The quality step taken for it.
    pub adjustment: Adjustment,
}

/// FPS statistics over the recent windows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FpsSummary {
    /// Smoothed estimate of the latest window.
    pub current: f32,
    /// Mean of the retained windows.
    pub average: f32,
    /// Slowest retained window.
    pub min: f32,
    /// Fastest retained window.
    pub max: f32,
    /// Window-to-window variance, a stutter indicator.
    pub variance: f32,
}

impl FpsSummary {
    fn from_history(current: f32, history: &RingBuffer<f32, FPS_HISTORY_LEN>) -> Self {
        Self {
            current,
            average: history.average(),
            min: history.min().unwrap_or(current),
            max: history.max().unwrap_or(current),
            variance: history.variance(),
        }
    }
}

#[derive(Debug)]
struct FrameState {
    estimator: FpsEstimator,
    gate: FrameAdmissionGate,
    context: HostContext,
}

/// Drives the control loop from the host's per-frame callback.
///
/// The FPS channel is notified for each closed window *before* the quality
/// controller adjusts for that window. Callbacks run after the internal lock
/// is released, so subscribers may query the controller.
#[derive(Debug)]
pub struct FrameRateController {
    state: Mutex<FrameState>,
    quality: Arc<QualityController>,
    fps_subscribers: SubscriberSet<f32>,
}

impl FrameRateController {
    /// Creates a controller driving `quality` and applies the host's ceilings.
    pub fn new(
        config: FrameRateConfig,
        quality: Arc<QualityController>,
        context: HostContext,
    ) -> Result<Self, ConfigError> {
        let estimator = FpsEstimator::new(config.fps)?;
        let gate = FrameAdmissionGate::new(config.gate, context.device.tier)?;
        let controller = Self {
            state: Mutex::new(FrameState {
                estimator,
                gate,
                context,
            }),
            quality,
            fps_subscribers: SubscriberSet::new(),
        };
        controller.apply_ceilings(&context);
        Ok(controller)
    }

    /// Shared handle to the quality controller.
    pub fn quality(&self) -> &Arc<QualityController> {
        &self.quality
    }

    /// Counts one animation tick.
    ///
    /// Ticks are ignored while the surface is hidden, so hidden time never
    /// contributes to a window.
    pub fn record_frame(&self, now_ms: f64) -> Option<WindowReport> {
        let measurement = {
            let mut state = self.lock();
            if !state.context.visible {
                return None;
            }
            state.estimator.record_frame(now_ms)?
        };

        self.fps_subscribers.publish(&measurement.fps);
        let adjustment = self.quality.adjust(measurement.fps, now_ms);
        Some(WindowReport {
            measurement,
            adjustment,
        })
    }

    /// Decides whether the frame at `now_ms` should be painted.
    pub fn should_render(&self, now_ms: f64) -> bool {
        let quality = self.quality.quality();
        let mut state = self.lock();
        let fps = state.estimator.fps();
        let visible = state.context.visible;
        state.gate.should_render(now_ms, quality, fps, visible)
    }

    /// Records the tick and returns the admission decision for it.
    pub fn tick(&self, now_ms: f64) -> bool {
        self.record_frame(now_ms);
        self.should_render(now_ms)
    }

    /// Updates surface visibility; returns `true` if it changed.
    ///
    /// Becoming visible discards the partial window and renders the next frame
    /// immediately.
    pub fn set_visible(&self, visible: bool) -> bool {
        let mut state = self.lock();
        if state.context.visible == visible {
            return false;
        }
        state.context.visible = visible;
        if visible {
            state.estimator.reset_window();
            state.gate.reset();
            log::info!("Surface visible, resuming frame measurement");
        } else {
            log::info!("Surface hidden, suspending frame measurement");
        }
        true
    }

    /// Reclassifies the device; updates the gate bias and the quality ceilings.
    pub fn set_device_profile(&self, profile: DeviceProfile) {
        let context = {
            let mut state = self.lock();
            state.context.device = profile;
            state.gate.set_device_tier(profile.tier);
            state.context
        };
        log::info!("Device profile set to {:?}", profile.tier);
        self.apply_ceilings(&context);
    }

    /// Updates power preferences and the ceilings they impose.
    pub fn set_power_signals(&self, power: PowerSignals) {
        let context = {
            let mut state = self.lock();
            state.context.power = power;
            state.context
        };
        self.apply_ceilings(&context);
    }

    /// Registers `callback` on the FPS channel, pushing the current estimate first.
    pub fn subscribe_fps<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&f32) + Send + Sync + 'static,
    {
        self.fps_subscribers
            .subscribe_with_current(callback, || self.fps())
    }

    /// Current smoothed FPS estimate.
    pub fn fps(&self) -> f32 {
        self.lock().estimator.fps()
    }

    /// Statistics over the retained FPS windows.
    pub fn fps_summary(&self) -> FpsSummary {
        let state = self.lock();
        FpsSummary::from_history(state.estimator.fps(), state.estimator.history())
    }

    /// Frame admission counters.
    pub fn gate_stats(&self) -> GateStats {
        self.lock().gate.stats()
    }

    /// The current host context.
    pub fn context(&self) -> HostContext {
        self.lock().context
    }

    fn apply_ceilings(&self, context: &HostContext) {
        let min_quality = self.quality.config().min_quality;
        for (source, ceiling) in context.ceilings(min_quality) {
            self.quality.set_ceiling(source, ceiling);
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
