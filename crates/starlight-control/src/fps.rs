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

//! Frames-per-second estimation over fixed measurement windows.

use serde::{Deserialize, Serialize};
use starlight_core::error::{ensure_positive, ensure_unit_range, ConfigError};

use crate::metrics::RingBuffer;

/// Number of per-window estimates kept for diagnostics.
pub const FPS_HISTORY_LEN: usize = 60;

/// Configuration for the [`FpsEstimator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FpsConfig {
    /// Length of a measurement window in milliseconds.
    pub measurement_interval_ms: f64,
    /// Weight of the newest window in the exponential smoothing.
    pub smoothing: f32,
    /// Raw estimates below this are clamped up (debugger pauses, tab restore).
    pub min_fps: f32,
    /// Raw estimates above this are clamped down.
    pub max_fps: f32,
    /// Value reported before the first window closes.
    pub initial_fps: f32,
}

impl Default for FpsConfig {
    fn default() -> Self {
        Self {
            measurement_interval_ms: 1000.0,
            smoothing: 0.3,
            min_fps: 1.0,
            max_fps: 120.0,
            initial_fps: 60.0,
        }
    }
}

impl FpsConfig {
    /// Checks the configuration for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("measurement_interval_ms", self.measurement_interval_ms)?;
        ensure_unit_range("smoothing", self.smoothing as f64)?;
        ensure_positive("min_fps", self.min_fps as f64)?;
        if self.min_fps > self.max_fps {
            return Err(ConfigError::UnorderedThresholds("min_fps <= max_fps"));
        }
        Ok(())
    }
}

/// The frames counted between two window boundaries.
///
/// Produced once per measurement interval and consumed once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleWindow {
    /// Timestamp that opened the window.
    pub start_ms: f64,
    /// Timestamp that closed the window.
    pub end_ms: f64,
    /// Frames recorded after `start_ms`, up to and including `end_ms`.
    pub frame_count: u32,
}

impl SampleWindow {
    /// Window length in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }

    /// Unclamped frames per second over the window.
    pub fn raw_fps(&self) -> f64 {
        let elapsed = self.elapsed_ms();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.frame_count as f64 * 1000.0 / elapsed
    }
}

/// The result of closing one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FpsMeasurement {
    /// The window that was closed.
    pub window: SampleWindow,
    /// Clamped, unsmoothed estimate for this window.
    pub raw_fps: f32,
    /// Smoothed estimate after folding this window in.
    pub fps: f32,
}

/// Turns per-tick timestamps into a smoothed FPS estimate.
#[derive(Debug, Clone)]
pub struct FpsEstimator {
    config: FpsConfig,
    window_start: Option<f64>,
    frame_count: u32,
    fps: f32,
    measured: bool,
    history: RingBuffer<f32, FPS_HISTORY_LEN>,
}

impl FpsEstimator {
    /// Creates an estimator, rejecting invalid configurations.
    pub fn new(config: FpsConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            window_start: None,
            frame_count: 0,
            fps: config.initial_fps,
            measured: false,
            history: RingBuffer::new(),
        })
    }

    /// Records one animation tick.
    ///
    /// The very first tick only opens a window. Returns a measurement when
    /// this tick closes a window.
    pub fn record_frame(&mut self, now_ms: f64) -> Option<FpsMeasurement> {
        let start = match self.window_start {
            Some(start) if now_ms >= start => start,
            _ => {
                // First tick, or the clock went backwards: start over.
                self.window_start = Some(now_ms);
                self.frame_count = 0;
                return None;
            }
        };

        self.frame_count += 1;
        if now_ms - start < self.config.measurement_interval_ms {
            return None;
        }

        let window = SampleWindow {
            start_ms: start,
            end_ms: now_ms,
            frame_count: self.frame_count,
        };
        let raw_fps = (window.raw_fps() as f32).clamp(self.config.min_fps, self.config.max_fps);
        self.fps = if self.measured {
            let s = self.config.smoothing;
            self.fps * (1.0 - s) + raw_fps * s
        } else {
            raw_fps
        };
        self.measured = true;
        self.history.push(self.fps);
        self.window_start = Some(now_ms);
        self.frame_count = 0;

        log::debug!(
            "FPS window closed: {} frames in {:.1}ms, raw {:.1}, smoothed {:.1}",
            window.frame_count,
            window.elapsed_ms(),
            raw_fps,
            self.fps
        );

        Some(FpsMeasurement {
            window,
            raw_fps,
            fps: self.fps,
        })
    }

    /// Discards the partial window; the next tick opens a fresh one.
    ///
    /// The smoothed estimate and history are kept.
    pub fn reset_window(&mut self) {
        self.window_start = None;
        self.frame_count = 0;
    }

    /// Current smoothed estimate (the configured initial value until the
    /// first window closes).
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Returns `true` once at least one window has closed.
    pub fn has_measurement(&self) -> bool {
        self.measured
    }

    /// Smoothed estimates of the most recent windows, oldest first.
    pub fn history(&self) -> &RingBuffer<f32, FPS_HISTORY_LEN> {
        &self.history
    }

    /// The active configuration.
    pub fn config(&self) -> &FpsConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run_ticks(estimator: &mut FpsEstimator, start: f64, delta: f64, ticks: usize) -> Vec<FpsMeasurement> {
        (0..ticks)
            .filter_map(|i| estimator.record_frame(start + delta * i as f64))
            .collect()
    }

    #[test]
    fn first_window_is_unsmoothed() {
        let mut estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        let windows = run_ticks(&mut estimator, 0.0, 20.0, 51);
        assert_eq!(windows.len(), 1);
        assert_relative_eq!(windows[0].fps, 50.0, epsilon = 1e-3);
        assert_eq!(windows[0].window.frame_count, 50);
        assert!(estimator.has_measurement());
    }

    #[test]
    fn evenly_spaced_ticks_converge_to_rate() {
        let mut estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        let delta = 1000.0 / 60.0;
        run_ticks(&mut estimator, 0.0, delta, 60 * 5 + 1);
        assert_relative_eq!(estimator.fps(), 60.0, epsilon = 0.5);
    }

    #[test]
    fn smoothing_settles_geometrically() {
        let mut estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        // One window at 60fps, then windows at 30fps.
        let mut now = 0.0;
        estimator.record_frame(now);
        for _ in 0..60 {
            now += 1000.0 / 60.0;
            estimator.record_frame(now);
        }
        let mut errors = Vec::new();
        for _ in 0..4 {
            let mut closed = None;
            while closed.is_none() {
                now += 1000.0 / 30.0;
                closed = estimator.record_frame(now);
            }
            errors.push((closed.unwrap().fps - 30.0).abs());
        }
        // Each window removes 30% of the remaining error.
        for pair in errors.windows(2) {
            assert!(pair[1] < pair[0]);
            assert_relative_eq!(pair[1] / pair[0], 0.7, epsilon = 0.05);
        }
    }

    #[test]
    fn pathological_windows_are_clamped() {
        let mut estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        estimator.record_frame(0.0);
        // A single frame after a ten second pause.
        let m = estimator.record_frame(10_000.0).unwrap();
        assert_eq!(m.raw_fps, 1.0);

        let mut burst = FpsEstimator::new(FpsConfig::default()).unwrap();
        let windows = run_ticks(&mut burst, 0.0, 1.0, 1001);
        assert_eq!(windows[0].raw_fps, 120.0);
    }

    #[test]
    fn reports_initial_value_before_first_window() {
        let estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        assert_eq!(estimator.fps(), 60.0);
        assert!(!estimator.has_measurement());
    }

    #[test]
    fn reset_window_discards_partial_frames() {
        let mut estimator = FpsEstimator::new(FpsConfig::default()).unwrap();
        run_ticks(&mut estimator, 0.0, 20.0, 30);
        estimator.reset_window();
        // Hidden for five seconds, then resumed at 50fps.
        let windows = run_ticks(&mut estimator, 5_000.0, 20.0, 51);
        assert_eq!(windows.len(), 1);
        assert_relative_eq!(windows[0].fps, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = FpsConfig {
            min_fps: 200.0,
            ..Default::default()
        };
        assert!(FpsEstimator::new(config).is_err());
        let config = FpsConfig {
            measurement_interval_ms: 0.0,
            ..Default::default()
        };
        assert!(FpsEstimator::new(config).is_err());
    }
}
