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

//! The quality controller: sole owner of the quality scalar.
//!
//! Quality has several writers (the FPS-driven loop, memory pressure, power
//! and device ceilings, explicit user settings). None of them writes the
//! value directly. The controller keeps a *base* value driven by FPS and
//! overrides, plus one optional ceiling per [`CeilingSource`], and derives
//! the effective quality as
//!
//! ```text
//! quality = clamp(min(base, ceilings...), min_quality, max_quality)
//! ```
//!
//! so the result is a deterministic function of every active constraint.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use starlight_core::error::{ensure_positive, ensure_unit_range, ConfigError};
use starlight_core::event::{SubscriberSet, Subscription};
use starlight_core::quality::{CeilingSource, QualityGovernor};

use crate::analysis::{AdjustmentBranch, QualityHeuristic};

/// Values this close to a bound snap onto it.
const BOUND_EPSILON: f32 = 1e-4;

/// Configuration for the [`QualityController`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Frame rate the controller tries to sustain.
    pub target_fps: f32,
    /// Lowest quality the controller will ever report.
    pub min_quality: f32,
    /// Highest quality the controller will ever report.
    pub max_quality: f32,
    /// Starting quality; `None` starts at `max_quality`.
    pub initial_quality: Option<f32>,
    /// Size of one adjustment step.
    pub step: f32,
    /// Changes smaller than this are suppressed.
    pub adjustment_threshold: f32,
    /// Minimum time between the last change and a recovery step.
    pub increase_delay_ms: f64,
    /// FPS ratio below which quality drops two steps.
    pub critical_ratio: f32,
    /// FPS ratio below which quality drops one step.
    pub moderate_ratio: f32,
    /// FPS ratio above which quality may recover.
    pub recovery_ratio: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            min_quality: 0.4,
            max_quality: 1.0,
            initial_quality: None,
            step: 0.1,
            adjustment_threshold: 0.05,
            increase_delay_ms: 5000.0,
            critical_ratio: 0.5,
            moderate_ratio: 0.85,
            recovery_ratio: 1.1,
        }
    }
}

impl QualityConfig {
    /// Checks the configuration for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_unit_range("min_quality", self.min_quality as f64)?;
        ensure_unit_range("max_quality", self.max_quality as f64)?;
        if self.min_quality > self.max_quality {
            return Err(ConfigError::InvertedQualityBounds {
                min: self.min_quality,
                max: self.max_quality,
            });
        }
        if let Some(initial) = self.initial_quality {
            ensure_unit_range("initial_quality", initial as f64)?;
        }
        ensure_positive("target_fps", self.target_fps as f64)?;
        ensure_positive("step", self.step as f64)?;
        ensure_unit_range("adjustment_threshold", self.adjustment_threshold as f64)?;
        if self.increase_delay_ms < 0.0 {
            return Err(ConfigError::NotPositive {
                field: "increase_delay_ms",
                value: self.increase_delay_ms,
            });
        }
        if !(self.critical_ratio <= self.moderate_ratio && self.moderate_ratio <= self.recovery_ratio) {
            return Err(ConfigError::UnorderedThresholds(
                "critical_ratio <= moderate_ratio <= recovery_ratio",
            ));
        }
        Ok(())
    }

    fn heuristic(&self) -> QualityHeuristic {
        QualityHeuristic {
            critical_ratio: self.critical_ratio,
            moderate_ratio: self.moderate_ratio,
            recovery_ratio: self.recovery_ratio,
            increase_delay_ms: self.increase_delay_ms,
        }
    }
}

/// Outcome of one [`QualityController::adjust`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    /// The branch the heuristic chose.
    pub branch: AdjustmentBranch,
    /// Effective quality before the call.
    pub previous: f32,
    /// Effective quality after the call.
    pub current: f32,
    /// `false` when the branch asked for a change that the deadband, a bound
    /// or a ceiling absorbed.
    pub applied: bool,
}

/// Diagnostic view of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySnapshot {
    /// Effective quality.
    pub quality: f32,
    /// FPS-driven / overridden value before ceilings.
    pub base: f32,
    /// The tightest active ceiling, if any.
    pub limiting_ceiling: Option<(CeilingSource, f32)>,
    /// Every active ceiling.
    pub ceilings: Vec<(CeilingSource, f32)>,
    /// Branch taken by the most recent window.
    pub last_branch: AdjustmentBranch,
}

#[derive(Debug)]
struct QualityState {
    base: f32,
    effective: f32,
    ceilings: BTreeMap<CeilingSource, f32>,
    last_change_ms: Option<f64>,
    last_branch: AdjustmentBranch,
}

/// Owns the quality scalar and notifies subscribers of every accepted change.
#[derive(Debug)]
pub struct QualityController {
    config: QualityConfig,
    heuristic: QualityHeuristic,
    state: Mutex<QualityState>,
    subscribers: SubscriberSet<f32>,
}

impl QualityController {
    /// Creates a controller, rejecting invalid configurations.
    pub fn new(config: QualityConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let base = config
            .initial_quality
            .unwrap_or(config.max_quality)
            .clamp(config.min_quality, config.max_quality);
        Ok(Self {
            config,
            heuristic: config.heuristic(),
            state: Mutex::new(QualityState {
                base,
                effective: base,
                ceilings: BTreeMap::new(),
                last_change_ms: None,
                last_branch: AdjustmentBranch::Hold,
            }),
            subscribers: SubscriberSet::new(),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Current effective quality.
    pub fn quality(&self) -> f32 {
        self.lock().effective
    }

    /// Runs one adjustment step for a closed measurement window.
    ///
    /// Must be called once per window, after the FPS estimate for that window
    /// has been computed.
    pub fn adjust(&self, fps: f32, now_ms: f64) -> Adjustment {
        let fps_ratio = fps / self.config.target_fps;
        let (adjustment, change) = {
            let mut state = self.lock();
            let previous = state.effective;
            let branch = self
                .heuristic
                .evaluate(fps_ratio, state.last_change_ms.map(|t| now_ms - t));
            state.last_branch = branch;

            let multiplier = branch.step_multiplier();
            // A raise under a binding ceiling would not move the effective
            // value, and the base must keep what the FPS allows.
            let ceiling_binds = multiplier > 0.0 && state.base >= self.ceiling(&state);
            let mut change = None;
            if multiplier != 0.0 && !ceiling_binds {
                let proposed = self.clamp(previous + multiplier * self.config.step);
                let delta = (proposed - previous).abs();
                let at_bound =
                    proposed == self.config.min_quality || proposed == self.config.max_quality;
                let above_deadband = delta + BOUND_EPSILON >= self.config.adjustment_threshold;
                if delta > 0.0 && (above_deadband || at_bound) {
                    state.base = proposed;
                    change = self.recompute(&mut state);
                    if change.is_some() {
                        state.last_change_ms = Some(now_ms);
                    }
                }
            }

            let adjustment = Adjustment {
                branch,
                previous,
                current: state.effective,
                applied: change.is_some(),
            };
            (adjustment, change)
        };

        match adjustment.branch {
            AdjustmentBranch::CriticalDrop | AdjustmentBranch::ModerateDrop if adjustment.applied => {
                log::info!(
                    "Quality {:?}: {:.2} -> {:.2} (fps {:.1}, ratio {:.2})",
                    adjustment.branch,
                    adjustment.previous,
                    adjustment.current,
                    fps,
                    fps_ratio
                );
            }
            AdjustmentBranch::Recover if adjustment.applied => {
                log::info!(
                    "Quality recovering: {:.2} -> {:.2} (fps {:.1})",
                    adjustment.previous,
                    adjustment.current,
                    fps
                );
            }
            branch => log::trace!("Quality {:?} at {:.2} (fps {:.1})", branch, adjustment.current, fps),
        }

        self.notify(change);
        adjustment
    }

    /// Sets the base quality directly.
    ///
    /// Bypasses the deadband and restarts the recovery delay. Active ceilings
    /// still apply, so the effective value never exceeds them.
    pub fn set_quality(&self, value: f32, now_ms: f64) {
        let change = {
            let mut state = self.lock();
            state.base = self.clamp(value);
            state.last_change_ms = Some(now_ms);
            self.recompute(&mut state)
        };
        log::debug!("Quality override requested: {value:.2}");
        self.notify(change);
    }

    /// Installs (`Some`) or lifts (`None`) the ceiling owned by `source`.
    pub fn set_ceiling(&self, source: CeilingSource, ceiling: Option<f32>) {
        let change = {
            let mut state = self.lock();
            match ceiling {
                Some(value) => {
                    state.ceilings.insert(source, value.clamp(0.0, 1.0));
                }
                None => {
                    state.ceilings.remove(&source);
                }
            }
            self.recompute(&mut state)
        };
        match ceiling {
            Some(value) => log::info!("Quality ceiling '{source}' set to {value:.2}"),
            None => log::info!("Quality ceiling '{source}' lifted"),
        }
        self.notify(change);
    }

    /// Lowers the base value to at most `ceiling`; never raises it.
    pub fn clamp_down(&self, ceiling: f32, now_ms: f64) {
        let change = {
            let mut state = self.lock();
            let target = self.clamp(state.effective.min(ceiling));
            if target < state.base {
                state.base = target;
                state.last_change_ms = Some(now_ms);
            }
            self.recompute(&mut state)
        };
        if let Some((previous, current)) = change {
            log::warn!("Quality clamped down: {previous:.2} -> {current:.2}");
        }
        self.notify(change);
    }

    /// Registers `callback`, immediately handing it the current quality.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&f32) + Send + Sync + 'static,
    {
        self.subscribers
            .subscribe_with_current(callback, || self.quality())
    }

    /// Returns a diagnostic snapshot.
    pub fn snapshot(&self) -> QualitySnapshot {
        let state = self.lock();
        let ceilings: Vec<(CeilingSource, f32)> =
            state.ceilings.iter().map(|(s, v)| (*s, *v)).collect();
        let limiting_ceiling = ceilings
            .iter()
            .copied()
            .filter(|(_, v)| *v < state.base)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        QualitySnapshot {
            quality: state.effective,
            base: state.base,
            limiting_ceiling,
            ceilings,
            last_branch: state.last_branch,
        }
    }

    fn clamp(&self, value: f32) -> f32 {
        let (min, max) = (self.config.min_quality, self.config.max_quality);
        let value = value.clamp(min, max);
        if value - min < BOUND_EPSILON {
            min
        } else if max - value < BOUND_EPSILON {
            max
        } else {
            value
        }
    }

    /// Refreshes the effective value; returns `(previous, current)` if it moved.
    /// Lowest active ceiling, or `max_quality` when none is set.
    fn ceiling(&self, state: &QualityState) -> f32 {
        state
            .ceilings
            .values()
            .copied()
            .fold(self.config.max_quality, f32::min)
    }

    fn recompute(&self, state: &mut QualityState) -> Option<(f32, f32)> {
        let effective = self.clamp(state.base.min(self.ceiling(state)));
        let previous = state.effective;
        state.effective = effective;
        if (effective - previous).abs() > f32::EPSILON {
            Some((previous, effective))
        } else {
            None
        }
    }

    fn notify(&self, change: Option<(f32, f32)>) {
        if let Some((_, current)) = change {
            self.subscribers.publish(&current);
        }
    }

    fn lock(&self) -> MutexGuard<'_, QualityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl QualityGovernor for QualityController {
    fn quality(&self) -> f32 {
        QualityController::quality(self)
    }

    fn set_ceiling(&self, source: CeilingSource, ceiling: Option<f32>) {
        QualityController::set_ceiling(self, source, ceiling);
    }

    fn clamp_down(&self, ceiling: f32, now_ms: f64) {
        QualityController::clamp_down(self, ceiling, now_ms);
    }
}
