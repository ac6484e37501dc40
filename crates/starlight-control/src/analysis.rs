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

//! Heuristic analysis for the quality controller.
//!
//! The heuristic looks at one closed measurement window and decides which way
//! quality should move. Degradation reacts to the window that triggered it,
//! while recovery waits for the increase delay.

use serde::{Deserialize, Serialize};

/// The decision taken for one measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentBranch {
    /// FPS is below half the target: drop two steps.
    CriticalDrop,
    /// FPS is noticeably below the target: drop one step.
    ModerateDrop,
    /// FPS is comfortably above the target and the recovery delay elapsed:
    /// raise half a step.
    Recover,
    /// FPS is above the target but the last change is too recent.
    RecoveryDeferred,
    /// FPS is close enough to the target.
    #[default]
    Hold,
}

impl AdjustmentBranch {
    /// How many quality steps this branch moves (negative = degrade).
    pub fn step_multiplier(self) -> f32 {
        match self {
            AdjustmentBranch::CriticalDrop => -2.0,
            AdjustmentBranch::ModerateDrop => -1.0,
            AdjustmentBranch::Recover => 0.5,
            AdjustmentBranch::RecoveryDeferred | AdjustmentBranch::Hold => 0.0,
        }
    }

    /// Returns `true` for the degrading branches.
    pub fn is_drop(self) -> bool {
        matches!(
            self,
            AdjustmentBranch::CriticalDrop | AdjustmentBranch::ModerateDrop
        )
    }
}

/// FPS-ratio thresholds and the recovery delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityHeuristic {
    /// Below this FPS ratio the critical branch fires.
    pub critical_ratio: f32,
    /// Below this FPS ratio the moderate branch fires.
    pub moderate_ratio: f32,
    /// Above this FPS ratio recovery is considered.
    pub recovery_ratio: f32,
    /// Minimum time since the last quality change before recovering.
    pub increase_delay_ms: f64,
}

impl QualityHeuristic {
    /// Chooses a branch.
    ///
    /// `since_last_change_ms` is `None` when quality has never changed, in
    /// which case recovery is not delayed.
    pub fn evaluate(&self, fps_ratio: f32, since_last_change_ms: Option<f64>) -> AdjustmentBranch {
        if fps_ratio < self.critical_ratio {
            AdjustmentBranch::CriticalDrop
        } else if fps_ratio < self.moderate_ratio {
            AdjustmentBranch::ModerateDrop
        } else if fps_ratio > self.recovery_ratio {
            match since_last_change_ms {
                Some(elapsed) if elapsed <= self.increase_delay_ms => {
                    AdjustmentBranch::RecoveryDeferred
                }
                _ => AdjustmentBranch::Recover,
            }
        } else {
            AdjustmentBranch::Hold
        }
    }
}
