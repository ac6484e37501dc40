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

//! Memory pressure classification.

use serde::{Deserialize, Serialize};

/// Ordinal severity of memory usage.
///
/// Variants are declared from least to most severe, so the derived `Ord`
/// compares severity directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PressureLevel {
    /// Comfortable headroom.
    #[default]
    Low,
    /// Usage is noticeable; nothing to shed yet.
    Medium,
    /// Usage is high; optional fidelity should be shed.
    High,
    /// Close to the limit; shed everything non-essential.
    Critical,
}

impl PressureLevel {
    /// Returns `true` for the levels that constrain quality.
    pub fn is_constraining(self) -> bool {
        matches!(self, PressureLevel::High | PressureLevel::Critical)
    }
}

impl std::fmt::Display for PressureLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PressureLevel::Low => "low",
            PressureLevel::Medium => "medium",
            PressureLevel::High => "high",
            PressureLevel::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// A single pressure level transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureEvent {
    /// Level before the transition.
    pub previous: PressureLevel,
    /// Level after the transition.
    pub current: PressureLevel,
    /// Smoothed usage ratio that caused the transition.
    pub usage_ratio: f64,
    /// When the transition was observed.
    pub at_ms: f64,
}

impl PressureEvent {
    /// Returns `true` if the transition moved towards more pressure.
    pub fn is_escalation(&self) -> bool {
        self.current > self.previous
    }
}
