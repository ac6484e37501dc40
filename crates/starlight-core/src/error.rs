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

//! Construction-time configuration errors.
//!
//! Runtime measurement failures are recovered where they happen and never
//! reach callers; structural mistakes in a configuration fail fast instead.

use thiserror::Error;

/// An invalid configuration detected while constructing a component.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The lower quality bound is above the upper one.
    #[error("min_quality ({min}) must not exceed max_quality ({max})")]
    InvertedQualityBounds {
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
    /// A value that must lie in `[0, 1]` does not.
    #[error("{field} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        /// Name of the offending option.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A value that must be strictly positive is not.
    #[error("{field} must be strictly positive, got {value}")]
    NotPositive {
        /// Name of the offending option.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A set of thresholds is not in the required ascending order.
    #[error("thresholds out of order: {0}")]
    UnorderedThresholds(&'static str),
}

/// Returns an error unless `value` lies in `[0, 1]`.
pub fn ensure_unit_range(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { field, value })
    }
}

/// Returns an error unless `value` is strictly positive (and not NaN).
pub fn ensure_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}
