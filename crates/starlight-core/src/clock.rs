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

//! The sample clock driving every measurement and control decision.
//!
//! All timestamps in Starlight are `f64` milliseconds from an arbitrary,
//! monotonic origin, mirroring the high-resolution timestamps a host frame
//! scheduler hands to its callbacks.

use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A monotonic millisecond time source.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds.
    fn now_ms(&self) -> f64;
}

/// A [`Clock`] backed by [`Instant`], with its origin at construction time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is "now".
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can hand one copy to the
/// engine and keep another to drive it.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    /// Creates a manual clock starting at `start_ms`.
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Arc::new(Mutex::new(start_ms)),
        }
    }

    /// Sets the current time. Going backwards is allowed; callers that care
    /// about monotonicity must not do it.
    pub fn set(&self, now_ms: f64) {
        if let Ok(mut now) = self.now.lock() {
            *now = now_ms;
        }
    }

    /// Advances the clock by `delta_ms` and returns the new time.
    pub fn advance(&self, delta_ms: f64) -> f64 {
        match self.now.lock() {
            Ok(mut now) => {
                *now += delta_ms;
                *now
            }
            Err(_) => 0.0,
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.lock().map(|now| *now).unwrap_or(0.0)
    }
}
