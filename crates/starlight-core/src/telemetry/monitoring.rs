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

//! Provides traits and data structures for active memory monitoring.
//!
//! "Monitoring" here means actively polling a source for a snapshot, on a
//! timer that is independent of the render loop.

use std::fmt::Debug;

use thiserror::Error;

/// One reading of memory usage against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemorySample {
    /// Bytes currently in use.
    pub used_bytes: u64,
    /// Bytes available before the host considers the process over budget.
    pub limit_bytes: u64,
}

impl MemorySample {
    /// Returns `used / limit`, or `None` if the limit is zero.
    pub fn usage_ratio(&self) -> Option<f64> {
        if self.limit_bytes == 0 {
            None
        } else {
            Some(self.used_bytes as f64 / self.limit_bytes as f64)
        }
    }

    /// Returns the current usage in megabytes (MB).
    pub fn used_mb(&self) -> f64 {
        self.used_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Why a memory source could not produce a sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryReadError {
    /// The capability does not exist on this host. Retrying will not help.
    #[error("memory introspection unavailable: {0}")]
    Unavailable(String),
    /// This particular poll failed; the next one may succeed.
    #[error("transient memory read failure: {0}")]
    Transient(String),
}

/// A pollable source of [`MemorySample`]s.
///
/// Implementations live in `starlight-telemetry`; the monitor holds one as a
/// trait object and polls it from a timer thread.
pub trait MemorySource: Send + Debug + 'static {
    /// Returns a short, human-readable name for logs.
    fn name(&self) -> &str;

    /// Takes one sample.
    fn sample(&mut self) -> Result<MemorySample, MemoryReadError>;
}
