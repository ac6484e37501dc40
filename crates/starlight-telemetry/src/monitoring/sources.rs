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

//! Concrete [`MemorySource`] implementations.

use std::fmt;

use starlight_core::telemetry::{MemoryReadError, MemorySample, MemorySource};
use sysinfo::{Pid, Process, ProcessesToUpdate, System};

/// Samples this process's resident memory through `sysinfo`.
///
/// The limit is a configured budget, or the total system memory when no
/// budget is given.
pub struct SysinfoMemorySource {
    system: System,
    pid: Option<Pid>,
    budget_bytes: Option<u64>,
}

impl SysinfoMemorySource {
    /// Measures against the total system memory.
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            budget_bytes: None,
        }
    }

    /// Measures against a fixed budget instead of total system memory.
    pub fn with_budget(budget_bytes: u64) -> Self {
        Self {
            budget_bytes: Some(budget_bytes),
            ..Self::new()
        }
    }

    fn limit_bytes(&mut self) -> u64 {
        match self.budget_bytes {
            Some(budget) => budget,
            None => {
                self.system.refresh_memory();
                self.system.total_memory()
            }
        }
    }
}

impl Default for SysinfoMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SysinfoMemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysinfoMemorySource")
            .field("pid", &self.pid)
            .field("budget_bytes", &self.budget_bytes)
            .finish_non_exhaustive()
    }
}

impl MemorySource for SysinfoMemorySource {
    fn name(&self) -> &str {
        "sysinfo"
    }

    fn sample(&mut self) -> Result<MemorySample, MemoryReadError> {
        let pid = self.pid.ok_or_else(|| {
            MemoryReadError::Unavailable("current process id is not available".into())
        })?;

        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let used_bytes = self
            .system
            .process(pid)
            .map(Process::memory)
            .ok_or_else(|| MemoryReadError::Transient(format!("process {pid} not found")))?;

        let limit_bytes = self.limit_bytes();
        if limit_bytes == 0 {
            return Err(MemoryReadError::Unavailable(
                "total memory reported as zero".into(),
            ));
        }

        Ok(MemorySample {
            used_bytes,
            limit_bytes,
        })
    }
}

/// A synthetic source: usage comes from a caller-supplied estimate, measured
/// against a fixed limit.
///
/// Used where real introspection does not exist, typically with an estimate
/// derived from pool statistics.
pub struct EstimatedMemorySource {
    name: String,
    estimate: Box<dyn FnMut() -> u64 + Send>,
    limit_bytes: u64,
}

impl EstimatedMemorySource {
    /// Creates a source reporting `estimate()` bytes against `limit_bytes`.
    pub fn new<F>(name: impl Into<String>, limit_bytes: u64, estimate: F) -> Self
    where
        F: FnMut() -> u64 + Send + 'static,
    {
        Self {
            name: name.into(),
            estimate: Box::new(estimate),
            limit_bytes,
        }
    }
}

impl fmt::Debug for EstimatedMemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EstimatedMemorySource")
            .field("name", &self.name)
            .field("limit_bytes", &self.limit_bytes)
            .finish_non_exhaustive()
    }
}

impl MemorySource for EstimatedMemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn sample(&mut self) -> Result<MemorySample, MemoryReadError> {
        if self.limit_bytes == 0 {
            return Err(MemoryReadError::Unavailable(format!(
                "{} has no memory limit",
                self.name
            )));
        }
        Ok(MemorySample {
            used_bytes: (self.estimate)(),
            limit_bytes: self.limit_bytes,
        })
    }
}
