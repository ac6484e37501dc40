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

//! Service polling a [`MemoryMonitor`] on its own timer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use starlight_core::clock::Clock;
use starlight_core::timer::IntervalTimer;

use crate::monitoring::memory_monitor::MemoryMonitor;

/// Polls a memory monitor at the configured interval.
///
/// Runs independently of the render loop, so pressure keeps being tracked
/// while frames are not being produced.
#[derive(Debug)]
pub struct MemoryMonitorService {
    monitor: Arc<MemoryMonitor>,
    timer: Option<IntervalTimer>,
}

impl MemoryMonitorService {
    /// Starts polling `monitor`, stamping samples with `clock`.
    pub fn start(monitor: Arc<MemoryMonitor>, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let interval = Duration::from_millis(monitor.config().poll_interval_ms);
        let polled = Arc::clone(&monitor);
        let timer = IntervalTimer::start("starlight-memory-monitor", interval, move || {
            polled.poll(clock.now_ms());
        })
        .context("failed to spawn the memory monitor thread")?;
        log::info!("Memory monitor service started (every {interval:?})");
        Ok(Self {
            monitor,
            timer: Some(timer),
        })
    }

    /// The monitored instance.
    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    /// Returns `true` until the service is disposed.
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(IntervalTimer::is_running)
    }

    /// Stops polling. Idempotent; no poll runs after this returns.
    pub fn dispose(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.dispose();
            log::info!("Memory monitor service stopped");
        }
    }
}

impl Drop for MemoryMonitorService {
    fn drop(&mut self) {
        self.dispose();
    }
}
