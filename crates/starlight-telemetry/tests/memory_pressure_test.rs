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

//! Memory monitor scenarios against a live quality governor and timer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use starlight_core::clock::ManualClock;
use starlight_core::quality::{CeilingSource, QualityGovernor};
use starlight_core::telemetry::{MemoryReadError, MemorySample, MemorySource, PressureLevel};
use starlight_telemetry::{
    EstimatedMemorySource, MemoryMonitor, MemoryMonitorConfig, MemoryMonitorService,
};

/// Records governor calls and mimics the controller's ceiling composition.
#[derive(Debug, Default)]
struct RecordingGovernor {
    state: Mutex<GovernorState>,
}

#[derive(Debug)]
struct GovernorState {
    base: f32,
    memory_ceiling: Option<f32>,
    calls: Vec<String>,
}

impl Default for GovernorState {
    fn default() -> Self {
        Self {
            base: 1.0,
            memory_ceiling: None,
            calls: Vec::new(),
        }
    }
}

impl QualityGovernor for RecordingGovernor {
    fn quality(&self) -> f32 {
        let state = self.state.lock().unwrap();
        state.base.min(state.memory_ceiling.unwrap_or(1.0))
    }

    fn set_ceiling(&self, source: CeilingSource, ceiling: Option<f32>) {
        assert_eq!(source, CeilingSource::MemoryPressure);
        let mut state = self.state.lock().unwrap();
        state.memory_ceiling = ceiling;
        state.calls.push(format!("ceiling {ceiling:?}"));
    }

    fn clamp_down(&self, ceiling: f32, _now_ms: f64) {
        let mut state = self.state.lock().unwrap();
        state.base = state.base.min(ceiling);
        state.calls.push(format!("clamp {ceiling}"));
    }
}

/// A source whose usage is set by the test.
#[derive(Debug, Clone)]
struct Dial(Arc<AtomicU64>);

impl MemorySource for Dial {
    fn name(&self) -> &str {
        "dial"
    }

    fn sample(&mut self) -> Result<MemorySample, MemoryReadError> {
        Ok(MemorySample {
            used_bytes: self.0.load(Ordering::SeqCst),
            limit_bytes: 1000,
        })
    }
}

#[test]
fn pressure_clamps_quality_and_lifts_the_ceiling_when_it_eases() {
    let governor = Arc::new(RecordingGovernor::default());
    let usage = Arc::new(AtomicU64::new(990));
    let monitor = MemoryMonitor::new(
        MemoryMonitorConfig {
            smoothing: 1.0,
            ..Default::default()
        },
        Box::new(Dial(Arc::clone(&usage))),
    )
    .unwrap()
    .with_governor(governor.clone());

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    monitor.subscribe(move |e| sink.lock().unwrap().push((e.previous, e.current)));

    monitor.poll(0.0);
    assert_eq!(governor.quality(), 0.4);

    usage.store(900, Ordering::SeqCst);
    monitor.poll(1.0);
    // The ceiling relaxes to the high level but the clamped base stays put.
    assert_eq!(governor.quality(), 0.4);

    usage.store(500, Ordering::SeqCst);
    monitor.poll(2.0);
    monitor.poll(3.0);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            (PressureLevel::Low, PressureLevel::Critical),
            (PressureLevel::Critical, PressureLevel::High),
            (PressureLevel::High, PressureLevel::Low),
        ]
    );
    let state = governor.state.lock().unwrap();
    assert_eq!(state.memory_ceiling, None);
    assert_eq!(
        state.calls,
        vec![
            "clamp 0.4",
            "ceiling Some(0.4)",
            "clamp 0.6",
            "ceiling Some(0.6)",
            "ceiling None",
        ]
    );
}

#[test]
fn service_polls_until_disposed() {
    let clock = ManualClock::new(0.0);
    let polls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&polls);
    let source = EstimatedMemorySource::new("estimate", 1000, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        100
    });
    let monitor = Arc::new(
        MemoryMonitor::new(
            MemoryMonitorConfig {
                poll_interval_ms: 5,
                ..Default::default()
            },
            Box::new(source),
        )
        .unwrap(),
    );

    let mut service = MemoryMonitorService::start(Arc::clone(&monitor), Arc::new(clock)).unwrap();
    assert!(service.is_running());
    thread::sleep(Duration::from_millis(100));
    service.dispose();
    service.dispose();
    assert!(!service.is_running());

    let after_dispose = polls.load(Ordering::SeqCst);
    assert!(after_dispose > 0);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(polls.load(Ordering::SeqCst), after_dispose);
    assert_eq!(monitor.status().sample_count, after_dispose);
}
