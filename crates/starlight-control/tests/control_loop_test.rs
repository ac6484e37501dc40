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

//! Scripted scenarios for the full frame-rate loop.

use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use starlight_control::{
    AdjustmentBranch, FrameRateConfig, FrameRateController, HostContext, QualityConfig,
    QualityController,
};
use starlight_core::platform::{DeviceProfile, DeviceTier};

fn high_end_loop() -> FrameRateController {
    let quality = Arc::new(QualityController::new(QualityConfig::default()).unwrap());
    let context = HostContext {
        device: DeviceProfile {
            tier: DeviceTier::High,
            ..Default::default()
        },
        ..Default::default()
    };
    FrameRateController::new(FrameRateConfig::default(), quality, context).unwrap()
}

/// Feeds one 1000 ms window of evenly spaced ticks at `fps`, starting at
/// `start_ms`. Returns the end of the window.
fn run_window(
    frc: &FrameRateController,
    start_ms: f64,
    fps: u32,
) -> (f64, Option<starlight_control::WindowReport>) {
    let dt = 1000.0 / fps as f64;
    let mut report = None;
    for i in 1..=fps {
        if let Some(r) = frc.record_frame(start_ms + dt * i as f64) {
            report = Some(r);
        }
    }
    (start_ms + 1000.0, report)
}

#[test]
fn sustained_20_fps_reaches_min_quality_in_three_windows() {
    let frc = high_end_loop();
    frc.record_frame(0.0);
    let mut now = 0.0;
    let mut qualities = Vec::new();
    for _ in 0..3 {
        let (end, report) = run_window(&frc, now, 20);
        now = end;
        let report = report.expect("each window should close");
        assert_eq!(report.adjustment.branch, AdjustmentBranch::CriticalDrop);
        qualities.push(frc.quality().quality());
    }
    assert_relative_eq!(qualities[0], 0.8, epsilon = 1e-4);
    assert_relative_eq!(qualities[1], 0.6, epsilon = 1e-4);
    assert_eq!(qualities[2], 0.4);
}

#[test]
fn drops_are_immediate_and_recovery_waits() {
    let frc = high_end_loop();
    frc.record_frame(0.0);

    // low -> low
    let (now, report) = run_window(&frc, 0.0, 20);
    assert!(report.unwrap().adjustment.applied, "first low window must drop");
    let (mut now, report) = run_window(&frc, now, 20);
    assert!(report.unwrap().adjustment.applied);
    let mut last_change = now;
    let lowest = frc.quality().quality();

    // high -> high: smoothing pulls the estimate up over a few windows and
    // every raise must wait out the delay since the previous change.
    let mut recoveries = 0;
    for _ in 0..20 {
        let (end, report) = run_window(&frc, now, 120);
        now = end;
        let adjustment = report.expect("window should close").adjustment;
        if adjustment.branch == AdjustmentBranch::Recover {
            assert!(now - last_change > 5000.0);
            recoveries += 1;
        }
        if adjustment.applied {
            last_change = now;
        }
    }
    assert!(recoveries >= 2);
    assert!(frc.quality().quality() > lowest);
}

#[test]
fn fps_subscribers_see_every_window() {
    let frc = high_end_loop();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = frc.subscribe_fps(move |fps| sink.lock().unwrap().push(*fps));

    frc.record_frame(0.0);
    let (now, _) = run_window(&frc, 0.0, 60);
    let (now, _) = run_window(&frc, now, 30);
    subscription.unsubscribe();
    run_window(&frc, now, 30);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0], 60.0);
    assert_relative_eq!(seen[1], 60.0, epsilon = 0.5);
    assert_relative_eq!(seen[2], 51.0, epsilon = 0.5);
}

#[test]
fn gate_keeps_floor_rate_under_heavy_skipping() {
    let quality = Arc::new(QualityController::new(QualityConfig::default()).unwrap());
    let context = HostContext {
        device: DeviceProfile {
            tier: DeviceTier::Low,
            ..Default::default()
        },
        ..Default::default()
    };
    let frc = FrameRateController::new(FrameRateConfig::default(), quality, context).unwrap();
    frc.quality().set_quality(0.4, 0.0);

    let tick = 1000.0 / 60.0;
    let mut renders = Vec::new();
    for i in 0..600 {
        let now = i as f64 * tick;
        if frc.should_render(now) {
            renders.push(now);
        }
    }
    for pair in renders.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap > 33.3, "rendered twice within {gap} ms");
        assert!(gap <= 33.3 + tick + 1e-9, "no render for {gap} ms");
    }
}
