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

//! End-to-end scenarios for the performance engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use starlight_core::telemetry::{MemoryReadError, MemorySample, MemorySource};
use starlight_sdk::prelude::*;

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

#[derive(Debug)]
struct NoIntrospection;

impl MemorySource for NoIntrospection {
    fn name(&self) -> &str {
        "none"
    }

    fn sample(&mut self) -> Result<MemorySample, MemoryReadError> {
        Err(MemoryReadError::Unavailable("no memory API".into()))
    }
}

fn high_end_config() -> EngineConfig {
    EngineConfig {
        host: HostContext {
            device: DeviceProfile {
                tier: DeviceTier::High,
                ..Default::default()
            },
            ..Default::default()
        },
        background_services: false,
        ..Default::default()
    }
}

fn engine_with(source: Box<dyn MemorySource>) -> (PerformanceEngine, ManualClock) {
    let clock = ManualClock::new(0.0);
    let engine = PerformanceEngine::new(high_end_config(), Arc::new(clock.clone()), source).unwrap();
    (engine, clock)
}

/// Ticks at `fps` for `duration_ms`, continuing from the clock's current time.
fn run(engine: &PerformanceEngine, clock: &ManualClock, fps: f64, duration_ms: f64) -> usize {
    let dt = 1000.0 / fps;
    let start = clock.now_ms();
    let ticks = (duration_ms / dt).round() as usize;
    let mut rendered = 0;
    for i in 1..=ticks {
        clock.set(start + dt * i as f64);
        if engine.tick() {
            rendered += 1;
        }
    }
    rendered
}

#[test]
fn sustained_low_fps_drives_quality_to_minimum() {
    let (engine, clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(0)))));
    engine.tick();
    run(&engine, &clock, 20.0, 3000.0);

    assert_eq!(engine.quality(), 0.4);
    let events = engine.telemetry_events();
    let fps_windows = events
        .iter()
        .filter(|e| matches!(e, TelemetryEvent::FpsMeasured { .. }))
        .count();
    let quality_changes: Vec<(f32, f32)> = events
        .iter()
        .filter_map(|e| match e {
            TelemetryEvent::QualityChanged { previous, current } => Some((*previous, *current)),
            _ => None,
        })
        .collect();
    assert_eq!(fps_windows, 3);
    assert_eq!(quality_changes.len(), 3);
    assert_eq!(quality_changes[0].0, 1.0);
    assert_eq!(quality_changes[2].1, 0.4);

    let params = engine.effect_parameters();
    assert_eq!(params.star_count, 410);
    assert_eq!(params.clear_strategy, ClearStrategy::Full);

    // Pools shrink with quality: 800 * (0.5 + 0.5 * 0.4).
    assert_eq!(engine.stars().stats().capacity, 560);
}

#[test]
fn full_telemetry_queue_drops_events_without_stalling() {
    let clock = ManualClock::new(0.0);
    let config = EngineConfig {
        telemetry_buffer_size: 2,
        ..high_end_config()
    };
    let usage = Arc::new(AtomicU64::new(990));
    let engine =
        PerformanceEngine::new(config, Arc::new(clock.clone()), Box::new(Dial(usage))).unwrap();

    engine.tick();
    run(&engine, &clock, 20.0, 2000.0);
    engine.poll_memory();

    assert_eq!(engine.quality(), 0.4);
    assert_eq!(engine.telemetry_events().len(), 2);
    run(&engine, &clock, 20.0, 3000.0);
    assert_eq!(engine.telemetry_events().len(), 2);
}

#[test]
fn quality_target_fps_drives_the_gate() {
    let mut config = high_end_config();
    config.quality.target_fps = 30.0;
    config.frame_rate.gate.target_fps = 144.0;
    let engine = PerformanceEngine::new(
        config,
        Arc::new(ManualClock::new(0.0)),
        Box::new(Dial(Arc::new(AtomicU64::new(0)))),
    )
    .unwrap();
    assert_eq!(engine.config().frame_rate.gate.target_fps, 30.0);
}

#[test]
fn memory_pressure_clamps_and_then_releases_quality() {
    let usage = Arc::new(AtomicU64::new(990));
    let (engine, _clock) = engine_with(Box::new(Dial(Arc::clone(&usage))));
    let pressure = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&pressure);
    let _subscription = engine.subscribe_pressure(move |e| sink.lock().unwrap().push(e.current));

    let event = engine.poll_memory().unwrap();
    assert_eq!(event.current, PressureLevel::Critical);
    assert_eq!(engine.quality(), 0.4);
    assert_eq!(
        engine.get_performance_metrics().memory.pressure_level,
        PressureLevel::Critical
    );

    // 0.99 * 0.7 + 0.5 * 0.3 = 0.843: medium, the ceiling is lifted but the
    // clamped value only recovers through the slow FPS path.
    usage.store(500, Ordering::SeqCst);
    let event = engine.poll_memory().unwrap();
    assert_eq!(event.current, PressureLevel::Medium);
    assert_eq!(engine.quality(), 0.4);
    assert_eq!(engine.quality_controller().snapshot().ceilings.len(), 1);

    assert_eq!(
        *pressure.lock().unwrap(),
        vec![PressureLevel::Critical, PressureLevel::Medium]
    );
    let pressure_events = engine
        .telemetry_events()
        .into_iter()
        .filter(|e| matches!(e, TelemetryEvent::PressureChanged(_)))
        .count();
    assert_eq!(pressure_events, 2);
}

#[test]
fn unavailable_memory_api_falls_back_to_pool_estimate() {
    let (engine, _clock) = engine_with(Box::new(NoIntrospection));
    let star = engine.stars().spawn(Default::default()).unwrap();
    assert!(engine.poll_memory().is_none());
    drop(star);

    let memory = engine.get_performance_metrics().memory;
    assert_eq!(memory.source.as_deref(), Some("pool-estimate"));
    assert_eq!(memory.sample_count, 1);
    assert_eq!(memory.pressure_level, PressureLevel::Low);
    assert!(memory.used_bytes.unwrap() > 0);
}

#[test]
fn hidden_surface_suspends_rendering_and_measurement() {
    let (engine, clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(0)))));
    engine.tick();
    engine.set_visible(false);
    // A long stall while hidden must not be measured as a slow window.
    assert_eq!(run(&engine, &clock, 5.0, 10_000.0), 0);
    engine.set_visible(true);
    assert!(run(&engine, &clock, 60.0, 2000.0) > 0);

    assert_eq!(engine.quality(), 1.0);
    let visibility: Vec<bool> = engine
        .telemetry_events()
        .into_iter()
        .filter_map(|e| match e {
            TelemetryEvent::VisibilityChanged(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(visibility, vec![false, true]);
}

#[test]
fn user_quality_caps_recovery() {
    let (engine, clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(0)))));
    engine.set_user_quality(Some(0.5));
    assert_relative_eq!(engine.quality(), 0.5);

    engine.tick();
    run(&engine, &clock, 120.0, 12_000.0);
    assert_relative_eq!(engine.quality(), 0.5);

    engine.set_user_quality(None);
    assert!(engine.quality() >= 0.5);
}

#[test]
fn power_and_device_signals_apply_ceilings() {
    let (engine, _clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(0)))));
    engine.set_power_signals(PowerSignals {
        battery_saver: false,
        data_saver: true,
    });
    assert_relative_eq!(engine.quality(), 0.7);

    engine.set_device_profile(DeviceProfile::from_hints(DeviceHints {
        cpu_cores: Some(2),
        ..Default::default()
    }));
    assert_relative_eq!(engine.quality(), 0.6);

    let ceilings = engine
        .telemetry_events()
        .into_iter()
        .filter(|e| matches!(e, TelemetryEvent::CeilingChanged { .. }))
        .count();
    assert_eq!(ceilings, 4);
}

#[test]
fn quality_subscribers_receive_current_value_then_changes() {
    let (engine, clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(0)))));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = engine.subscribe_quality(move |q| sink.lock().unwrap().push(*q));

    engine.tick();
    run(&engine, &clock, 20.0, 1000.0);
    subscription.unsubscribe();
    run(&engine, &clock, 20.0, 1000.0);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], 1.0);
    assert_relative_eq!(seen[1], 0.8, epsilon = 1e-4);
}

#[test]
fn metrics_snapshot_serializes() {
    let (engine, clock) = engine_with(Box::new(Dial(Arc::new(AtomicU64::new(100)))));
    engine.tick();
    run(&engine, &clock, 60.0, 2000.0);
    engine.poll_memory();

    let metrics = engine.get_performance_metrics();
    assert!(metrics.visible);
    assert_relative_eq!(metrics.fps.current, 60.0, epsilon = 0.5);
    assert_eq!(metrics.memory.used_bytes, Some(100));
    let json = metrics.to_json().unwrap();
    assert!(json.contains("\"pressure_level\":\"low\""));
}

#[test]
fn background_services_stop_on_dispose() {
    let config = EngineConfig {
        pool_sweep_interval_ms: 5,
        memory: starlight_telemetry::MemoryMonitorConfig {
            poll_interval_ms: 5,
            ..Default::default()
        },
        ..high_end_config()
    };
    let config = EngineConfig {
        background_services: true,
        ..config
    };
    let mut engine = PerformanceEngine::new(
        config,
        Arc::new(SystemClock::new()),
        Box::new(Dial(Arc::new(AtomicU64::new(100)))),
    )
    .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(50));
    engine.dispose();
    engine.dispose();
    assert!(engine.is_disposed());

    let samples = engine.get_performance_metrics().memory.sample_count;
    assert!(samples > 0);
    std::thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(engine.get_performance_metrics().memory.sample_count, samples);
}
