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

// Starlight Sandbox
// Replays a scripted starfield session on a manual clock and prints what the
// adaptive layer decided.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use starlight_sdk::prelude::*;
use starlight_data::{Lease, Star};

const MIB: u64 = 1024 * 1024;

/// One leg of the script: how fast the host manages to paint, and how much
/// memory the rest of the page holds meanwhile.
struct Phase {
    name: &'static str,
    fps: f64,
    duration_ms: f64,
    page_memory: u64,
}

const SCRIPT: &[Phase] = &[
    Phase {
        name: "warm-up",
        fps: 60.0,
        duration_ms: 3_000.0,
        page_memory: 40 * MIB,
    },
    Phase {
        name: "heavy scroll",
        fps: 22.0,
        duration_ms: 4_000.0,
        page_memory: 60 * MIB,
    },
    Phase {
        name: "image gallery",
        fps: 45.0,
        duration_ms: 4_000.0,
        page_memory: 250 * MIB,
    },
    Phase {
        name: "idle",
        fps: 60.0,
        duration_ms: 20_000.0,
        page_memory: 50 * MIB,
    },
];

/// Deterministic xorshift so every run replays the same field.
struct Seed(u64);

impl Seed {
    fn next(&mut self) -> f32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }

    fn star(&mut self) -> Star {
        Star {
            x: self.next() * 2.0 - 1.0,
            y: self.next() * 2.0 - 1.0,
            z: 1.0,
            speed: 0.1 + self.next() * 0.4,
            brightness: 0.5 + self.next() * 0.5,
            phase: self.next() * std::f32::consts::TAU,
        }
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let page_memory = Arc::new(AtomicU64::new(0));
    let clock = ManualClock::new(0.0);
    let config = EngineConfig {
        background_services: false,
        ..EngineConfig::default()
    };
    let memory_source = {
        let page_memory = Arc::clone(&page_memory);
        EstimatedMemorySource::new("page", 256 * MIB, move || {
            page_memory.load(Ordering::Relaxed)
        })
    };
    let mut engine = PerformanceEngine::new(config, Arc::new(clock.clone()), Box::new(memory_source))?;
    let _quality = engine.subscribe_quality(|q| log::info!("quality -> {q:.2}"));
    let _pressure = engine.subscribe_pressure(|e| {
        log::info!("memory pressure {} -> {} ({:.2})", e.previous, e.current, e.usage_ratio)
    });

    let mut seed = Seed(0x5eed_cafe);
    let mut field: Vec<Lease<Star>> = Vec::new();
    let (width, height) = (engine.config().canvas_width, engine.config().canvas_height);
    let mut next_poll_ms = 0.0;
    let mut next_sweep_ms = 0.0;

    for phase in SCRIPT {
        log::info!("phase '{}': {:.0} fps for {:.0} ms", phase.name, phase.fps, phase.duration_ms);
        page_memory.store(phase.page_memory, Ordering::Relaxed);
        let dt = 1000.0 / phase.fps;
        let end = clock.now_ms() + phase.duration_ms;

        while clock.now_ms() < end {
            let now = clock.advance(dt);
            if now >= next_poll_ms {
                engine.poll_memory();
                next_poll_ms = now + engine.config().memory.poll_interval_ms as f64;
            }
            if now >= next_sweep_ms {
                engine.sweep_pools();
                next_sweep_ms = now + engine.config().pool_sweep_interval_ms as f64;
            }

            field.retain_mut(|star| star.advance(dt));
            let params = engine.effect_parameters();
            let star_count = params.star_count as usize;
            while field.len() < star_count {
                field.push(engine.stars().spawn(seed.star())?);
            }
            field.truncate(star_count);

            if !engine.tick() {
                continue;
            }
            let mut canvas = engine.canvases().acquire()?;
            canvas.clear(params.clear_strategy);
            for star in &field {
                let Some((sx, sy)) = star.project() else {
                    continue;
                };
                let px = ((sx + 1.0) * 0.5 * width as f32) as i64;
                let py = ((sy + 1.0) * 0.5 * height as f32) as i64;
                if px >= 0 && py >= 0 {
                    let shade = (star.intensity() * 255.0) as u8;
                    canvas.put_pixel(px as u32, py as u32, [shade, shade, shade, 255]);
                }
            }
        }
    }

    for event in engine.telemetry_events() {
        match event {
            TelemetryEvent::FpsMeasured { .. } => {}
            other => println!("{other:?}"),
        }
    }
    drop(field);
    println!("{}", engine.get_performance_metrics().to_json()?);
    engine.dispose();
    Ok(())
}
