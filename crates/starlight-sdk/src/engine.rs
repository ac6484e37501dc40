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

//! The composition root wiring the control loop, memory monitor and pools.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use starlight_control::{FrameRateController, QualityController, WindowReport};
use starlight_core::clock::Clock;
use starlight_core::event::{EventBus, Subscription};
use starlight_core::platform::{DeviceProfile, PowerSignals};
use starlight_core::quality::{CeilingSource, QualityGovernor};
use starlight_core::telemetry::{MemorySource, PressureEvent, TelemetryEvent};
use starlight_core::timer::IntervalTimer;
use starlight_data::{CanvasDocument, CanvasPool, StarPool};
use starlight_telemetry::{EstimatedMemorySource, MemoryMonitor, MemoryMonitorService};

use crate::config::EngineConfig;
use crate::effects::EffectParameters;
use crate::metrics::{MemoryMetrics, PerformanceMetrics};

/// Owns every component of the adaptive performance loop.
///
/// Construct one per rendering surface and drive it from the host's frame
/// callback with [`tick`](Self::tick). All cross-component signalling goes
/// through the quality controller: the memory monitor proposes ceilings, the
/// pools only read the resulting quality.
pub struct PerformanceEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    quality: Arc<QualityController>,
    frames: FrameRateController,
    memory: Arc<MemoryMonitor>,
    memory_service: Option<MemoryMonitorService>,
    stars: StarPool,
    canvases: CanvasPool,
    sweep_timer: Option<IntervalTimer>,
    events: EventBus<TelemetryEvent>,
    bridges: Vec<Subscription>,
    disposed: bool,
}

impl PerformanceEngine {
    /// Builds the engine.
    ///
    /// `memory_source` is the preferred memory reading; when it reports
    /// itself unavailable the monitor falls back to an estimate derived from
    /// the pools.
    pub fn new(
        mut config: EngineConfig,
        clock: Arc<dyn Clock>,
        memory_source: Box<dyn MemorySource>,
    ) -> anyhow::Result<Self> {
        config.frame_rate.gate.target_fps = config.quality.target_fps;
        config.validate()?;

        let quality = Arc::new(QualityController::new(config.quality)?);
        let frames = FrameRateController::new(config.frame_rate, Arc::clone(&quality), config.host)?;

        let stars = StarPool::new(config.star_pool, Arc::clone(&clock))
            .context("failed to create the star pool")?;
        let canvases = CanvasPool::new(
            config.canvas_pool,
            Arc::clone(&clock),
            Arc::new(CanvasDocument::new()),
            config.canvas_width,
            config.canvas_height,
        )
        .context("failed to create the canvas pool")?;

        let estimate = {
            let stars = stars.clone();
            let canvases = canvases.clone();
            EstimatedMemorySource::new(
                "pool-estimate",
                config.estimated_memory_limit_bytes,
                move || stars.pool().estimated_bytes() + canvases.pool().estimated_bytes(),
            )
        };
        let governor: Arc<dyn QualityGovernor> = quality.clone();
        let memory = Arc::new(
            MemoryMonitor::new(config.memory, memory_source)?
                .with_fallback(Box::new(estimate))
                .with_governor(governor),
        );

        let events = EventBus::bounded(config.telemetry_buffer_size);
        let bridges = Self::bridge(&quality, &memory, &stars, &canvases, &events);

        let mut engine = Self {
            config,
            clock,
            quality,
            frames,
            memory,
            memory_service: None,
            stars,
            canvases,
            sweep_timer: None,
            events,
            bridges,
            disposed: false,
        };
        if engine.config.background_services {
            engine.start_services()?;
        }
        log::info!(
            "Performance engine ready (quality {:.2}, tier {:?})",
            engine.quality.quality(),
            engine.config.host.device.tier
        );
        Ok(engine)
    }

    /// Internal subscriptions: telemetry forwarding and pool sizing.
    fn bridge(
        quality: &QualityController,
        memory: &MemoryMonitor,
        stars: &StarPool,
        canvases: &CanvasPool,
        events: &EventBus<TelemetryEvent>,
    ) -> Vec<Subscription> {
        let previous = Mutex::new(None::<f32>);
        let bus = events.clone();
        let star_pool = stars.pool().clone();
        let canvas_pool = canvases.pool().clone();
        let on_quality = quality.subscribe(move |&current| {
            star_pool.set_quality_hint(current);
            canvas_pool.set_quality_hint(current);
            let mut previous = previous.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = previous.replace(current) {
                bus.publish(TelemetryEvent::QualityChanged { previous, current });
            }
        });

        let bus = events.clone();
        let on_pressure = memory.subscribe(move |event| {
            bus.publish(TelemetryEvent::PressureChanged(*event));
        });

        vec![on_quality, on_pressure]
    }

    fn start_services(&mut self) -> anyhow::Result<()> {
        self.memory_service = Some(MemoryMonitorService::start(
            Arc::clone(&self.memory),
            Arc::clone(&self.clock),
        )?);

        let stars = self.stars.clone();
        let canvases = self.canvases.clone();
        let clock = Arc::clone(&self.clock);
        let timer = IntervalTimer::start(
            "starlight-pool-sweep",
            Duration::from_millis(self.config.pool_sweep_interval_ms),
            move || {
                let now_ms = clock.now_ms();
                stars.pool().sweep(now_ms);
                canvases.pool().sweep(now_ms);
            },
        )
        .context("failed to spawn the pool sweep thread")?;
        self.sweep_timer = Some(timer);
        Ok(())
    }

    /// Records the current frame and returns whether it should be rendered.
    pub fn tick(&self) -> bool {
        let now_ms = self.clock.now_ms();
        self.record_frame_at(now_ms);
        self.frames.should_render(now_ms)
    }

    /// Counts one animation tick without deciding admission.
    pub fn record_frame(&self) -> Option<WindowReport> {
        self.record_frame_at(self.clock.now_ms())
    }

    fn record_frame_at(&self, now_ms: f64) -> Option<WindowReport> {
        let report = self.frames.record_frame(now_ms)?;
        self.events.publish(TelemetryEvent::FpsMeasured {
            fps: report.measurement.fps,
            raw_fps: report.measurement.raw_fps,
            at_ms: now_ms,
        });
        Some(report)
    }

    /// Decides whether the current frame should be painted.
    pub fn should_render_frame(&self) -> bool {
        self.frames.should_render(self.clock.now_ms())
    }

    /// Subscribes to quality changes; the current value is delivered first.
    pub fn subscribe_quality<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&f32) + Send + Sync + 'static,
    {
        self.quality.subscribe(callback)
    }

    /// Subscribes to FPS windows; the current estimate is delivered first.
    pub fn subscribe_fps<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&f32) + Send + Sync + 'static,
    {
        self.frames.subscribe_fps(callback)
    }

    /// Subscribes to memory pressure transitions.
    pub fn subscribe_pressure<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PressureEvent) + Send + Sync + 'static,
    {
        self.memory.subscribe(callback)
    }

    /// Reports surface visibility.
    pub fn set_visible(&self, visible: bool) {
        if self.frames.set_visible(visible) {
            self.events.publish(TelemetryEvent::VisibilityChanged(visible));
        }
    }

    /// Reports battery and data saver preferences.
    pub fn set_power_signals(&self, power: PowerSignals) {
        self.frames.set_power_signals(power);
        self.publish_ceilings(&[CeilingSource::Battery, CeilingSource::DataSaver]);
    }

    /// Reports a reclassified device.
    pub fn set_device_profile(&self, profile: DeviceProfile) {
        self.frames.set_device_profile(profile);
        self.publish_ceilings(&[CeilingSource::DeviceTier, CeilingSource::ReducedMotion]);
    }

    /// Applies (`Some`) or clears (`None`) an explicit user quality setting.
    ///
    /// The value becomes both the current quality and a ceiling, so FPS-driven
    /// recovery never goes above what the user asked for.
    pub fn set_user_quality(&self, quality: Option<f32>) {
        if let Some(value) = quality {
            self.quality.set_quality(value, self.clock.now_ms());
        }
        self.quality.set_ceiling(CeilingSource::User, quality);
        self.events.publish(TelemetryEvent::CeilingChanged {
            source: CeilingSource::User,
            ceiling: quality,
        });
    }

    fn publish_ceilings(&self, sources: &[CeilingSource]) {
        let context = self.frames.context();
        for (source, ceiling) in context.ceilings(self.config.quality.min_quality) {
            if sources.contains(&source) {
                self.events
                    .publish(TelemetryEvent::CeilingChanged { source, ceiling });
            }
        }
    }

    /// Current effective quality.
    pub fn quality(&self) -> f32 {
        self.quality.quality()
    }

    /// Effect parameters for the current quality.
    pub fn effect_parameters(&self) -> EffectParameters {
        EffectParameters::from_quality(self.quality.quality())
    }

    /// Captures a diagnostic snapshot.
    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let status = self.memory.status();
        let quality = self.quality.snapshot();
        PerformanceMetrics {
            at_ms: self.clock.now_ms(),
            fps: self.frames.fps_summary(),
            effects: EffectParameters::from_quality(quality.quality),
            quality,
            memory: MemoryMetrics {
                pressure_level: status.level,
                usage_ratio: status.usage_ratio,
                used_bytes: status.last_sample.map(|sample| sample.used_bytes),
                peak_used_bytes: status.peak_used_bytes,
                sample_count: status.sample_count,
                failure_count: status.failure_count,
                source: status.active_source,
            },
            frames: self.frames.gate_stats(),
            star_pool: self.stars.stats(),
            canvas_pool: self.canvases.stats(),
            visible: self.frames.context().visible,
        }
    }

    /// Samples memory now, outside the polling schedule.
    pub fn poll_memory(&self) -> Option<PressureEvent> {
        self.memory.poll(self.clock.now_ms())
    }

    /// Runs one hibernation sweep over both pools now.
    pub fn sweep_pools(&self) -> usize {
        let now_ms = self.clock.now_ms();
        self.stars.pool().sweep(now_ms) + self.canvases.pool().sweep(now_ms)
    }

    /// Drains queued telemetry events.
    pub fn telemetry_events(&self) -> Vec<TelemetryEvent> {
        self.events.drain()
    }

    /// A receiver for consumers draining telemetry on their own thread.
    pub fn telemetry_receiver(&self) -> flume::Receiver<TelemetryEvent> {
        self.events.receiver()
    }

    /// The star particle pool.
    pub fn stars(&self) -> &StarPool {
        &self.stars
    }

    /// The offscreen canvas pool.
    pub fn canvases(&self) -> &CanvasPool {
        &self.canvases
    }

    /// The quality controller.
    pub fn quality_controller(&self) -> &Arc<QualityController> {
        &self.quality
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns `true` once [`dispose`](Self::dispose) ran.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stops every timer and internal subscription.
    ///
    /// Idempotent. When it returns, no timer callback will run again.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut service) = self.memory_service.take() {
            service.dispose();
        }
        if let Some(mut timer) = self.sweep_timer.take() {
            timer.dispose();
        }
        for subscription in self.bridges.drain(..) {
            subscription.unsubscribe();
        }
        log::info!("Performance engine disposed");
    }
}

impl Drop for PerformanceEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PerformanceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceEngine")
            .field("quality", &self.quality.quality())
            .field("memory", &self.memory)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
