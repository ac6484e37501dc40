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

//! Memory pressure monitoring.
//!
//! The monitor smooths the usage ratio before classifying it, emits one
//! [`PressureEvent`] per level transition, and narrows quality through the
//! attached [`QualityGovernor`] while pressure is high.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use serde::{Deserialize, Serialize};
use starlight_core::error::{ensure_positive, ensure_unit_range, ConfigError};
use starlight_core::event::{SubscriberSet, Subscription};
use starlight_core::quality::{CeilingSource, QualityGovernor};
use starlight_core::telemetry::{
    MemoryReadError, MemorySample, MemorySource, PressureEvent, PressureLevel,
};

/// Configuration for the [`MemoryMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryMonitorConfig {
    /// Polling period of the monitor service.
    pub poll_interval_ms: u64,
    /// Weight of a new sample in the smoothed ratio.
    pub smoothing: f64,
    /// Ratio above which pressure is medium.
    pub medium_threshold: f64,
    /// Ratio above which pressure is high.
    pub high_threshold: f64,
    /// Ratio above which pressure is critical.
    pub critical_threshold: f64,
    /// Quality ceiling while pressure is high.
    pub high_ceiling: f32,
    /// Quality ceiling while pressure is critical.
    pub critical_ceiling: f32,
}

impl Default for MemoryMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
            smoothing: 0.3,
            medium_threshold: 0.7,
            high_threshold: 0.85,
            critical_threshold: 0.95,
            high_ceiling: 0.6,
            critical_ceiling: 0.4,
        }
    }
}

impl MemoryMonitorConfig {
    /// Checks the configuration for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("poll_interval_ms", self.poll_interval_ms as f64)?;
        ensure_positive("smoothing", self.smoothing)?;
        ensure_unit_range("smoothing", self.smoothing)?;
        ensure_unit_range("high_ceiling", self.high_ceiling as f64)?;
        ensure_unit_range("critical_ceiling", self.critical_ceiling as f64)?;
        if !(self.medium_threshold <= self.high_threshold
            && self.high_threshold <= self.critical_threshold)
        {
            return Err(ConfigError::UnorderedThresholds(
                "medium_threshold <= high_threshold <= critical_threshold",
            ));
        }
        Ok(())
    }

    /// Maps a usage ratio to a pressure level.
    pub fn classify(&self, ratio: f64) -> PressureLevel {
        if ratio > self.critical_threshold {
            PressureLevel::Critical
        } else if ratio > self.high_threshold {
            PressureLevel::High
        } else if ratio > self.medium_threshold {
            PressureLevel::Medium
        } else {
            PressureLevel::Low
        }
    }

    /// The quality ceiling a level imposes, if any.
    pub fn ceiling_for(&self, level: PressureLevel) -> Option<f32> {
        match level {
            PressureLevel::Critical => Some(self.critical_ceiling),
            PressureLevel::High => Some(self.high_ceiling),
            PressureLevel::Medium | PressureLevel::Low => None,
        }
    }
}

/// A snapshot of the monitor's state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryStatus {
    /// Current pressure level.
    pub level: PressureLevel,
    /// Smoothed usage ratio, once at least one sample succeeded.
    pub usage_ratio: Option<f64>,
    /// Most recent successful sample.
    pub last_sample: Option<MemorySample>,
    /// Highest `used_bytes` seen.
    pub peak_used_bytes: u64,
    /// Successful samples taken.
    pub sample_count: u64,
    /// Failed polls.
    pub failure_count: u64,
    /// Name of the source currently in use, if any is usable.
    pub active_source: Option<String>,
}

#[derive(Debug)]
struct Sources {
    primary: Option<Box<dyn MemorySource>>,
    fallback: Option<Box<dyn MemorySource>>,
}

impl Sources {
    /// Reads from the first usable source, discarding sources that report
    /// themselves unavailable.
    fn sample(&mut self) -> Option<(Result<MemorySample, MemoryReadError>, String)> {
        for slot in [&mut self.primary, &mut self.fallback] {
            let Some(source) = slot.as_mut() else {
                continue;
            };
            match source.sample() {
                Err(MemoryReadError::Unavailable(reason)) => {
                    log::warn!(
                        "Memory source '{}' unavailable ({reason}); disabling it",
                        source.name()
                    );
                    *slot = None;
                }
                result => return Some((result, source.name().to_owned())),
            }
        }
        None
    }

    fn active_name(&self) -> Option<String> {
        self.primary
            .as_ref()
            .or(self.fallback.as_ref())
            .map(|source| source.name().to_owned())
    }
}

/// Classifies memory usage into pressure levels.
///
/// Polls are serialized: pressure events reach subscribers in the order the
/// transitions occurred. No lock a reader needs is held while the governor or
/// subscribers run, and a poll that starts while another one is in flight
/// returns `None` at once instead of waiting for it.
pub struct MemoryMonitor {
    config: MemoryMonitorConfig,
    polling: Mutex<()>,
    sources: Mutex<Sources>,
    status: Mutex<MemoryStatus>,
    governor: Option<Arc<dyn QualityGovernor>>,
    subscribers: SubscriberSet<PressureEvent>,
}

impl MemoryMonitor {
    /// Creates a monitor reading from `source`.
    pub fn new(
        config: MemoryMonitorConfig,
        source: Box<dyn MemorySource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let status = MemoryStatus {
            active_source: Some(source.name().to_owned()),
            ..MemoryStatus::default()
        };
        Ok(Self {
            config,
            polling: Mutex::new(()),
            sources: Mutex::new(Sources {
                primary: Some(source),
                fallback: None,
            }),
            status: Mutex::new(status),
            governor: None,
            subscribers: SubscriberSet::new(),
        })
    }

    /// Adds a source used once the primary reports itself unavailable.
    pub fn with_fallback(self, fallback: Box<dyn MemorySource>) -> Self {
        self.lock_sources().fallback = Some(fallback);
        self
    }

    /// Attaches the quality controller narrowed under pressure.
    pub fn with_governor(mut self, governor: Arc<dyn QualityGovernor>) -> Self {
        self.governor = Some(governor);
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &MemoryMonitorConfig {
        &self.config
    }

    /// Subscribes to pressure transitions.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PressureEvent) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Takes one sample and returns the transition it caused, if any.
    ///
    /// Failures never escape: an unavailable source is dropped in favour of
    /// the fallback, and a transient failure keeps the last known level.
    pub fn poll(&self, now_ms: f64) -> Option<PressureEvent> {
        let _polling = match self.polling.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                log::debug!("Memory poll skipped: another poll is in flight");
                return None;
            }
        };
        let sampled = self.lock_sources().sample();
        let Some((result, source_name)) = sampled else {
            let mut status = self.lock_status();
            if status.active_source.take().is_some() {
                log::warn!("No memory source available; pressure stays at {}", status.level);
            }
            return None;
        };

        let sample = match result.and_then(|sample| {
            sample
                .usage_ratio()
                .map(|ratio| (sample, ratio))
                .ok_or_else(|| MemoryReadError::Transient("zero memory limit".into()))
        }) {
            Ok(sample) => sample,
            Err(err) => {
                log::warn!("Memory poll via '{source_name}' failed: {err}");
                self.lock_status().failure_count += 1;
                return None;
            }
        };

        let event = self.record(sample, source_name, now_ms);
        if let Some(event) = event {
            self.apply_pressure(&event, now_ms);
            self.subscribers.publish(&event);
        }
        event
    }

    /// Current status.
    pub fn status(&self) -> MemoryStatus {
        self.lock_status().clone()
    }

    /// Current pressure level.
    pub fn level(&self) -> PressureLevel {
        self.lock_status().level
    }

    /// Name of the source that will serve the next poll, if any.
    pub fn active_source(&self) -> Option<String> {
        self.lock_sources().active_name()
    }

    fn record(
        &self,
        (sample, ratio): (MemorySample, f64),
        source_name: String,
        now_ms: f64,
    ) -> Option<PressureEvent> {
        let mut status = self.lock_status();
        let smoothed = match status.usage_ratio {
            Some(previous) => previous * (1.0 - self.config.smoothing) + ratio * self.config.smoothing,
            None => ratio,
        };
        status.usage_ratio = Some(smoothed);
        status.last_sample = Some(sample);
        status.peak_used_bytes = status.peak_used_bytes.max(sample.used_bytes);
        status.sample_count += 1;
        status.active_source = Some(source_name);

        let previous = status.level;
        let current = self.config.classify(smoothed);
        log::trace!(
            "Memory {:.1} MB, ratio {ratio:.3} (smoothed {smoothed:.3}), level {current}",
            sample.used_mb()
        );
        if current == previous {
            return None;
        }
        status.level = current;
        Some(PressureEvent {
            previous,
            current,
            usage_ratio: smoothed,
            at_ms: now_ms,
        })
    }

    fn apply_pressure(&self, event: &PressureEvent, now_ms: f64) {
        if event.is_escalation() {
            log::warn!(
                "Memory pressure rose: {} -> {} (ratio {:.3})",
                event.previous,
                event.current,
                event.usage_ratio
            );
        } else {
            log::info!(
                "Memory pressure eased: {} -> {} (ratio {:.3})",
                event.previous,
                event.current,
                event.usage_ratio
            );
        }

        let Some(governor) = &self.governor else {
            return;
        };
        match self.config.ceiling_for(event.current) {
            Some(ceiling) => {
                governor.clamp_down(ceiling, now_ms);
                governor.set_ceiling(CeilingSource::MemoryPressure, Some(ceiling));
            }
            None if event.previous.is_constraining() => {
                governor.set_ceiling(CeilingSource::MemoryPressure, None);
            }
            None => {}
        }
    }

    fn lock_sources(&self) -> MutexGuard<'_, Sources> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_status(&self) -> MutexGuard<'_, MemoryStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("config", &self.config)
            .field("status", &self.status())
            .field("has_governor", &self.governor.is_some())
            .field("subscribers", &self.subscribers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::VecDeque;

    #[derive(Debug)]
    struct Scripted(VecDeque<Result<MemorySample, MemoryReadError>>);

    impl MemorySource for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn sample(&mut self) -> Result<MemorySample, MemoryReadError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(MemoryReadError::Transient("script exhausted".into())))
        }
    }

    fn ratio(r: f64) -> Result<MemorySample, MemoryReadError> {
        Ok(MemorySample {
            used_bytes: (r * 1000.0) as u64,
            limit_bytes: 1000,
        })
    }

    fn monitor(script: Vec<Result<MemorySample, MemoryReadError>>) -> MemoryMonitor {
        MemoryMonitor::new(
            MemoryMonitorConfig::default(),
            Box::new(Scripted(script.into())),
        )
        .unwrap()
    }

    #[test]
    fn classification_thresholds() {
        let config = MemoryMonitorConfig::default();
        assert_eq!(config.classify(0.5), PressureLevel::Low);
        assert_eq!(config.classify(0.7), PressureLevel::Low);
        assert_eq!(config.classify(0.71), PressureLevel::Medium);
        assert_eq!(config.classify(0.86), PressureLevel::High);
        assert_eq!(config.classify(0.96), PressureLevel::Critical);
    }

    #[test]
    fn first_sample_bootstraps_the_ratio() {
        let m = monitor(vec![ratio(0.9), ratio(0.5)]);
        let event = m.poll(0.0).unwrap();
        assert_eq!(event.current, PressureLevel::High);
        assert_relative_eq!(event.usage_ratio, 0.9);

        // 0.9 * 0.7 + 0.5 * 0.3 = 0.78
        m.poll(1.0);
        assert_relative_eq!(m.status().usage_ratio.unwrap(), 0.78, epsilon = 1e-9);
        assert_eq!(m.level(), PressureLevel::Medium);
    }

    #[test]
    fn same_ratio_twice_emits_one_event() {
        let m = monitor(vec![ratio(0.9), ratio(0.9)]);
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        m.subscribe(move |_| *sink.lock().unwrap() += 1);
        assert!(m.poll(0.0).is_some());
        assert!(m.poll(1.0).is_none());
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn transient_failure_keeps_last_level() {
        let m = monitor(vec![
            ratio(0.9),
            Err(MemoryReadError::Transient("busy".into())),
        ]);
        m.poll(0.0);
        assert!(m.poll(1.0).is_none());
        let status = m.status();
        assert_eq!(status.level, PressureLevel::High);
        assert_eq!(status.failure_count, 1);
        assert_eq!(status.sample_count, 1);
    }

    #[test]
    fn unavailable_source_falls_back() {
        let m = monitor(vec![Err(MemoryReadError::Unavailable("no api".into()))])
            .with_fallback(Box::new(Scripted(vec![ratio(0.99)].into())));
        let event = m.poll(0.0).unwrap();
        assert_eq!(event.current, PressureLevel::Critical);
        assert_eq!(m.status().active_source.as_deref(), Some("scripted"));
    }

    #[test]
    fn no_usable_source_is_a_no_op() {
        let m = monitor(vec![Err(MemoryReadError::Unavailable("no api".into()))]);
        assert!(m.poll(0.0).is_none());
        assert!(m.poll(1.0).is_none());
        assert_eq!(m.level(), PressureLevel::Low);
        assert_eq!(m.active_source(), None);
    }

    #[test]
    fn peak_tracks_the_largest_sample() {
        let m = monitor(vec![ratio(0.3), ratio(0.6), ratio(0.2)]);
        for t in 0..3 {
            m.poll(t as f64);
        }
        assert_eq!(m.status().peak_used_bytes, 600);
    }

    #[test]
    fn subscribers_can_query_and_poll_the_monitor() {
        let m = Arc::new(monitor(vec![ratio(0.99), ratio(0.99)]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (monitor_ref, sink) = (Arc::clone(&m), Arc::clone(&seen));
        m.subscribe(move |_| {
            let nested = monitor_ref.poll(1.0);
            sink.lock()
                .unwrap()
                .push((monitor_ref.active_source(), nested.is_none()));
        });

        let (tx, rx) = std::sync::mpsc::channel();
        let poller = Arc::clone(&m);
        std::thread::spawn(move || {
            let _ = tx.send(poller.poll(0.0));
        });
        let event = rx
            .recv_timeout(std::time::Duration::from_secs(2))
            .expect("poll must not block on its own subscribers");
        assert_eq!(event.unwrap().current, PressureLevel::Critical);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some("scripted".to_owned()), true)]
        );
        // The nested poll was skipped, so the script still has one sample.
        assert_eq!(m.status().sample_count, 1);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let config = MemoryMonitorConfig {
            high_threshold: 0.99,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
