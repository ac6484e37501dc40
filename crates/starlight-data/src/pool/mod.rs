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

//! Generic object pooling.
//!
//! Behaviour choices, applied uniformly by every pool in this crate:
//!
//! - **Hard cap.** At most `capacity` objects are pooled. When all of them are
//!   leased, [`ObjectPool::acquire`] still succeeds but hands out a
//!   *transient* object that is dropped (not pooled) on release. The count of
//!   such objects is reported in [`PoolStats::transient`].
//! - **Deferred reset.** Releasing only marks an entry free. The reset hook runs
//!   on the acquire that reuses it, so entries that hibernate first are never
//!   reset for nothing.
//! - **Bounded sweeps.** [`ObjectPool::hibernate_unused`] evicts at most
//!   `max_evictions_per_sweep` entries per call.

mod lease;
pub mod canvas;
pub mod particles;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use starlight_core::clock::Clock;
use starlight_core::error::{ensure_positive, ConfigError};
use thiserror::Error;

pub use self::lease::Lease;

type Factory<T> = Box<dyn FnMut() -> anyhow::Result<T> + Send>;
type Hook<T> = Box<dyn FnMut(&mut T) + Send>;
type EvictHook<T> = Box<dyn FnMut(T) + Send>;

/// Errors returned by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The factory could not produce an object. Nothing was registered.
    #[error("object factory failed: {0:#}")]
    Factory(anyhow::Error),
    /// The pool configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration for an [`ObjectPool`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum pooled objects at full quality.
    pub max_pool_size: usize,
    /// Idle time after which a free entry may be evicted, at full quality.
    pub hibernation_threshold_ms: f64,
    /// Upper bound on evictions per sweep.
    pub max_evictions_per_sweep: usize,
    /// Estimated size of one object, used for the memory-saved figure.
    pub object_size_bytes: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 32,
            hibernation_threshold_ms: 30_000.0,
            max_evictions_per_sweep: 16,
            object_size_bytes: 0,
        }
    }
}

impl PoolConfig {
    /// Checks the configuration for structural errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("max_pool_size", self.max_pool_size as f64)?;
        ensure_positive("hibernation_threshold_ms", self.hibernation_threshold_ms)?;
        ensure_positive("max_evictions_per_sweep", self.max_evictions_per_sweep as f64)
    }
}

/// Cumulative pool statistics.
///
/// `created`, `reused`, `transient` and `hibernated` only ever grow, except
/// across an explicit [`ObjectPool::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PoolStats {
    /// Objects created into the pool.
    pub created: u64,
    /// Acquires served by an existing entry.
    pub reused: u64,
    /// Objects handed out beyond capacity.
    pub transient: u64,
    /// Entries evicted by sweeps.
    pub hibernated: u64,
    /// Pooled entries currently leased.
    pub active: usize,
    /// Pooled entries currently free.
    pub idle: usize,
    /// Effective capacity.
    pub capacity: usize,
    /// `reused / (created + reused)`.
    pub reuse_ratio: f64,
    /// `reused * object_size_bytes`.
    pub memory_saved_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    created: u64,
    reused: u64,
    transient: u64,
    hibernated: u64,
}

struct Entry<T> {
    /// `None` while leased.
    object: Option<T>,
    last_used_ms: f64,
}

pub(crate) struct PoolState<T> {
    entries: Vec<Option<Entry<T>>>,
    vacant: Vec<usize>,
    free: Vec<usize>,
    pooled: usize,
    epoch: u64,
    capacity: usize,
    scale: f64,
    counters: Counters,
    factory: Factory<T>,
    reset: Option<Hook<T>>,
    on_evict: Option<EvictHook<T>>,
    clock: Arc<dyn Clock>,
}

impl<T> PoolState<T> {
    /// Hands a free entry out, running the deferred reset.
    fn take_free(&mut self, now_ms: f64) -> Option<(usize, T)> {
        while let Some(index) = self.free.pop() {
            let Some(Some(entry)) = self.entries.get_mut(index) else {
                continue;
            };
            let Some(mut object) = entry.object.take() else {
                continue;
            };
            entry.last_used_ms = now_ms;
            if let Some(reset) = self.reset.as_mut() {
                reset(&mut object);
            }
            return Some((index, object));
        }
        None
    }

    /// Registers a new leased entry and returns its slot.
    fn register(&mut self, now_ms: f64) -> usize {
        let entry = Some(Entry {
            object: None,
            last_used_ms: now_ms,
        });
        self.pooled += 1;
        match self.vacant.pop() {
            Some(index) => {
                self.entries[index] = entry;
                index
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }

    /// Takes a released object back.
    pub(crate) fn give_back(&mut self, slot: Option<usize>, epoch: u64, object: T) {
        let now_ms = self.clock.now_ms();
        if let Some(index) = slot.filter(|_| epoch == self.epoch) {
            if let Some(Some(entry)) = self.entries.get_mut(index) {
                if entry.object.is_none() {
                    entry.object = Some(object);
                    entry.last_used_ms = now_ms;
                    self.free.push(index);
                    return;
                }
            }
        }
        self.discard(object);
    }

    fn evict(&mut self, index: usize) {
        let Some(entry) = self.entries.get_mut(index).and_then(Option::take) else {
            return;
        };
        self.vacant.push(index);
        self.pooled -= 1;
        self.free.retain(|&free| free != index);
        if let Some(object) = entry.object {
            self.discard(object);
        }
    }

    fn discard(&mut self, object: T) {
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(object);
        }
    }
}

/// A fixed-capacity pool of reusable objects.
///
/// Cloning the pool yields another handle to the same entries.
pub struct ObjectPool<T> {
    config: PoolConfig,
    state: Arc<Mutex<PoolState<T>>>,
}

impl<T> Clone for ObjectPool<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Send + 'static> ObjectPool<T> {
    /// Creates an empty pool. Objects are created lazily by `factory`.
    pub fn new<F>(config: PoolConfig, clock: Arc<dyn Clock>, factory: F) -> Result<Self, PoolError>
    where
        F: FnMut() -> anyhow::Result<T> + Send + 'static,
    {
        config.validate()?;
        Ok(Self {
            config,
            state: Arc::new(Mutex::new(PoolState {
                entries: Vec::new(),
                vacant: Vec::new(),
                free: Vec::new(),
                pooled: 0,
                epoch: 0,
                capacity: config.max_pool_size,
                scale: 1.0,
                counters: Counters::default(),
                factory: Box::new(factory),
                reset: None,
                on_evict: None,
                clock,
            })),
        })
    }

    /// Sets the hook that returns a reused object to a clean state.
    pub fn with_reset<F>(self, reset: F) -> Self
    where
        F: FnMut(&mut T) + Send + 'static,
    {
        self.lock().reset = Some(Box::new(reset));
        self
    }

    /// Sets the hook run for every object leaving the pool for good.
    pub fn with_evict_hook<F>(self, on_evict: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        self.lock().on_evict = Some(Box::new(on_evict));
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Leases an object: a free entry if any, else a new pooled entry while
    /// under capacity, else a transient object.
    ///
    /// A factory failure is returned as [`PoolError::Factory`] and leaves the
    /// pool unchanged.
    pub fn acquire(&self) -> Result<Lease<T>, PoolError> {
        let weak = Arc::downgrade(&self.state);
        let mut guard = self.lock();
        let state = &mut *guard;
        let now_ms = state.clock.now_ms();
        let epoch = state.epoch;

        if let Some((index, object)) = state.take_free(now_ms) {
            state.counters.reused += 1;
            return Ok(Lease::new(object, Some(index), epoch, weak));
        }

        let object = (state.factory)().map_err(PoolError::Factory)?;
        if state.pooled < state.capacity {
            let index = state.register(now_ms);
            state.counters.created += 1;
            Ok(Lease::new(object, Some(index), epoch, weak))
        } else {
            state.counters.transient += 1;
            log::debug!(
                "Pool exhausted ({} entries leased); handing out a transient object",
                state.pooled
            );
            Ok(Lease::new(object, None, epoch, weak))
        }
    }

    /// Returns a leased object. Equivalent to dropping the lease.
    pub fn release(&self, lease: Lease<T>) {
        drop(lease);
    }

    /// Scales capacity and idle threshold with quality: lower quality keeps a
    /// smaller pool that empties faster.
    pub fn set_quality_hint(&self, quality: f32) {
        let scale = 0.5 + 0.5 * f64::from(quality.clamp(0.0, 1.0));
        let capacity = ((self.config.max_pool_size as f64 * scale).round() as usize).max(1);
        let mut state = self.lock();
        state.scale = scale;
        if state.capacity != capacity {
            log::debug!("Pool capacity {} -> {capacity} (quality {quality:.2})", state.capacity);
            state.capacity = capacity;
        }
    }

    /// Evicts free entries idle for longer than `threshold_ms` (scaled by the
    /// quality hint), plus free entries beyond the effective capacity.
    ///
    /// Oldest entries go first. Returns the number evicted.
    pub fn hibernate_unused(&self, now_ms: f64, threshold_ms: f64) -> usize {
        let mut state = self.lock();
        let threshold_ms = threshold_ms * state.scale;
        let mut candidates: Vec<(usize, f64)> = state
            .free
            .iter()
            .filter_map(|&index| match state.entries.get(index) {
                Some(Some(entry)) => Some((index, entry.last_used_ms)),
                _ => None,
            })
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut excess = state.pooled.saturating_sub(state.capacity);
        let mut evicted = 0;
        for (index, last_used_ms) in candidates {
            if evicted >= self.config.max_evictions_per_sweep {
                break;
            }
            if excess == 0 && now_ms - last_used_ms <= threshold_ms {
                break;
            }
            state.evict(index);
            excess = excess.saturating_sub(1);
            evicted += 1;
        }

        if evicted > 0 {
            state.counters.hibernated += evicted as u64;
            log::debug!("Hibernated {evicted} pooled objects ({} remain)", state.pooled);
        }
        evicted
    }

    /// Runs [`hibernate_unused`](Self::hibernate_unused) with the configured threshold.
    pub fn sweep(&self, now_ms: f64) -> usize {
        self.hibernate_unused(now_ms, self.config.hibernation_threshold_ms)
    }

    /// Drops every free entry and clears statistics.
    ///
    /// Objects still leased are discarded when they come back.
    pub fn reset(&self) {
        let mut state = self.lock();
        let free = std::mem::take(&mut state.free);
        for index in free {
            if let Some(object) = state
                .entries
                .get_mut(index)
                .and_then(|entry| entry.as_mut())
                .and_then(|entry| entry.object.take())
            {
                state.discard(object);
            }
        }
        state.entries.clear();
        state.vacant.clear();
        state.pooled = 0;
        state.counters = Counters::default();
        state.epoch += 1;
        log::debug!("Pool reset (epoch {})", state.epoch);
    }

    /// Current statistics.
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        let Counters {
            created,
            reused,
            transient,
            hibernated,
        } = state.counters;
        let served = created + reused;
        PoolStats {
            created,
            reused,
            transient,
            hibernated,
            active: state.pooled - state.free.len(),
            idle: state.free.len(),
            capacity: state.capacity,
            reuse_ratio: if served == 0 {
                0.0
            } else {
                reused as f64 / served as f64
            },
            memory_saved_bytes: reused * self.config.object_size_bytes,
        }
    }

    /// Estimated bytes held by pooled entries.
    pub fn estimated_bytes(&self) -> u64 {
        self.lock().pooled as u64 * self.config.object_size_bytes
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
