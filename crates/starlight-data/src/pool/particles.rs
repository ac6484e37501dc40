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

//! Pooled star particles for the starfield.

use std::sync::Arc;

use starlight_core::clock::Clock;

use super::{Lease, ObjectPool, PoolConfig, PoolError, PoolStats};

/// One star of the field, in normalized device space with depth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Star {
    /// Horizontal position, `-1..=1`.
    pub x: f32,
    /// Vertical position, `-1..=1`.
    pub y: f32,
    /// Depth, `0` (at the viewer) to `1` (far plane).
    pub z: f32,
    /// Depth units per second towards the viewer.
    pub speed: f32,
    /// Base brightness, `0..=1`.
    pub brightness: f32,
    /// Twinkle phase in radians.
    pub phase: f32,
}

impl Star {
    /// Moves the star towards the viewer. Returns `false` once it has passed.
    pub fn advance(&mut self, dt_ms: f64) -> bool {
        self.z -= self.speed * (dt_ms / 1000.0) as f32;
        self.phase = (self.phase + (dt_ms / 250.0) as f32) % std::f32::consts::TAU;
        self.z > 0.0
    }

    /// Projected screen position, or `None` behind the viewer.
    pub fn project(&self) -> Option<(f32, f32)> {
        (self.z > 0.0).then(|| (self.x / self.z, self.y / self.z))
    }

    /// Brightness including depth falloff and twinkle.
    pub fn intensity(&self) -> f32 {
        let twinkle = 0.85 + 0.15 * self.phase.sin();
        (self.brightness * (1.0 - self.z) * twinkle).clamp(0.0, 1.0)
    }
}

/// Object pool specialised for [`Star`]s.
#[derive(Debug, Clone)]
pub struct StarPool {
    pool: ObjectPool<Star>,
}

impl StarPool {
    /// Creates a star pool.
    pub fn new(mut config: PoolConfig, clock: Arc<dyn Clock>) -> Result<Self, PoolError> {
        if config.object_size_bytes == 0 {
            config.object_size_bytes = std::mem::size_of::<Star>() as u64;
        }
        let pool = ObjectPool::new(config, clock, || Ok(Star::default()))?
            .with_reset(|star: &mut Star| *star = Star::default());
        Ok(Self { pool })
    }

    /// Leases a star initialised to `star`.
    pub fn spawn(&self, star: Star) -> Result<Lease<Star>, PoolError> {
        let mut lease = self.pool.acquire()?;
        *lease = star;
        Ok(lease)
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ObjectPool<Star> {
        &self.pool
    }

    /// Shortcut for the pool's statistics.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
