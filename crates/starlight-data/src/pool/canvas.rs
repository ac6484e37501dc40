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

//! Pooled offscreen canvases.
//!
//! A canvas is attached to the host document when created and detached when
//! it leaves the pool for good (hibernation, transient release, pool reset).

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use starlight_core::clock::Clock;

use super::{Lease, ObjectPool, PoolConfig, PoolError, PoolStats};
use crate::dirty::{ClearStrategy, DirtyRegion, DirtyRegionTracker};

/// The host document canvases attach to.
///
/// Tracks which surfaces are currently attached so leaks are observable.
#[derive(Debug, Default)]
pub struct CanvasDocument {
    attached: Mutex<BTreeSet<u64>>,
}

impl CanvasDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached surfaces.
    pub fn attached_count(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if surface `id` is attached.
    pub fn is_attached(&self, id: u64) -> bool {
        self.lock().contains(&id)
    }

    fn attach(&self, id: u64) {
        self.lock().insert(id);
    }

    fn detach(&self, id: u64) {
        if !self.lock().remove(&id) {
            log::warn!("Canvas #{id} detached twice");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<u64>> {
        self.attached.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// An RGBA8 offscreen surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    id: u64,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    dirty: DirtyRegionTracker,
}

impl Canvas {
    fn new(id: u64, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            pixels: vec![0; byte_len(width, height)],
            dirty: DirtyRegionTracker::new(),
        }
    }

    /// Surface identifier in the host document.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw RGBA8 pixels, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Writes one pixel and marks it dirty. Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[offset..offset + 4].copy_from_slice(&rgba);
        self.dirty.mark(DirtyRegion::new(x as i32, y as i32, 1, 1));
    }

    /// Regions painted since the last clear.
    pub fn dirty_regions(&self) -> &DirtyRegionTracker {
        &self.dirty
    }

    /// Clears the surface according to `strategy`.
    ///
    /// Returns the number of bytes zeroed.
    pub fn clear(&mut self, strategy: ClearStrategy) -> usize {
        let cleared = match strategy {
            ClearStrategy::Full => {
                self.pixels.fill(0);
                self.pixels.len()
            }
            ClearStrategy::DirtyRegions => {
                let mut cleared = 0;
                for region in self.dirty.take() {
                    let Some(region) = region.clamp(self.width, self.height) else {
                        continue;
                    };
                    for row in region.y..region.y + region.height {
                        let start = (row as usize * self.width as usize + region.x as usize) * 4;
                        let end = start + region.width as usize * 4;
                        self.pixels[start..end].fill(0);
                        cleared += end - start;
                    }
                }
                cleared
            }
        };
        self.dirty.clear();
        cleared
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(4)
}

/// Object pool of equally sized [`Canvas`]es bound to one document.
#[derive(Debug, Clone)]
pub struct CanvasPool {
    pool: ObjectPool<Canvas>,
    document: Arc<CanvasDocument>,
}

impl CanvasPool {
    /// Creates a pool of `width` x `height` canvases attached to `document`.
    pub fn new(
        mut config: PoolConfig,
        clock: Arc<dyn Clock>,
        document: Arc<CanvasDocument>,
        width: u32,
        height: u32,
    ) -> Result<Self, PoolError> {
        if config.object_size_bytes == 0 {
            config.object_size_bytes = byte_len(width, height) as u64;
        }
        let mut next_id = 0u64;
        let attach_to = Arc::clone(&document);
        let detach_from = Arc::clone(&document);
        let pool = ObjectPool::new(config, clock, move || {
            if width == 0 || height == 0 {
                anyhow::bail!("cannot allocate a {width}x{height} canvas");
            }
            next_id += 1;
            let canvas = Canvas::new(next_id, width, height);
            attach_to.attach(canvas.id);
            Ok(canvas)
        })?
        .with_reset(|canvas: &mut Canvas| {
            canvas.clear(ClearStrategy::Full);
        })
        .with_evict_hook(move |canvas: Canvas| detach_from.detach(canvas.id));
        Ok(Self { pool, document })
    }

    /// Leases a cleared canvas.
    pub fn acquire(&self) -> Result<Lease<Canvas>, PoolError> {
        self.pool.acquire()
    }

    /// The document the canvases attach to.
    pub fn document(&self) -> &Arc<CanvasDocument> {
        &self.document
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ObjectPool<Canvas> {
        &self.pool
    }

    /// Shortcut for the pool's statistics.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
