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

//! # Starlight Data
//!
//! Resource management for the effect layer: a generic [`ObjectPool`] with
//! RAII [`Lease`]s, the concrete [`StarPool`] and [`CanvasPool`] built on it,
//! and the [`DirtyRegionTracker`] that lets a canvas repaint only what changed.

#![warn(missing_docs)]

pub mod dirty;
pub mod pool;

pub use dirty::{ClearStrategy, DirtyRegion, DirtyRegionTracker};
pub use pool::canvas::{Canvas, CanvasDocument, CanvasPool};
pub use pool::particles::{Star, StarPool};
pub use pool::{Lease, ObjectPool, PoolConfig, PoolError, PoolStats};
