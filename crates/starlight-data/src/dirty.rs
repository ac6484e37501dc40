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

//! Dirty-region bookkeeping for partial canvas clears.

use serde::{Deserialize, Serialize};

/// Above this many disjoint regions the tracker collapses to their bounds.
const DEFAULT_MAX_REGIONS: usize = 32;

/// How a canvas is cleared before the next frame is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearStrategy {
    /// Clear every pixel.
    Full,
    /// Clear only what was painted since the last clear.
    DirtyRegions,
}

impl ClearStrategy {
    /// Quality below which the full clear is used.
    pub const DIRTY_REGION_MIN_QUALITY: f32 = 0.6;

    /// Chooses a strategy for `quality`. Region tracking costs bookkeeping on
    /// every draw, so it is only used at the higher quality levels.
    pub fn for_quality(quality: f32) -> Self {
        if quality >= Self::DIRTY_REGION_MIN_QUALITY {
            ClearStrategy::DirtyRegions
        } else {
            ClearStrategy::Full
        }
    }
}

/// An axis-aligned rectangle of painted pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DirtyRegion {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Repaint priority; merged regions keep the highest.
    pub priority: u8,
}

impl DirtyRegion {
    /// Creates a region with priority 0.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(1),
            height: height.max(1),
            priority: 0,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// The smallest region covering both.
    pub fn union(self, other: DirtyRegion) -> DirtyRegion {
        let min_x = self.x.min(other.x);
        let min_y = self.y.min(other.y);
        let max_x = (self.x + self.width).max(other.x + other.width);
        let max_y = (self.y + self.height).max(other.y + other.height);
        DirtyRegion {
            x: min_x,
            y: min_y,
            width: (max_x - min_x).max(1),
            height: (max_y - min_y).max(1),
            priority: self.priority.max(other.priority),
        }
    }

    /// Returns `true` if the regions overlap or share an edge.
    pub fn touches(&self, other: &DirtyRegion) -> bool {
        self.x <= other.x + other.width
            && other.x <= self.x + self.width
            && self.y <= other.y + other.height
            && other.y <= self.y + self.height
    }

    /// Returns `true` if `(x, y)` lies inside the region.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Clips the region to a `width` x `height` surface.
    pub fn clamp(self, width: u32, height: u32) -> Option<DirtyRegion> {
        let max_w = width as i32;
        let max_h = height as i32;
        let x0 = self.x.clamp(0, max_w);
        let y0 = self.y.clamp(0, max_h);
        let x1 = (self.x + self.width).clamp(0, max_w);
        let y1 = (self.y + self.height).clamp(0, max_h);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(DirtyRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
            priority: self.priority,
        })
    }

    /// Area in pixels.
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }
}

/// Accumulates the regions painted since the last clear.
///
/// Touching regions are merged, so the tracked set is always disjoint and
/// covers every marked pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRegionTracker {
    regions: Vec<DirtyRegion>,
    max_regions: usize,
}

impl Default for DirtyRegionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyRegionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::with_max_regions(DEFAULT_MAX_REGIONS)
    }

    /// Creates a tracker that collapses to a single bounding region once it
    /// holds more than `max_regions`.
    pub fn with_max_regions(max_regions: usize) -> Self {
        Self {
            regions: Vec::new(),
            max_regions: max_regions.max(1),
        }
    }

    /// Records a painted region.
    pub fn mark(&mut self, region: DirtyRegion) {
        let mut merged = region;
        loop {
            let before = self.regions.len();
            self.regions.retain(|existing| {
                if existing.touches(&merged) {
                    merged = merged.union(*existing);
                    false
                } else {
                    true
                }
            });
            if self.regions.len() == before {
                break;
            }
        }
        self.regions.push(merged);

        if self.regions.len() > self.max_regions {
            if let Some(bounds) = self.bounds() {
                self.regions.clear();
                self.regions.push(bounds);
            }
        }
    }

    /// The union of all tracked regions.
    pub fn bounds(&self) -> Option<DirtyRegion> {
        self.regions.iter().copied().reduce(DirtyRegion::union)
    }

    /// The tracked regions, highest priority first.
    pub fn regions(&self) -> Vec<DirtyRegion> {
        let mut regions = self.regions.clone();
        regions.sort_by(|a, b| b.priority.cmp(&a.priority));
        regions
    }

    /// Drains the tracked regions, highest priority first.
    pub fn take(&mut self) -> Vec<DirtyRegion> {
        let regions = self.regions();
        self.regions.clear();
        regions
    }

    /// Discards every tracked region.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Number of disjoint regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if nothing was painted since the last clear.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns `true` if `(x, y)` lies in a tracked region.
    pub fn covers(&self, x: i32, y: i32) -> bool {
        self.regions.iter().any(|r| r.contains(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_regions_merge_with_max_priority() {
        let mut tracker = DirtyRegionTracker::new();
        tracker.mark(DirtyRegion::new(0, 0, 10, 10).with_priority(1));
        tracker.mark(DirtyRegion::new(5, 5, 10, 10).with_priority(3));
        assert_eq!(tracker.len(), 1);
        assert_eq!(
            tracker.regions()[0],
            DirtyRegion::new(0, 0, 15, 15).with_priority(3)
        );
    }

    #[test]
    fn bridging_region_merges_chain() {
        let mut tracker = DirtyRegionTracker::new();
        tracker.mark(DirtyRegion::new(0, 0, 2, 2));
        tracker.mark(DirtyRegion::new(10, 0, 2, 2));
        assert_eq!(tracker.len(), 2);
        tracker.mark(DirtyRegion::new(1, 0, 10, 1));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.bounds(), Some(DirtyRegion::new(0, 0, 12, 2)));
    }

    #[test]
    fn tracker_covers_every_marked_pixel() {
        let mut tracker = DirtyRegionTracker::with_max_regions(4);
        let points = [(3, 4), (40, 7), (12, 30), (70, 70), (5, 90), (33, 33)];
        for (x, y) in points {
            tracker.mark(DirtyRegion::new(x, y, 1, 1));
        }
        assert!(tracker.len() <= 4);
        for (x, y) in points {
            assert!(tracker.covers(x, y), "({x}, {y}) lost");
        }
    }

    #[test]
    fn take_drains_by_priority() {
        let mut tracker = DirtyRegionTracker::new();
        tracker.mark(DirtyRegion::new(0, 0, 1, 1));
        tracker.mark(DirtyRegion::new(50, 50, 1, 1).with_priority(9));
        let taken = tracker.take();
        assert_eq!(taken[0].priority, 9);
        assert!(tracker.is_empty());
    }

    #[test]
    fn clamp_rejects_offscreen_regions() {
        assert_eq!(DirtyRegion::new(-20, -20, 5, 5).clamp(10, 10), None);
        assert_eq!(
            DirtyRegion::new(-2, 8, 5, 5).clamp(10, 10),
            Some(DirtyRegion::new(0, 8, 3, 2))
        );
    }

    #[test]
    fn strategy_follows_quality() {
        assert_eq!(ClearStrategy::for_quality(1.0), ClearStrategy::DirtyRegions);
        assert_eq!(ClearStrategy::for_quality(0.4), ClearStrategy::Full);
    }
}
