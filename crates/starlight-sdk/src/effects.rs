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

//! Maps the quality scalar onto concrete effect parameters.

use serde::Serialize;
use starlight_data::ClearStrategy;

/// Visual parameters for one quality level.
///
/// Every field is monotone in quality: more quality never means less effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectParameters {
    /// Quality these parameters were derived from.
    pub quality: f32,
    /// Gaussian blur radius of the glow pass.
    pub blur_radius_px: f32,
    /// Opacity of the glow layer.
    pub glow_opacity: f32,
    /// Depth of text and panel shadows.
    pub shadow_depth_px: f32,
    /// Number of stars to keep alive.
    pub star_count: u32,
    /// How the canvas is cleared between frames.
    pub clear_strategy: ClearStrategy,
    /// Strength of the CRT scanline overlay.
    pub scanline_intensity: f32,
}

const MIN_STARS: f32 = 150.0;
const MAX_STARS: f32 = 800.0;

impl EffectParameters {
    /// Derives the parameters for `quality` (clamped to `[0, 1]`).
    pub fn from_quality(quality: f32) -> Self {
        let q = quality.clamp(0.0, 1.0);
        Self {
            quality: q,
            blur_radius_px: 8.0 * q,
            glow_opacity: 0.2 + 0.6 * q,
            shadow_depth_px: (12.0 * q).round(),
            star_count: (MIN_STARS + (MAX_STARS - MIN_STARS) * q).round() as u32,
            clear_strategy: ClearStrategy::for_quality(q),
            scanline_intensity: 0.1 + 0.3 * q,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        let low = EffectParameters::from_quality(0.0);
        assert_eq!(low.blur_radius_px, 0.0);
        assert_eq!(low.star_count, 150);
        assert_eq!(low.clear_strategy, ClearStrategy::Full);

        let high = EffectParameters::from_quality(1.0);
        assert_eq!(high.star_count, 800);
        assert_eq!(high.clear_strategy, ClearStrategy::DirtyRegions);
        assert!((high.glow_opacity - 0.8).abs() < 1e-6);
    }

    #[test]
    fn parameters_are_monotone() {
        let mut previous = EffectParameters::from_quality(0.0);
        for step in 1..=100 {
            let current = EffectParameters::from_quality(step as f32 / 100.0);
            assert!(current.blur_radius_px >= previous.blur_radius_px);
            assert!(current.glow_opacity >= previous.glow_opacity);
            assert!(current.shadow_depth_px >= previous.shadow_depth_px);
            assert!(current.star_count >= previous.star_count);
            assert!(current.scanline_intensity >= previous.scanline_intensity);
            previous = current;
        }
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        assert_eq!(
            EffectParameters::from_quality(3.0),
            EffectParameters::from_quality(1.0)
        );
    }
}
