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

//! Rolling storage for per-window measurements.

/// A fixed-size circular buffer of samples.
#[derive(Debug, Clone)]
pub struct RingBuffer<T, const N: usize> {
    data: [T; N],
    next: usize,
    len: usize,
}

impl<T: Default + Copy, const N: usize> RingBuffer<T, N> {
    /// Creates a new, empty ring buffer.
    pub fn new() -> Self {
        Self {
            data: [T::default(); N],
            next: 0,
            len: 0,
        }
    }

    /// Pushes a value, overwriting the oldest one once full.
    pub fn push(&mut self, value: T) {
        self.data[self.next] = value;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing has been pushed since the last clear.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<T> {
        if self.len == 0 {
            None
        } else {
            Some(self.data[(self.next + N - 1) % N])
        }
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = (self.next + N - self.len) % N;
        (0..self.len).map(move |offset| &self.data[(start + offset) % N])
    }
}

impl<T: Default + Copy, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<f32, N> {
    /// Arithmetic mean, or 0.0 when empty.
    pub fn average(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.len as f32
    }

    /// Population variance. High variance in per-window FPS means stutter.
    pub fn variance(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let avg = self.average();
        self.iter().map(|v| (v - avg) * (v - avg)).sum::<f32>() / self.len as f32
    }

    /// Difference between the mean of the newer half and the older half.
    /// Positive when values are rising.
    pub fn trend(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let half = self.len / 2;
        let older: f32 = self.iter().take(half).sum::<f32>() / half as f32;
        let newer: f32 = self.iter().skip(self.len - half).sum::<f32>() / half as f32;
        newer - older
    }

    /// Smallest sample, if any.
    pub fn min(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::min)
    }

    /// Largest sample, if any.
    pub fn max(&self) -> Option<f32> {
        self.iter().copied().reduce(f32::max)
    }
}
