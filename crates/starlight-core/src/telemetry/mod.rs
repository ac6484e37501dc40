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

//! Provides the foundational traits and data structures for performance telemetry.
//!
//! This module is the "common language" of measurement in Starlight: memory
//! sources and their samples, pressure levels and their transition events,
//! and the telemetry events published for diagnostic consumers. The
//! `starlight-telemetry` crate provides the monitors, and `starlight-control`
//! consumes what they produce.

pub mod event;
pub mod monitoring;
pub mod pressure;

pub use self::event::TelemetryEvent;
pub use self::monitoring::{MemoryReadError, MemorySample, MemorySource};
pub use self::pressure::{PressureEvent, PressureLevel};
