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

//! # Starlight Telemetry
//!
//! Memory sampling and pressure classification. The [`MemoryMonitor`] turns
//! raw samples from a [`MemorySource`](starlight_core::telemetry::MemorySource)
//! into edge-triggered pressure transitions and narrows quality through a
//! [`QualityGovernor`](starlight_core::QualityGovernor) when memory runs short.
//! The [`MemoryMonitorService`] polls it on its own timer, independently of
//! the render loop.

#![warn(missing_docs)]

pub mod monitoring;
pub mod service;

pub use monitoring::memory_monitor::{MemoryMonitor, MemoryMonitorConfig, MemoryStatus};
pub use monitoring::sources::{EstimatedMemorySource, SysinfoMemorySource};
pub use service::MemoryMonitorService;
