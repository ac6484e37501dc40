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

//! # Starlight Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! shared by the adaptive performance loop: the sample clock, typed
//! subscription channels, interval timers, and the vocabulary for quality,
//! memory pressure and host platform signals.

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod event;
pub mod platform;
pub mod quality;
pub mod telemetry;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ConfigError;
pub use event::{EventBus, SubscriberSet, Subscription};
pub use quality::{CeilingSource, QualityGovernor};
pub use timer::IntervalTimer;
