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

//! Provides foundational primitives for event-driven communication.
//!
//! Two shapes of channel live here:
//!
//! - [`SubscriberSet`], a typed, synchronous fan-out used for the quality, FPS
//!   and pressure channels. Delivery happens on the publishing thread, in
//!   registration order, with each subscriber isolated from the others.
//! - [`EventBus`], a queued MPSC channel for consumers that prefer to drain
//!   events on their own schedule (diagnostic overlays, loggers).

mod bus;
mod subscribers;

pub use self::bus::EventBus;
pub use self::subscribers::{SubscriberSet, Subscription};
