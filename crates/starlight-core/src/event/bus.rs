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

/// A generic, queued event channel.
///
/// The bus is generic over the event type `T` so `starlight-core` stays
/// decoupled from the concrete event enums defined in higher-level crates.
/// Events are delivered in publication order and each event is received at
/// most once.
#[derive(Debug)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a new bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized (unbounded).");
        Self { sender, receiver }
    }

    /// Creates a new bus that holds at most `capacity` undelivered events.
    ///
    /// When full, [`publish`](Self::publish) drops the new event instead of
    /// blocking the publisher.
    pub fn bounded(capacity: usize) -> Self {
        let (sender, receiver) = flume::bounded(capacity);
        log::debug!("EventBus initialized (capacity {capacity}).");
        Self { sender, receiver }
    }

    /// Publishes an event without ever blocking.
    ///
    /// Returns `false` if the event was dropped because the bus is full.
    pub fn publish(&self, event: T) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(flume::TrySendError::Full(_)) => {
                log::trace!("EventBus full, dropping event.");
                false
            }
            Err(flume::TrySendError::Disconnected(_)) => {
                log::error!("Failed to send event: receiver disconnected.");
                false
            }
        }
    }

    /// Returns a clone of the sender end of the channel.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns a clone of the receiver end of the channel.
    pub fn receiver(&self) -> flume::Receiver<T> {
        self.receiver.clone()
    }

    /// Removes and returns every event currently queued, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Clones publish into and drain from the same queue.
impl<T: Send + 'static> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
        }
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
