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

//! Typed, synchronous publish/subscribe.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    entries: Vec<(u64, Callback<T>)>,
}

/// Removal half of a subscriber registry, erased over the payload type so a
/// [`Subscription`] does not need to be generic.
trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
}

impl<T> Detach for Mutex<Registry<T>> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = self.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.entries.len();
        registry.entries.retain(|(entry_id, _)| *entry_id != id);
        registry.entries.len() != before
    }
}

/// An ordered set of callbacks sharing one payload type.
///
/// Callbacks run synchronously on the publishing thread, in the order they
/// subscribed. No internal lock is held while a callback runs, so a callback
/// may subscribe, unsubscribe or query its emitter. A callback that panics is
/// logged and skipped; the remaining callbacks still receive the value.
pub struct SubscriberSet<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> SubscriberSet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Registers `callback` and returns the handle that removes it.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.push((id, Arc::new(callback)));
        drop(registry);

        let detach: Arc<dyn Detach> = self.registry.clone();
        Subscription {
            id,
            owner: Arc::downgrade(&detach),
        }
    }

    /// Registers `callback`, then hands it the value returned by `current`.
    ///
    /// Registration comes first, so a value published in between reaches the
    /// callback too; it may then see the same value twice.
    pub fn subscribe_with_current<F, C>(&self, callback: F, current: C) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
        C: FnOnce() -> T,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self.subscribe(move |value: &T| registered(value));
        Self::deliver_one(&*callback, &current());
        subscription
    }

    /// Delivers `value` to a snapshot of the current subscribers.
    ///
    /// Returns how many callbacks completed without panicking.
    pub fn publish(&self, value: &T) -> usize {
        let callbacks: Vec<(u64, Callback<T>)> = self
            .lock()
            .entries
            .iter()
            .map(|(id, callback)| (*id, Arc::clone(callback)))
            .collect();

        let mut delivered = 0;
        for (id, callback) in callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(value))) {
                Ok(()) => delivered += 1,
                Err(_) => log::error!("Subscriber #{id} panicked; continuing delivery."),
            }
        }
        delivered
    }

    /// Delivers `value` to a single callback, with the same isolation as
    /// [`publish`](Self::publish). Used to push the current value to a new subscriber.
    pub fn deliver_one<F>(callback: &F, value: &T)
    where
        F: Fn(&T) + ?Sized,
    {
        if panic::catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
            log::error!("New subscriber panicked on its initial value.");
        }
    }

    /// Returns the number of registered callbacks.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry<T>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: 'static> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SubscriberSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .registry
            .lock()
            .map(|r| r.entries.len())
            .unwrap_or_default();
        f.debug_struct("SubscriberSet")
            .field("subscribers", &count)
            .finish()
    }
}

/// Handle returned by [`SubscriberSet::subscribe`].
///
/// Dropping the handle does *not* unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe) explicitly. Unsubscribing twice, or after
/// the emitter is gone, is a no-op.
pub struct Subscription {
    id: u64,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    /// Removes the callback. Returns `true` if it was still registered.
    pub fn unsubscribe(&self) -> bool {
        match self.owner.upgrade() {
            Some(owner) => owner.detach(self.id),
            None => false,
        }
    }

    /// Returns `true` while the emitting set is still alive.
    pub fn is_active(&self) -> bool {
        self.owner.strong_count() > 0
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn delivers_in_registration_order() {
        let set = SubscriberSet::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..3 {
            let log = log.clone();
            set.subscribe(move |v: &u32| log.lock().unwrap().push((tag, *v)));
        }
        assert_eq!(set.publish(&7), 3);
        assert_eq!(*log.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let set = SubscriberSet::<u32>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h1 = hits.clone();
        set.subscribe(move |_| {
            h1.fetch_add(1, Ordering::SeqCst);
        });
        set.subscribe(|_| panic!("bad subscriber"));
        let h2 = hits.clone();
        set.subscribe(move |_| {
            h2.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(set.publish(&1), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // The set is still usable afterwards.
        assert_eq!(set.publish(&2), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn value_published_while_subscribing_is_not_missed() {
        let set = SubscriberSet::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _subscription = set.subscribe_with_current(
            move |v: &u32| sink.lock().unwrap().push(*v),
            || {
                // A change racing the registration.
                set.publish(&2);
                2
            },
        );
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let set = SubscriberSet::<u32>::new();
        let sub = set.subscribe(|_| {});
        assert_eq!(set.len(), 1);
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(set.is_empty());
    }

    #[test]
    fn unsubscribe_after_emitter_dropped_is_noop() {
        let set = SubscriberSet::<u32>::new();
        let sub = set.subscribe(|_| {});
        drop(set);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn callback_may_unsubscribe_itself_during_delivery() {
        let set = Arc::new(SubscriberSet::<u32>::new());
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(AtomicUsize::new(0));

        let slot_in = slot.clone();
        let hits_in = hits.clone();
        let sub = set.subscribe(move |_| {
            hits_in.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot_in.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        set.publish(&1);
        set.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
