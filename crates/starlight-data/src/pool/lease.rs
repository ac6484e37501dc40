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

use std::fmt;
use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError, Weak};

use super::PoolState;

/// Exclusive access to a pooled object.
///
/// Dropping the lease (or passing it to
/// [`ObjectPool::release`](super::ObjectPool::release)) returns the object to
/// its pool. Transient leases, leases from before a pool reset, and leases
/// that outlive their pool drop the object instead.
pub struct Lease<T> {
    object: ManuallyDrop<T>,
    slot: Option<usize>,
    epoch: u64,
    pool: Weak<Mutex<PoolState<T>>>,
}

impl<T> Lease<T> {
    pub(super) fn new(
        object: T,
        slot: Option<usize>,
        epoch: u64,
        pool: Weak<Mutex<PoolState<T>>>,
    ) -> Self {
        Self {
            object: ManuallyDrop::new(object),
            slot,
            epoch,
            pool,
        }
    }

    /// Returns `true` if the object was created beyond the pool's capacity
    /// and will not be pooled.
    pub fn is_transient(&self) -> bool {
        self.slot.is_none()
    }
}

impl<T> Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.object
    }
}

impl<T> DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.object
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        // SAFETY: `object` is taken exactly once, here, and the lease is not
        // used afterwards.
        let object = unsafe { ManuallyDrop::take(&mut self.object) };
        if let Some(pool) = self.pool.upgrade() {
            let mut state = pool.lock().unwrap_or_else(PoisonError::into_inner);
            state.give_back(self.slot, self.epoch, object);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("object", &*self.object)
            .field("slot", &self.slot)
            .field("epoch", &self.epoch)
            .finish()
    }
}
