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

//! Cancellable periodic work on a dedicated thread.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};

/// Runs a task at a fixed interval until disposed.
///
/// The worker blocks on a stop channel with a timeout equal to the interval,
/// so disposal wakes it immediately instead of letting a pending tick fire.
/// [`dispose`](Self::dispose) joins the worker before returning: once it
/// returns, the task will never run again.
#[derive(Debug)]
pub struct IntervalTimer {
    name: String,
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalTimer {
    /// Starts a timer that runs `task` every `interval`.
    ///
    /// The first run happens one full interval after start. A panicking task
    /// is logged and the timer keeps running.
    pub fn start<F>(name: impl Into<String>, interval: Duration, mut task: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::debug!("Timer '{thread_name}' started ({interval:?}).");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if panic::catch_unwind(AssertUnwindSafe(&mut task)).is_err() {
                                log::error!("Timer '{thread_name}' task panicked; timer keeps running.");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("Timer '{thread_name}' stopped.");
            })?;

        Ok(Self {
            name,
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Returns the timer's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the period between runs.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` until [`dispose`](Self::dispose) has been called.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancels the timer and waits for the worker to exit.
    ///
    /// Calling this more than once is a no-op. When called from inside the
    /// timer's own task, the worker is signalled but not joined.
    pub fn dispose(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::warn!("Timer '{}' worker exited abnormally.", self.name);
            }
        }
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.dispose();
    }
}
