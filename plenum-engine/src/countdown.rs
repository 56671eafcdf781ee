// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side countdown for the current speaker's turn.
//!
//! The store records only the allotted seconds and the instant the turn
//! started (the list's `updated_at`). Clients derive the remaining time
//! locally, correcting for the offset between their clock and the server's,
//! so every screen in the room shows the same number regardless of local
//! clock drift.

use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::time::{interval_at, Duration, Instant};

/// Offset between the server clock and the local clock, in seconds.
///
/// Established once per session from a single observed pair of timestamps
/// and applied to every subsequent local reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockSync {
    time_diff: i64,
}

impl ClockSync {
    /// Record the offset from one `(server, local)` timestamp pair.
    pub fn establish(server_now: u64, local_now: u64) -> Self {
        Self {
            time_diff: server_now as i64 - local_now as i64,
        }
    }

    /// The local clock's reading translated onto the server timeline.
    pub fn server_now(&self, local_now: u64) -> i64 {
        local_now as i64 + self.time_diff
    }

    pub fn time_diff(&self) -> i64 {
        self.time_diff
    }

    /// Seconds left of a turn that started at `updated_at` (server time)
    /// with `allotted` seconds, as seen at `local_now`. Clamped at zero.
    pub fn remaining(&self, allotted: u64, updated_at: u64, local_now: u64) -> u64 {
        remaining_seconds(allotted, updated_at, local_now, self.time_diff)
    }
}

/// Seconds left of a turn, clamped at zero once the turn is over.
pub fn remaining_seconds(allotted: u64, updated_at: u64, local_now: u64, time_diff: i64) -> u64 {
    let elapsed = local_now as i64 + time_diff - updated_at as i64;
    (allotted as i64 - elapsed).max(0) as u64
}

#[derive(Debug)]
struct Inner {
    remaining: watch::Sender<u64>,
    reset: Notify,
}

/// A ticking countdown broadcasting the remaining seconds once per second.
///
/// [`Countdown::run`] drives the ticking; observers follow the value via
/// [`Countdown::subscribe`]. Any resync realigns the tick phase so the
/// first decrement after a turn change happens a full second after it.
#[derive(Clone, Debug)]
pub struct Countdown {
    inner: Arc<Inner>,
}

impl Countdown {
    pub fn new(initial: u64) -> Self {
        let (remaining, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                remaining,
                reset: Notify::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.remaining.subscribe()
    }

    pub fn remaining(&self) -> u64 {
        *self.inner.remaining.borrow()
    }

    /// Restart the countdown from `value` seconds.
    pub fn resync(&self, value: u64) {
        self.inner.remaining.send_replace(value);
        self.inner.reset.notify_one();
    }

    /// Re-derive the remaining time from a fresh turn record and restart.
    ///
    /// Called when a subscription delivers an updated speaker list node;
    /// `updated_at` is the node's server-side timestamp.
    pub fn apply_update(&self, allotted: u64, updated_at: u64, local_now: u64, clock: &ClockSync) {
        self.resync(clock.remaining(allotted, updated_at, local_now));
    }

    /// Tick the countdown until dropped, decrementing once per second.
    ///
    /// Holding the value at zero rather than stopping keeps late observers
    /// seeing a finished turn instead of a stale positive number.
    pub async fn run(&self) {
        loop {
            let mut ticks = interval_at(Instant::now() + Duration::from_secs(1), Duration::from_secs(1));
            loop {
                tokio::select! {
                    _ = self.inner.reset.notified() => break,
                    _ = ticks.tick() => {
                        self.inner.remaining.send_modify(|value| *value = value.saturating_sub(1));
                    }
                }
            }
        }
    }
}
