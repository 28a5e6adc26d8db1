//! Cancellable scheduled tasks for room actors.
//!
//! A room has a handful of timers at most (a guess timeout, a countdown
//! tick, a pause before the next round) and every one of them must be
//! cancellable the moment the room changes phase. [`TimerQueue`] keeps them
//! as plain data owned by the actor; nothing runs in the background.
//!
//! # Integration
//!
//! The queue is designed to sit inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* handle commands */ }
//!         payload = timers.wait_next() => { /* handle the fired timer */ }
//!     }
//! }
//! ```
//!
//! When the queue is empty, [`TimerQueue::wait_next`] pends forever, so the
//! `select!` simply waits for the next command.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Timer ids
// ---------------------------------------------------------------------------

/// Handle returned by [`TimerQueue::schedule`], used to cancel one timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Entry<T> {
    id: TimerId,
    deadline: Instant,
    payload: T,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters kept by a [`TimerQueue`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerMetrics {
    /// Timers ever scheduled.
    pub scheduled: u64,
    /// Timers that reached their deadline and were handed to the caller.
    pub fired: u64,
    /// Timers removed before firing.
    pub cancelled: u64,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// A small set of pending timers, each carrying a payload of type `T`.
///
/// Timers fire in deadline order; ties fire in scheduling order.
pub struct TimerQueue<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
    metrics: TimerMetrics,
}

impl<T> TimerQueue<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
            metrics: TimerMetrics::default(),
        }
    }

    /// Schedules `payload` to fire after `delay`.
    pub fn schedule(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline: Instant::now() + delay,
            payload,
        });
        self.metrics.scheduled += 1;
        trace!(timer = id.0, delay_ms = delay.as_millis() as u64, "timer scheduled");
        id
    }

    /// Cancels one timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = before != self.entries.len();
        if removed {
            self.metrics.cancelled += 1;
        }
        removed
    }

    /// Cancels every timer whose payload matches `predicate`.
    ///
    /// Returns how many were removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !predicate(&e.payload));
        let removed = before - self.entries.len();
        self.metrics.cancelled += removed as u64;
        removed
    }

    /// Cancels everything. Returns how many were removed.
    pub fn cancel_all(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.metrics.cancelled += removed as u64;
        if removed > 0 {
            debug!(removed, "all timers cancelled");
        }
        removed
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deadline of the timer that will fire next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.earliest().map(|idx| self.entries[idx].deadline)
    }

    /// Iterates pending payloads in no particular order.
    pub fn pending(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| &e.payload)
    }

    /// Snapshot of the queue's counters.
    pub fn metrics(&self) -> &TimerMetrics {
        &self.metrics
    }

    /// Waits for the earliest timer and returns its payload.
    ///
    /// Pends forever while the queue is empty. Cancel-safe: nothing is
    /// removed until the deadline has passed, so dropping this future (e.g.
    /// because another `select!` branch won) loses no timer.
    pub async fn wait_next(&mut self) -> T {
        let Some(deadline) = self.next_deadline() else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(deadline).await;

        // The earliest entry cannot have changed: we hold `&mut self`.
        let idx = self.earliest().unwrap_or(0);
        let entry = self.entries.remove(idx);
        self.metrics.fired += 1;
        trace!(timer = entry.id.0, "timer fired");
        entry.payload
    }

    fn earliest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| (e.deadline, e.id))
            .map(|(idx, _)| idx)
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
