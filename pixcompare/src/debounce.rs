//! Deadline-based debouncing.
//!
//! A [`Debouncer`] holds at most one pending piece of work. Scheduling again
//! before the deadline replaces the pending work and restarts the delay, so
//! only the last request in a burst ever runs. Nothing runs on its own: the
//! owner polls from its event loop, using [`Debouncer::deadline`] to arm a
//! wake-up.

use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<T> {
    work: T,
    due: Instant,
}

/// Coalesces repeated requests into one delayed invocation.
///
/// `T` is the scheduled work: a closure, or a job description the owner runs
/// itself once [`poll`](Self::poll) hands it out.
#[derive(Debug)]
pub struct Debouncer<T> {
    pending: Option<Pending<T>>,
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debouncer<T> {
    /// Creates a debouncer with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Schedules `work` to become due `delay` from now, dropping any work that
    /// has not been handed out yet.
    pub fn schedule(&mut self, work: T, delay: Duration) {
        self.schedule_at(work, delay, Instant::now());
    }

    /// [`schedule`](Self::schedule) with an explicit current time.
    pub fn schedule_at(&mut self, work: T, delay: Duration, now: Instant) {
        if self.pending.is_some() {
            log::debug!("debounce: superseding pending work");
        }
        self.pending = Some(Pending {
            work,
            due: now + delay,
        });
    }

    /// Hands out the pending work if its deadline has passed.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) with an explicit current time.
    pub fn poll_at(&mut self, now: Instant) -> Option<T> {
        if self.pending.as_ref().is_some_and(|p| now >= p.due) {
            self.pending.take().map(|p| p.work)
        } else {
            None
        }
    }

    /// Drops the pending work without running it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.work)
    }

    /// Whether work is waiting for its deadline.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending work becomes due.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }
}

impl<F: FnOnce()> Debouncer<F> {
    /// Runs the pending closure if it is due. Returns whether it ran.
    pub fn run_due(&mut self) -> bool {
        self.run_due_at(Instant::now())
    }

    /// [`run_due`](Self::run_due) with an explicit current time.
    pub fn run_due_at(&mut self, now: Instant) -> bool {
        match self.poll_at(now) {
            Some(work) => {
                work();
                true
            }
            None => false,
        }
    }
}
