#![forbid(unsafe_code)]

//! Single-slot frame scheduler.
//!
//! Key presses, visibility callbacks and clicks can each ask for a re-render
//! several times inside one frame. Rendering after every request would force
//! a synchronous layout per request, so requests are parked here and only the
//! most recent one runs at the next rendering opportunity.
//!
//! # Semantics
//!
//! - **Latest-wins**: scheduling while work is pending cancels the pending
//!   work and replaces it. State the caller already mutated stays mutated;
//!   only the deferred callback is dropped.
//! - **Single slot**: there is never more than one outstanding
//!   [`FrameToken`].
//! - **Cancellable**: [`FrameScheduler::cancel_all`] drops the pending work
//!   without running it. Owners call it on teardown so no callback fires
//!   against a detached controller.
//!
//! # Usage
//!
//! ```
//! use msgview_runtime::FrameScheduler;
//!
//! let mut frames: FrameScheduler<Vec<u32>> = FrameScheduler::new();
//! let mut log = Vec::new();
//!
//! frames.schedule(|log: &mut Vec<u32>| log.push(1));
//! frames.schedule(|log: &mut Vec<u32>| log.push(2));
//!
//! // Only the latest request runs.
//! assert!(frames.flush(&mut log));
//! assert_eq!(log, vec![2]);
//! assert!(!frames.flush(&mut log));
//! ```
//!
//! When the scheduler lives inside the context it mutates, take the work out
//! first with [`FrameScheduler::take_due`] and then run it against the owner.

use std::fmt;

use crate::debug_trace;

/// Handle identifying one scheduled frame request.
///
/// Tokens are unique per scheduler and strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameToken(u64);

impl FrameToken {
    /// Raw sequence number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Counters describing scheduler activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Total `schedule` calls.
    pub scheduled: u64,
    /// Requests replaced by a later request before they ran.
    pub coalesced: u64,
    /// Requests handed out for execution.
    pub dispatched: u64,
    /// Requests dropped by `cancel_all`.
    pub cancelled: u64,
}

/// Deferred work removed from the scheduler, ready to run.
pub struct ScheduledWork<C> {
    token: FrameToken,
    work: Box<dyn FnOnce(&mut C)>,
}

impl<C> ScheduledWork<C> {
    /// The token this work was scheduled under.
    #[must_use]
    pub fn token(&self) -> FrameToken {
        self.token
    }

    /// Run the work against its context.
    pub fn run(self, ctx: &mut C) {
        (self.work)(ctx);
    }
}

impl<C> fmt::Debug for ScheduledWork<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledWork")
            .field("token", &self.token)
            .field("work", &"<FnOnce>")
            .finish()
    }
}

/// Coalesces render requests into at most one pending callback.
pub struct FrameScheduler<C> {
    pending: Option<ScheduledWork<C>>,
    next_token: u64,
    stats: SchedulerStats,
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for FrameScheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending_token())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<C> FrameScheduler<C> {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: None,
            next_token: 0,
            stats: SchedulerStats::default(),
        }
    }

    /// Register `work` to run at the next rendering opportunity.
    ///
    /// Any pending work is cancelled and replaced.
    pub fn schedule<F>(&mut self, work: F) -> FrameToken
    where
        F: FnOnce(&mut C) + 'static,
    {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.stats.scheduled += 1;

        if let Some(previous) = self.pending.take() {
            self.stats.coalesced += 1;
            debug_trace!(
                "frame coalesced: dropped={} replacement={}",
                previous.token.get(),
                token.get()
            );
        }

        self.pending = Some(ScheduledWork {
            token,
            work: Box::new(work),
        });
        token
    }

    /// Drop pending work without running it.
    ///
    /// Returns the token that was cancelled, if any.
    pub fn cancel_all(&mut self) -> Option<FrameToken> {
        let cancelled = self.pending.take().map(|work| work.token);
        if let Some(token) = cancelled {
            self.stats.cancelled += 1;
            debug_trace!("frame cancelled: token={}", token.get());
        }
        cancelled
    }

    /// Remove the pending work so the caller can run it.
    ///
    /// Call this at a rendering opportunity. Returns `None` when idle.
    pub fn take_due(&mut self) -> Option<ScheduledWork<C>> {
        let due = self.pending.take();
        if due.is_some() {
            self.stats.dispatched += 1;
        }
        due
    }

    /// Run pending work against a context that does not own this scheduler.
    ///
    /// Returns `true` if work ran.
    pub fn flush(&mut self, ctx: &mut C) -> bool {
        match self.take_due() {
            Some(work) => {
                work.run(ctx);
                true
            }
            None => false,
        }
    }

    /// Whether a request is waiting for the next frame.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the waiting request, if any.
    #[must_use]
    pub fn pending_token(&self) -> Option<FrameToken> {
        self.pending.as_ref().map(|work| work.token)
    }

    /// Activity counters.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_scheduler_has_nothing_due() {
        let mut frames: FrameScheduler<u32> = FrameScheduler::new();
        assert!(!frames.is_pending());
        assert!(frames.take_due().is_none());
        assert_eq!(frames.stats(), SchedulerStats::default());
    }

    #[test]
    fn latest_request_wins() {
        let mut frames: FrameScheduler<Vec<&'static str>> = FrameScheduler::new();
        let mut log = Vec::new();
        frames.schedule(|log: &mut Vec<&'static str>| log.push("first"));
        frames.schedule(|log: &mut Vec<&'static str>| log.push("second"));
        frames.schedule(|log: &mut Vec<&'static str>| log.push("third"));

        assert!(frames.flush(&mut log));
        assert_eq!(log, vec!["third"]);

        let stats = frames.stats();
        assert_eq!(stats.scheduled, 3);
        assert_eq!(stats.coalesced, 2);
        assert_eq!(stats.dispatched, 1);
    }

    #[test]
    fn work_runs_exactly_once() {
        let mut frames: FrameScheduler<u32> = FrameScheduler::new();
        let mut count = 0;
        frames.schedule(|c: &mut u32| *c += 1);
        assert!(frames.flush(&mut count));
        assert!(!frames.flush(&mut count));
        assert_eq!(count, 1);
    }

    #[test]
    fn tokens_increase() {
        let mut frames: FrameScheduler<()> = FrameScheduler::new();
        let a = frames.schedule(|_| {});
        let b = frames.schedule(|_| {});
        assert!(b > a);
        assert_eq!(frames.pending_token(), Some(b));
    }

    #[test]
    fn cancel_all_drops_without_running() {
        let mut frames: FrameScheduler<u32> = FrameScheduler::new();
        let mut count = 0;
        let token = frames.schedule(|c: &mut u32| *c += 1);
        assert_eq!(frames.cancel_all(), Some(token));
        assert!(!frames.flush(&mut count));
        assert_eq!(count, 0);
        assert_eq!(frames.stats().cancelled, 1);

        // Cancelling an idle scheduler is a no-op.
        assert_eq!(frames.cancel_all(), None);
        assert_eq!(frames.stats().cancelled, 1);
    }

    #[test]
    fn take_due_hands_out_token() {
        let mut frames: FrameScheduler<u32> = FrameScheduler::new();
        let token = frames.schedule(|c: &mut u32| *c = 7);
        let work = frames.take_due().expect("pending work");
        assert_eq!(work.token(), token);
        assert!(!frames.is_pending());
        let mut value = 0;
        work.run(&mut value);
        assert_eq!(value, 7);
    }

    #[test]
    fn scheduling_from_inside_work_is_deferred() {
        struct Owner {
            frames: FrameScheduler<Owner>,
            renders: u32,
        }

        let mut owner = Owner {
            frames: FrameScheduler::new(),
            renders: 0,
        };
        owner.frames.schedule(|o: &mut Owner| {
            o.renders += 1;
            o.frames.schedule(|o: &mut Owner| o.renders += 10);
        });

        let work = owner.frames.take_due().expect("first frame");
        work.run(&mut owner);
        assert_eq!(owner.renders, 1);
        assert!(owner.frames.is_pending());

        let work = owner.frames.take_due().expect("second frame");
        work.run(&mut owner);
        assert_eq!(owner.renders, 11);
    }
}
