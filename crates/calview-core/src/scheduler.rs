#![forbid(unsafe_code)]

//! Deferred work for the enter and exit transitions.
//!
//! The engine never sleeps. It records a [`TimerTask`] under a fresh
//! [`TimerId`], asks the host to wake it after a delay, and runs the task when
//! [`on_timer`](crate::engine::Engine::on_timer) arrives. Cancelling a timer
//! only forgets the task; the host's wake-up still arrives and is ignored.

use std::collections::BTreeMap;

use crate::store::SessionSerial;

/// Handle for one scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Work to run when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Add the active class so the enter transition runs.
    Activate(SessionSerial),
    /// Exit transition finished: detach nodes and reset the session.
    FinishClose(SessionSerial),
}

impl TimerTask {
    #[must_use]
    pub const fn session(self) -> SessionSerial {
        match self {
            Self::Activate(serial) | Self::FinishClose(serial) => serial,
        }
    }
}

/// Pending tasks keyed by timer id.
#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: BTreeMap<TimerId, TimerTask>,
    next_id: u64,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `task` and return the id the host should wake us with.
    pub fn schedule(&mut self, task: TimerTask) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.insert(id, task);
        id
    }

    /// Forget a task. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Claim the task for a fired timer. `None` for cancelled or unknown ids.
    pub fn take(&mut self, id: TimerId) -> Option<TimerTask> {
        self.pending.remove(&id)
    }

    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_claims_once() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(TimerTask::Activate(SessionSerial::new(1)));
        assert!(queue.is_pending(id));
        assert_eq!(
            queue.take(id),
            Some(TimerTask::Activate(SessionSerial::new(1)))
        );
        assert_eq!(queue.take(id), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelled_timer_is_ignored_when_it_fires() {
        let mut queue = TimerQueue::new();
        let id = queue.schedule(TimerTask::FinishClose(SessionSerial::new(3)));
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(queue.take(id), None);
    }

    #[test]
    fn tasks_carry_their_session() {
        let serial = SessionSerial::new(7);
        assert_eq!(TimerTask::Activate(serial).session(), serial);
        assert_eq!(TimerTask::FinishClose(serial).session(), serial);
    }

    #[test]
    fn ids_are_unique() {
        let mut queue = TimerQueue::new();
        let a = queue.schedule(TimerTask::Activate(SessionSerial::new(1)));
        let b = queue.schedule(TimerTask::Activate(SessionSerial::new(1)));
        assert_ne!(a, b);
        assert_eq!(queue.len(), 2);
    }
}
