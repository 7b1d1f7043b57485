//! Debounce scheduler: one cancellable delayed task per kind.
//!
//! The scheduler owns no timers. Callers pass the current `Instant` to every
//! call and poll `take_due`; tests drive it with synthetic instants.
//! Scheduling a kind that already has a pending task replaces it, which
//! restarts the quiet period. Kinds are independent.

use std::time::{Duration, Instant};

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    History,
    Autosave,
}

impl TaskKind {
    pub const ALL: [TaskKind; 2] = [TaskKind::History, TaskKind::Autosave];

    fn slot(self) -> usize {
        match self {
            TaskKind::History => 0,
            TaskKind::Autosave => 1,
        }
    }
}

#[derive(Debug, Clone)]
struct Pending<P> {
    deadline: Instant,
    payload: P,
}

#[derive(Debug, Clone)]
pub struct DebounceScheduler<P> {
    slots: [Option<Pending<P>>; 2],
}

impl<P> Default for DebounceScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> DebounceScheduler<P> {
    pub fn new() -> Self {
        Self {
            slots: [None, None],
        }
    }

    /// (Re)schedule `kind` to fire `delay` after `now`, replacing any pending
    /// task of that kind and its payload.
    pub fn schedule(&mut self, kind: TaskKind, delay: Duration, payload: P, now: Instant) {
        trace!(?kind, delay_ms = delay.as_millis() as u64, "debounce scheduled");
        self.slots[kind.slot()] = Some(Pending {
            deadline: now + delay,
            payload,
        });
    }

    /// Drop the pending task of `kind`, returning its payload.
    pub fn cancel_pending(&mut self, kind: TaskKind) -> Option<P> {
        self.slots[kind.slot()].take().map(|p| p.payload)
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.slots[kind.slot()].is_some()
    }

    /// Remove and return every task whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TaskKind, P)> {
        let mut due: Vec<(Instant, TaskKind, P)> = Vec::new();
        for kind in TaskKind::ALL {
            let slot = &mut self.slots[kind.slot()];
            if slot.as_ref().is_some_and(|p| p.deadline <= now) {
                if let Some(p) = slot.take() {
                    due.push((p.deadline, kind, p.payload));
                }
            }
        }
        due.sort_by_key(|(deadline, kind, _)| (*deadline, kind.slot()));
        due.into_iter().map(|(_, kind, p)| (kind, p)).collect()
    }

    /// Earliest pending deadline, for sleeping until the next poll.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().map(|p| p.deadline).min()
    }
}
