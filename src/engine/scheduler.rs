//! Deferred engine work on a virtual clock.
//!
//! "Next turn" work is a zero-delay task. The host pumps the queue with
//! [`PrivacyEngine::run_pending`] after each event it delivers and with
//! [`PrivacyEngine::advance`] as real time passes.

use super::PrivacyEngine;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type Task = Box<dyn FnOnce(&mut PrivacyEngine)>;

/// Handle returned by [`Scheduler::schedule`], used to cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Default)]
struct SchedulerState {
    now_ms: u64,
    next_id: u64,
    /// Keyed by (due time, id) so equal deadlines run in schedule order
    queue: BTreeMap<(u64, TaskId), Task>,
}

/// Fire-once timer queue.
///
/// Cloning gives another handle to the same queue, so interception hooks can
/// schedule fallbacks without holding the engine.
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Scheduler")
            .field("now_ms", &state.now_ms)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` once, `delay_ms` after the current virtual time
    pub fn schedule<F>(&self, delay_ms: u64, task: F) -> TaskId
    where
        F: FnOnce(&mut PrivacyEngine) + 'static,
    {
        let mut state = self.state.borrow_mut();
        let id = TaskId(state.next_id);
        state.next_id += 1;
        let due = state.now_ms.saturating_add(delay_ms);
        state.queue.insert((due, id), Box::new(task));
        id
    }

    /// Returns `false` if the task already ran or was cancelled
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut state = self.state.borrow_mut();
        let key = state.queue.keys().find(|(_, task)| *task == id).copied();
        match key {
            Some(key) => state.queue.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        self.state.borrow_mut().queue.clear();
    }

    pub fn now(&self) -> u64 {
        self.state.borrow().now_ms
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Deadline of the earliest task
    pub(super) fn next_due(&self) -> Option<u64> {
        self.state.borrow().queue.keys().next().map(|(due, _)| *due)
    }

    /// Take the earliest task if it is due
    pub(super) fn pop_due(&self) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        let now = state.now_ms;
        let key = *state.queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        state.queue.remove(&key)
    }

    pub(super) fn set_now(&self, now_ms: u64) {
        let mut state = self.state.borrow_mut();
        state.now_ms = state.now_ms.max(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_and_due_time() {
        let scheduler = Scheduler::new();
        let late = scheduler.schedule(50, |_| {});
        let first = scheduler.schedule(0, |_| {});
        let second = scheduler.schedule(0, |_| {});
        assert!(first < second);
        assert_eq!(scheduler.pending(), 3);
        assert_eq!(scheduler.next_due(), Some(0));

        assert!(scheduler.pop_due().is_some());
        assert!(scheduler.pop_due().is_some());
        assert!(scheduler.pop_due().is_none());

        scheduler.set_now(50);
        assert!(scheduler.cancel(late));
        assert!(!scheduler.cancel(late));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_clock_never_goes_back() {
        let scheduler = Scheduler::new();
        scheduler.set_now(100);
        scheduler.set_now(10);
        assert_eq!(scheduler.now(), 100);
    }
}
