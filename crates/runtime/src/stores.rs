//! The shared synchronized stores of the timer subsystem.
//!
//! Three key/value containers are the only state shared across concurrent
//! units in this core: `scheduled_timers` (timer -> owning service key),
//! `tasks_to_execute` (pending due-date records) and `timer_tasks` (running
//! tasks). They live together in one [`TimerStores`] value so a single mutex
//! can guard all three; every method here is one atomic store operation
//! executed under the caller's lock acquisition.
//!
//! A task ID is in exactly one of `tasks_to_execute` and `timer_tasks` at
//! any time - never both, never neither - until it is reaped.
//!
//! `tasks_to_execute` is an ordinary map, not a deadline-ordered structure:
//! due entries are visited in map iteration order, with no priority ordering
//! across ticks. That is a known scalability limit, kept for behavioral
//! parity with deployments that depend on it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timers::{RunningTask, ServiceKey, TaskId, TimerId};

/// Ephemeral due-date record pairing a timer to a pending dispatch slot.
///
/// Created at schedule time, never mutated afterwards; removed exactly once,
/// when its deadline has passed and it is materialized into a running task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerTaskWrapper {
    execute_at: DateTime<Utc>,
    task_id: TaskId,
    timer_id: TimerId,
}

impl TimerTaskWrapper {
    /// Create a wrapper with a fresh task ID.
    #[must_use]
    pub fn new(execute_at: DateTime<Utc>, timer_id: TimerId) -> Self {
        Self {
            execute_at,
            task_id: TaskId::new(),
            timer_id,
        }
    }

    /// The absolute wall-clock deadline.
    #[must_use]
    pub fn execute_at(&self) -> DateTime<Utc> {
        self.execute_at
    }

    /// The task ID, unique per scheduling call.
    #[must_use]
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// The scheduled timer this wrapper belongs to.
    #[must_use]
    pub fn timer_id(&self) -> &TimerId {
        &self.timer_id
    }

    /// Whether the deadline has passed at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.execute_at < now
    }
}

/// The three shared stores, guarded together by one mutex at the owner.
#[derive(Default)]
pub struct TimerStores {
    /// Maps a timer to the primary key of its owning service.
    scheduled_timers: HashMap<TimerId, ServiceKey>,
    /// Pending due-date records, keyed by task ID.
    tasks_to_execute: HashMap<TaskId, TimerTaskWrapper>,
    /// Materialized running tasks, keyed by task ID.
    timer_tasks: HashMap<TaskId, Arc<dyn RunningTask>>,
}

impl TimerStores {
    /// Create empty stores.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a schedule: both stores observe the update atomically.
    ///
    /// An existing `scheduled_timers` entry for the same timer is
    /// overwritten; the wrapper always lands under its own fresh task ID.
    pub fn record_schedule(
        &mut self,
        timer_id: TimerId,
        service_key: ServiceKey,
        wrapper: TimerTaskWrapper,
    ) {
        self.scheduled_timers.insert(timer_id, service_key);
        self.tasks_to_execute
            .insert(wrapper.task_id().clone(), wrapper);
    }

    /// Snapshot the entries whose deadline has passed, in map iteration
    /// order.
    #[must_use]
    pub fn due_entries(&self, now: DateTime<Utc>) -> Vec<(TaskId, TimerTaskWrapper)> {
        self.tasks_to_execute
            .iter()
            .filter(|(_, wrapper)| wrapper.is_due(now))
            .map(|(task_id, wrapper)| (task_id.clone(), wrapper.clone()))
            .collect()
    }

    /// The service key recorded for a timer, if any.
    #[must_use]
    pub fn service_key(&self, timer_id: &TimerId) -> Option<ServiceKey> {
        self.scheduled_timers.get(timer_id).cloned()
    }

    /// Move a pending entry into the running-task store.
    ///
    /// The removal from `tasks_to_execute` and the insertion into
    /// `timer_tasks` happen as one pair under the caller's lock. Returns
    /// false (and inserts nothing) if the pending entry was already gone.
    pub fn dispatch(&mut self, task_id: &TaskId, task: Arc<dyn RunningTask>) -> bool {
        if self.tasks_to_execute.remove(task_id).is_some() {
            self.timer_tasks.insert(task_id.clone(), task);
            true
        } else {
            false
        }
    }

    /// Remove every running-task entry whose task has finished.
    ///
    /// Returns the number of entries reaped.
    pub fn sweep_finished(&mut self) -> usize {
        let before = self.timer_tasks.len();
        self.timer_tasks.retain(|_, task| task.is_running());
        before - self.timer_tasks.len()
    }

    /// Drop the schedule entry for a timer, returning the old key.
    pub fn remove_scheduled(&mut self, timer_id: &TimerId) -> Option<ServiceKey> {
        self.scheduled_timers.remove(timer_id)
    }

    /// Number of pending due-date records.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.tasks_to_execute.len()
    }

    /// Number of tracked running tasks.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.timer_tasks.len()
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn scheduled_count(&self) -> usize {
        self.scheduled_timers.len()
    }

    /// Whether a task ID is still pending.
    #[must_use]
    pub fn is_pending(&self, task_id: &TaskId) -> bool {
        self.tasks_to_execute.contains_key(task_id)
    }

    /// Whether a task ID has been moved into the running-task store.
    #[must_use]
    pub fn is_dispatched(&self, task_id: &TaskId) -> bool {
        self.timer_tasks.contains_key(task_id)
    }

    /// Clone the pending wrappers, for inspection.
    #[must_use]
    pub fn pending_wrappers(&self) -> Vec<TimerTaskWrapper> {
        self.tasks_to_execute.values().cloned().collect()
    }
}
