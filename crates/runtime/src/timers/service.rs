//! Timer identities and the resolution capabilities the engine consumes.
//!
//! The engine never owns timers. It records which service a timer belongs to
//! and, when the timer comes due, resolves the chain
//! registry -> service -> timer -> running task through these traits.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ExecutionContext;

/// Unique identifier for a scheduled timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(String);

impl TimerId {
    /// Create a new unique timer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("timer-{}", Uuid::new_v4()))
    }

    /// Create a timer ID from an existing string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a pending or running timer task.
///
/// A fresh `TaskId` is generated on every scheduling call, so rescheduling
/// the same timer produces distinct tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    /// Create a new unique task ID.
    #[must_use]
    pub fn new() -> Self {
        Self(format!("task-{}", Uuid::new_v4()))
    }

    /// Create a task ID from an existing string.
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of the timer service owning a timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Create a service key from an existing string.
    #[must_use]
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A materialized, executing timer task.
///
/// The engine tracks it until `is_running` turns false, then reaps it.
pub trait RunningTask: Send + Sync {
    /// Whether the task is still executing.
    fn is_running(&self) -> bool;
}

/// A scheduled unit of deferred work, owned by its timer service.
pub trait Timer: Send + Sync {
    /// The timer's identifier.
    fn id(&self) -> TimerId;

    /// Time until the timer is due, captured at schedule time.
    ///
    /// Microsecond precision is preserved when the deadline is computed.
    fn time_remaining(&self) -> Duration;

    /// Primary key of the owning timer service.
    fn service_key(&self) -> ServiceKey;

    /// Materialize the timer into a running task.
    ///
    /// Implementations start the task's work and return a handle exposing
    /// its running state.
    fn create_task(&self, context: &ExecutionContext) -> Arc<dyn RunningTask>;
}

/// A timer service: the owner of a set of timers, addressed by primary key.
pub trait TimerService: Send + Sync {
    /// Look up a timer by its ID.
    fn timer(&self, timer_id: &TimerId) -> Option<Arc<dyn Timer>>;
}

/// The registry through which timer services are resolved.
pub trait ServiceRegistry: Send + Sync {
    /// Look up a timer service by its primary key.
    fn lookup(&self, key: &ServiceKey) -> Option<Arc<dyn TimerService>>;
}
