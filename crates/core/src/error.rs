//! Core error types for Atrium runtime operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// Core error type for Atrium runtime operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Application lifecycle errors
    #[error("failed to initialize application '{application}': {reason}")]
    ApplicationInitFailed {
        application: String,
        reason: String,
    },

    // Dispatch errors
    #[error("valve '{valve}' failed: {reason}")]
    ValveFailed { valve: String, reason: String },

    #[error("dispatch unit terminated abnormally: {reason}")]
    DispatchAborted { reason: String },

    // Timer errors
    #[error("cannot resolve timer {timer_id} to create task {task_id}")]
    TimerResolutionFailed { timer_id: String, task_id: String },

    #[error("timer service not found for key {key}")]
    TimerServiceNotFound { key: String },

    // Generic errors
    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Create an application initialization error.
    pub fn application_init_failed(
        application: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ApplicationInitFailed {
            application: application.into(),
            reason: reason.into(),
        }
    }

    /// Create a valve failure error.
    pub fn valve_failed(valve: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValveFailed {
            valve: valve.into(),
            reason: reason.into(),
        }
    }

    /// Create a dispatch abort error.
    pub fn dispatch_aborted(reason: impl Into<String>) -> Self {
        Self::DispatchAborted {
            reason: reason.into(),
        }
    }

    /// Create a timer resolution error.
    pub fn timer_resolution_failed(
        timer_id: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self::TimerResolutionFailed {
            timer_id: timer_id.into(),
            task_id: task_id.into(),
        }
    }

    /// Create a timer service lookup error.
    pub fn timer_service_not_found(key: impl Into<String>) -> Self {
        Self::TimerServiceNotFound { key: key.into() }
    }

    /// Create an invalid record error.
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}
