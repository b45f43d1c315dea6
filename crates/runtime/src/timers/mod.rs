//! Timer scheduling for deferred enterprise-style work.
//!
//! # Architecture
//!
//! The timer subsystem has three layers:
//! 1. The resolution capabilities ([`ServiceRegistry`], [`TimerService`],
//!    [`Timer`], [`RunningTask`]) owned by the surrounding container.
//! 2. The shared stores ([`crate::stores::TimerStores`]) behind one mutex.
//! 3. The [`TimerServiceExecutor`] daemon that schedules, materializes and
//!    reaps tasks.
//!
//! A task moves Scheduled -> Due -> Dispatched -> Completed -> Reaped. A due
//! task whose schedule entry has vanished stalls at Due and is re-logged on
//! every tick; that behavior is deliberate (no expiry policy exists).

mod executor;
mod service;

pub use executor::{TimerExecutorConfig, TimerServiceExecutor};
pub use service::{
    RunningTask, ServiceKey, ServiceRegistry, TaskId, Timer, TimerId, TimerService,
};
