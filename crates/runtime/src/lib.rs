//! # Atrium Runtime
//!
//! The runtime core of the Atrium application server. Two subsystems share
//! this crate:
//!
//! 1. **Request dispatch** - every inbound request is handled by its own
//!    [`dispatch::RequestHandler`] task, which runs an ordered chain of
//!    [`dispatch::Valve`] stages and always yields a well-formed response,
//!    whatever failed along the way.
//! 2. **Timer scheduling** - a single daemon task runs the
//!    [`timers::TimerServiceExecutor`] iterate/sleep loop, moving due timer
//!    tasks out of the shared stores into running tasks and reaping the
//!    finished ones.
//!
//! The two subsystems share no state with each other. Within the timer
//! subsystem, all cross-task state lives in [`stores::TimerStores`] behind a
//! single mutex with narrow critical sections.

pub mod context;
pub mod daemon;
pub mod dispatch;
pub mod stores;
pub mod timers;

pub use context::{Application, CorrelationId, ExecutionContext, ProfileSink};
pub use daemon::{DaemonDriver, DaemonLoop};
pub use dispatch::{DispatchRequest, DispatchResponse, RequestHandler, Valve};
pub use stores::TimerTaskWrapper;
pub use timers::{
    RunningTask, ServiceKey, ServiceRegistry, TaskId, Timer, TimerExecutorConfig, TimerId,
    TimerService, TimerServiceExecutor,
};
