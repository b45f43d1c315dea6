//! The timer service executor daemon.
//!
//! One executor runs per application for the application's lifetime. Producer
//! tasks call [`TimerServiceExecutor::schedule`] concurrently; the daemon
//! loop periodically moves due entries out of the pending store into running
//! tasks and reaps the finished ones.
//!
//! Every store access happens inside a narrow critical section on the single
//! stores mutex; the lock is never held across a sleep or across timer
//! resolution.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error};

use atrium_core::Result;

use crate::context::{Application, ExecutionContext, ProfileSink};
use crate::daemon::DaemonLoop;
use crate::stores::{TimerStores, TimerTaskWrapper};

use super::service::{ServiceRegistry, TaskId, Timer, TimerId};

/// Component label attached to the executor's profiling records.
const PROFILE_COMPONENT: &str = "timer-executor";

/// Configuration for the timer service executor.
#[derive(Debug, Clone)]
pub struct TimerExecutorConfig {
    /// Timeout handed to every iterate call, in milliseconds.
    pub tick_interval_ms: u64,
}

impl TimerExecutorConfig {
    /// The tick timeout as a duration.
    #[must_use]
    pub fn tick_timeout(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for TimerExecutorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

/// The executor daemon for an application's timers.
///
/// Owns the shared stores; implements [`DaemonLoop`] so a
/// [`DaemonDriver`](crate::daemon::DaemonDriver) can run it for the process
/// lifetime.
pub struct TimerServiceExecutor {
    application: Arc<dyn Application>,
    registry: Arc<dyn ServiceRegistry>,
    stores: Mutex<TimerStores>,
    context: OnceLock<ExecutionContext>,
    profile: OnceLock<ProfileSink>,
}

impl TimerServiceExecutor {
    /// Create an executor for the given application and service registry.
    #[must_use]
    pub fn new(application: Arc<dyn Application>, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            application,
            registry,
            stores: Mutex::new(TimerStores::new()),
            context: OnceLock::new(),
            profile: OnceLock::new(),
        }
    }

    /// The owning application.
    #[must_use]
    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    /// Add the passed timer to the schedule.
    ///
    /// Callable concurrently from any number of producer tasks. Both stores
    /// observe the update atomically: the timer-to-service mapping and the
    /// pending due-date record are written under one critical section. The
    /// deadline is captured here, once, and never recomputed.
    pub async fn schedule(&self, timer: &dyn Timer) {
        let timer_id = timer.id();
        let service_key = timer.service_key();
        let time_remaining =
            TimeDelta::from_std(timer.time_remaining()).unwrap_or(TimeDelta::MAX);

        let mut stores = self.stores.lock().await;
        let execute_at = Utc::now() + time_remaining;
        let wrapper = TimerTaskWrapper::new(execute_at, timer_id.clone());

        debug!(
            timer_id = %timer_id,
            task_id = %wrapper.task_id(),
            execute_at = %execute_at,
            "Timer scheduled"
        );

        stores.record_schedule(timer_id, service_key, wrapper);
    }

    /// One pass over the pending store: materialize due tasks, collect
    /// garbage, report the queue depth.
    ///
    /// This is the scan half of [`DaemonLoop::iterate`], exposed so tests
    /// can drive a tick without the daemon sleep.
    pub async fn run_once(&self) {
        let now = Utc::now();

        let due = {
            let stores = self.stores.lock().await;
            stores.due_entries(now)
        };

        for (entry_id, wrapper) in due {
            // A pending record whose key disagrees with its own task ID is
            // corrupt; this should never happen.
            if entry_id != *wrapper.task_id() {
                error!(
                    task_id = %entry_id,
                    wrapper_task_id = %wrapper.task_id(),
                    "Pending timer task record is malformed, skipping"
                );
                continue;
            }

            self.materialize(&wrapper).await;
        }

        self.collect_garbage().await;

        if let Some(profile) = self.profile.get() {
            let pending = {
                let stores = self.stores.lock().await;
                stores.pending_count()
            };
            profile.debug(format!(
                "Processed timer service executor, executing {pending} timer tasks"
            ));
        }
    }

    /// Resolve a due wrapper and move it into the running-task store.
    ///
    /// On any resolution failure the wrapper stays queued and the failure is
    /// logged; it will be re-evaluated (and re-logged) on every subsequent
    /// tick until the schedule entry reappears or the process is torn down.
    async fn materialize(&self, wrapper: &TimerTaskWrapper) {
        let timer_id = wrapper.timer_id();
        let task_id = wrapper.task_id();

        let service_key = {
            let stores = self.stores.lock().await;
            stores.service_key(timer_id)
        };

        let Some(service_key) = service_key else {
            error!(
                timer_id = %timer_id,
                task_id = %task_id,
                "Cannot find timer {timer_id} to create timer task {task_id}"
            );
            return;
        };

        let Some(context) = self.context.get() else {
            error!(task_id = %task_id, "Timer service executor is not bootstrapped");
            return;
        };

        let Some(service) = self.registry.lookup(&service_key) else {
            error!(
                service_key = %service_key,
                task_id = %task_id,
                "Cannot find timer service {service_key} to create timer task {task_id}"
            );
            return;
        };

        let Some(timer) = service.timer(timer_id) else {
            error!(
                timer_id = %timer_id,
                task_id = %task_id,
                "Cannot find timer {timer_id} to create timer task {task_id}"
            );
            return;
        };

        // Materialize outside the lock; the remove/insert pair below is the
        // only part that has to be atomic.
        let task = timer.create_task(context);

        let moved = {
            let mut stores = self.stores.lock().await;
            stores.dispatch(task_id, task)
        };

        if moved {
            debug!(timer_id = %timer_id, task_id = %task_id, "Timer task dispatched");
        }
    }

    /// Collect the finished timer task jobs.
    ///
    /// A single critical section sweeps the running-task store; entries
    /// whose task still reports running persist across repeated calls.
    pub async fn collect_garbage(&self) {
        let reaped = {
            let mut stores = self.stores.lock().await;
            stores.sweep_finished()
        };

        if reaped > 0 {
            debug!(reaped, "Collected finished timer tasks");
        }
    }

    /// Drop the schedule entry for a timer.
    ///
    /// Nothing in the runtime calls this; it exists so tests can simulate a
    /// timer service that disappeared before its task was materialized.
    pub async fn evict_schedule(&self, timer_id: &TimerId) -> bool {
        let mut stores = self.stores.lock().await;
        stores.remove_scheduled(timer_id).is_some()
    }

    /// Number of pending due-date records.
    pub async fn pending_count(&self) -> usize {
        self.stores.lock().await.pending_count()
    }

    /// Number of tracked running tasks.
    pub async fn running_count(&self) -> usize {
        self.stores.lock().await.running_count()
    }

    /// Whether a task is still pending.
    pub async fn is_pending(&self, task_id: &TaskId) -> bool {
        self.stores.lock().await.is_pending(task_id)
    }

    /// Whether a task has been moved into the running-task store.
    pub async fn is_dispatched(&self, task_id: &TaskId) -> bool {
        self.stores.lock().await.is_dispatched(task_id)
    }

    /// Clone the pending wrappers, for inspection.
    pub async fn pending_wrappers(&self) -> Vec<TimerTaskWrapper> {
        self.stores.lock().await.pending_wrappers()
    }

    /// The service key currently recorded for a timer.
    pub async fn scheduled_service_key(
        &self,
        timer_id: &TimerId,
    ) -> Option<super::service::ServiceKey> {
        self.stores.lock().await.service_key(timer_id)
    }
}

#[async_trait]
impl DaemonLoop for TimerServiceExecutor {
    /// Initialize the execution context for the owning application, seed the
    /// unit's correlation identity, and attach the profiling sink.
    async fn bootstrap(&self) -> Result<()> {
        let context = ExecutionContext::bootstrap(Arc::clone(&self.application))?;

        debug!(
            application = %self.application.name(),
            session_id = %context.session_id(),
            "Timer service executor bootstrapped"
        );

        let _ = self.context.set(context);

        if let Some(sink) = self.application.profile_sink() {
            let _ = self.profile.set(sink.with_component(PROFILE_COMPONENT));
        }

        Ok(())
    }

    /// Base tick, then one scan pass.
    async fn iterate(&self, timeout: Duration) {
        self.sleep(timeout).await;
        self.run_once().await;
    }
}
