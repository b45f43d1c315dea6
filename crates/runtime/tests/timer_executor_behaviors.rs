//! Timer Executor Behavioral Tests - BDD Style
//!
//! Following BDD naming convention: given_<context>_when_<action>_then_<outcome>
//!
//! These tests document expected timer scheduling behaviors through
//! executable specifications: scheduling records, due-task materialization,
//! the missing-schedule-entry stall, and garbage collection.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;

use atrium_core::Result;
use atrium_runtime::daemon::DaemonLoop;
use atrium_runtime::{
    Application, ExecutionContext, RunningTask, ServiceKey, ServiceRegistry, Timer, TimerId,
    TimerService, TimerServiceExecutor,
};

// ============================================================================
// Test doubles
// ============================================================================

struct TestApplication;

impl Application for TestApplication {
    fn name(&self) -> &str {
        "test-app"
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

struct FlagTask {
    running: Arc<AtomicBool>,
}

impl RunningTask for FlagTask {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A timer whose materialized task reports the shared `running` flag.
struct TestTimer {
    id: TimerId,
    time_remaining: Duration,
    service_key: ServiceKey,
    running: Arc<AtomicBool>,
}

impl TestTimer {
    fn new(service_key: &ServiceKey, time_remaining: Duration) -> Arc<Self> {
        Arc::new(Self {
            id: TimerId::new(),
            time_remaining,
            service_key: service_key.clone(),
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn finish_task(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Timer for TestTimer {
    fn id(&self) -> TimerId {
        self.id.clone()
    }

    fn time_remaining(&self) -> Duration {
        self.time_remaining
    }

    fn service_key(&self) -> ServiceKey {
        self.service_key.clone()
    }

    fn create_task(&self, _context: &ExecutionContext) -> Arc<dyn RunningTask> {
        Arc::new(FlagTask {
            running: Arc::clone(&self.running),
        })
    }
}

struct TestService {
    timers: HashMap<TimerId, Arc<TestTimer>>,
}

impl TimerService for TestService {
    fn timer(&self, timer_id: &TimerId) -> Option<Arc<dyn Timer>> {
        self.timers
            .get(timer_id)
            .map(|t| Arc::clone(t) as Arc<dyn Timer>)
    }
}

struct TestRegistry {
    services: HashMap<ServiceKey, Arc<TestService>>,
}

impl ServiceRegistry for TestRegistry {
    fn lookup(&self, key: &ServiceKey) -> Option<Arc<dyn TimerService>> {
        self.services
            .get(key)
            .map(|s| Arc::clone(s) as Arc<dyn TimerService>)
    }
}

/// Build a bootstrapped executor with the given timers registered under one
/// service.
async fn executor_with_timers(
    service_key: &ServiceKey,
    timers: &[Arc<TestTimer>],
) -> TimerServiceExecutor {
    let service = Arc::new(TestService {
        timers: timers
            .iter()
            .map(|t| (t.id(), Arc::clone(t)))
            .collect(),
    });
    let registry = TestRegistry {
        services: HashMap::from([(service_key.clone(), service)]),
    };

    let executor = TimerServiceExecutor::new(Arc::new(TestApplication), Arc::new(registry));
    executor.bootstrap().await.unwrap();
    executor
}

// ============================================================================
// 1. SCHEDULING
// ============================================================================

#[tokio::test]
async fn given_timer_when_scheduled_then_deadline_and_service_key_recorded() {
    // GIVEN: A timer due two seconds from now
    let key = ServiceKey::from_string("svc-schedule");
    let timer = TestTimer::new(&key, Duration::from_secs(2));
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;

    // WHEN: Scheduling it
    let before = Utc::now();
    executor.schedule(timer.as_ref()).await;
    let after = Utc::now();

    // THEN: Exactly one pending entry exists with the captured deadline
    let wrappers = executor.pending_wrappers().await;
    assert_eq!(wrappers.len(), 1, "Should have exactly one pending entry");

    let execute_at = wrappers[0].execute_at();
    let lower = before + chrono::TimeDelta::seconds(2);
    let upper = after + chrono::TimeDelta::seconds(2) + chrono::TimeDelta::milliseconds(200);
    assert!(
        execute_at >= lower && execute_at <= upper,
        "Deadline should equal schedule time plus time remaining"
    );

    // AND: The timer-to-service mapping was recorded
    assert_eq!(
        executor.scheduled_service_key(&timer.id()).await,
        Some(key)
    );
}

#[tokio::test]
async fn given_timer_scheduled_twice_when_second_schedule_then_key_overwritten_and_fresh_task() {
    // GIVEN: A timer already scheduled once
    let key = ServiceKey::from_string("svc-twice");
    let timer = TestTimer::new(&key, Duration::from_secs(60));
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;

    // WHEN: Scheduling the same timer again
    executor.schedule(timer.as_ref()).await;

    // THEN: Two distinct pending tasks exist, one schedule entry
    let wrappers = executor.pending_wrappers().await;
    assert_eq!(wrappers.len(), 2, "Each call produces a fresh task");
    assert_ne!(
        wrappers[0].task_id(),
        wrappers[1].task_id(),
        "Task IDs are unique per scheduling call"
    );
    assert!(
        executor.scheduled_service_key(&timer.id()).await.is_some(),
        "One schedule entry keyed by the timer ID remains"
    );
}

// ============================================================================
// 2. MATERIALIZATION
// ============================================================================

#[tokio::test]
async fn given_zero_delay_timer_when_iterate_then_moved_into_running_tasks() {
    // GIVEN: A timer with no time remaining (Scenario A)
    let key = ServiceKey::from_string("svc-due");
    let timer = TestTimer::new(&key, Duration::ZERO);
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;

    let task_id = executor.pending_wrappers().await[0].task_id().clone();

    // WHEN: The next pass runs
    executor.run_once().await;

    // THEN: The wrapper moved from the pending store into the running store
    assert!(!executor.is_pending(&task_id).await);
    assert!(executor.is_dispatched(&task_id).await);
    assert_eq!(executor.pending_count().await, 0);
    assert_eq!(executor.running_count().await, 1);
}

#[tokio::test]
async fn given_future_deadline_when_iterate_then_never_dispatched_early() {
    // GIVEN: A timer due a minute from now
    let key = ServiceKey::from_string("svc-early");
    let timer = TestTimer::new(&key, Duration::from_secs(60));
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;

    // WHEN: Several passes run before the deadline
    executor.run_once().await;
    executor.run_once().await;

    // THEN: The entry stays pending
    assert_eq!(executor.pending_count().await, 1);
    assert_eq!(executor.running_count().await, 0);
}

#[tokio::test]
async fn given_missing_schedule_entry_when_iterate_then_entry_stalls_and_others_proceed() {
    // GIVEN: Two due timers, one of which lost its schedule entry before the
    // tick (Scenario B)
    let key = ServiceKey::from_string("svc-stall");
    let orphaned = TestTimer::new(&key, Duration::ZERO);
    let healthy = TestTimer::new(&key, Duration::ZERO);
    let executor =
        executor_with_timers(&key, &[Arc::clone(&orphaned), Arc::clone(&healthy)]).await;
    executor.schedule(orphaned.as_ref()).await;
    executor.schedule(healthy.as_ref()).await;

    let orphaned_task = executor
        .pending_wrappers()
        .await
        .iter()
        .find(|w| w.timer_id() == &orphaned.id())
        .unwrap()
        .task_id()
        .clone();

    assert!(executor.evict_schedule(&orphaned.id()).await);

    // WHEN: The pass runs
    executor.run_once().await;

    // THEN: The orphaned entry remains queued; the healthy one dispatched;
    // the loop did not abort
    assert!(executor.is_pending(&orphaned_task).await);
    assert_eq!(executor.pending_count().await, 1);
    assert_eq!(executor.running_count().await, 1);

    // AND: It stays stalled on subsequent passes too
    executor.run_once().await;
    assert!(executor.is_pending(&orphaned_task).await);
}

// ============================================================================
// 3. GARBAGE COLLECTION
// ============================================================================

#[tokio::test]
async fn given_running_task_when_collect_garbage_then_entry_persists() {
    // GIVEN: A dispatched task that is still running
    let key = ServiceKey::from_string("svc-gc-running");
    let timer = TestTimer::new(&key, Duration::ZERO);
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;
    executor.run_once().await;
    assert_eq!(executor.running_count().await, 1);

    // WHEN: Garbage collection runs repeatedly
    executor.collect_garbage().await;
    executor.collect_garbage().await;

    // THEN: The running entry persists
    assert_eq!(executor.running_count().await, 1);
}

#[tokio::test]
async fn given_finished_task_when_collect_garbage_then_reaped_exactly_once() {
    // GIVEN: A dispatched task that has finished
    let key = ServiceKey::from_string("svc-gc-finished");
    let timer = TestTimer::new(&key, Duration::ZERO);
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;
    executor.run_once().await;
    timer.finish_task();

    // WHEN: Garbage collection runs
    executor.collect_garbage().await;

    // THEN: The entry is gone
    assert_eq!(executor.running_count().await, 0);

    // AND: A second call with no state change is a no-op
    executor.collect_garbage().await;
    assert_eq!(executor.running_count().await, 0);
}

#[tokio::test]
async fn given_due_timer_when_full_iterate_then_finished_task_reaped_in_same_pass() {
    // GIVEN: A due timer whose task completes immediately
    let key = ServiceKey::from_string("svc-iterate");
    let timer = TestTimer::new(&key, Duration::ZERO);
    timer.finish_task();
    let executor = executor_with_timers(&key, &[Arc::clone(&timer)]).await;
    executor.schedule(timer.as_ref()).await;

    // WHEN: One full iterate runs (base tick plus scan plus GC)
    executor.iterate(Duration::from_millis(1)).await;

    // THEN: The task was materialized and already reaped by the same pass
    assert_eq!(executor.pending_count().await, 0);
    assert_eq!(executor.running_count().await, 0);
}
