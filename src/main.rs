//! # Atrium - Runtime Core Entry Point
//!
//! Demo wiring for the Atrium runtime core: starts the timer daemon for a
//! demo application, schedules a handful of timers, dispatches one request
//! through a small valve chain, then runs until Ctrl+C.
//!
//! ## Initialization Sequence
//!
//! 1. **Tracing** - structured logging with env-filter support
//! 2. **Application + registry** - the demo application and its timer service
//! 3. **Timer daemon** - bootstrap once, then the iterate/sleep loop
//! 4. **Demo dispatch** - one request through the valve chain
//!
//! ## Shutdown
//!
//! Ctrl+C stops the daemon driver; the loop exits after the current tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use clap::Parser;
use http::Method;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use atrium_runtime::{
    Application, DaemonDriver, DispatchRequest, DispatchResponse, ExecutionContext, ProfileSink,
    RequestHandler, RunningTask, ServiceKey, ServiceRegistry, Timer, TimerExecutorConfig,
    TimerId, TimerService, TimerServiceExecutor, Valve,
};

/// Atrium application server runtime core.
#[derive(Parser)]
#[command(name = "atrium", version, about)]
struct Cli {
    /// Daemon tick timeout in milliseconds.
    #[arg(long, default_value_t = 1_000)]
    tick_ms: u64,

    /// Number of demo timers to schedule at startup.
    #[arg(long, default_value_t = 3)]
    demo_timers: u64,
}

// ============================================================================
// Demo application
// ============================================================================

struct DemoApplication;

impl Application for DemoApplication {
    fn name(&self) -> &str {
        "demo-app"
    }

    fn initialize(&self) -> atrium_core::Result<()> {
        Ok(())
    }

    fn profile_sink(&self) -> Option<ProfileSink> {
        Some(ProfileSink::new())
    }
}

struct DemoTask {
    running: Arc<AtomicBool>,
}

impl RunningTask for DemoTask {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A timer whose task logs once and finishes.
struct DemoTimer {
    id: TimerId,
    delay: Duration,
    service_key: ServiceKey,
}

impl Timer for DemoTimer {
    fn id(&self) -> TimerId {
        self.id.clone()
    }

    fn time_remaining(&self) -> Duration {
        self.delay
    }

    fn service_key(&self) -> ServiceKey {
        self.service_key.clone()
    }

    fn create_task(&self, context: &ExecutionContext) -> Arc<dyn RunningTask> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let timer_id = self.id.clone();
        let request_id = context.request_id().clone();

        tokio::spawn(async move {
            info!(timer_id = %timer_id, request_id = %request_id, "Demo timer fired");
            flag.store(false, Ordering::SeqCst);
        });

        Arc::new(DemoTask { running })
    }
}

struct DemoTimerService {
    timers: HashMap<TimerId, Arc<DemoTimer>>,
}

impl TimerService for DemoTimerService {
    fn timer(&self, timer_id: &TimerId) -> Option<Arc<dyn Timer>> {
        self.timers
            .get(timer_id)
            .map(|t| Arc::clone(t) as Arc<dyn Timer>)
    }
}

struct DemoRegistry {
    services: HashMap<ServiceKey, Arc<DemoTimerService>>,
}

impl ServiceRegistry for DemoRegistry {
    fn lookup(&self, key: &ServiceKey) -> Option<Arc<dyn TimerService>> {
        self.services
            .get(key)
            .map(|s| Arc::clone(s) as Arc<dyn TimerService>)
    }
}

// ============================================================================
// Demo valves
// ============================================================================

/// Logs the request and records the tenant attribute for later stages.
struct AccessLogValve;

#[async_trait]
impl Valve for AccessLogValve {
    async fn invoke(
        &self,
        request: &mut DispatchRequest,
        _response: &mut DispatchResponse,
    ) -> atrium_core::Result<()> {
        info!(method = %request.method(), path = %request.path(), "Request received");
        request.set_attribute("tenant", "demo");
        Ok(())
    }
}

/// Writes the demo body and marks the request dispatched.
struct GreetingValve;

#[async_trait]
impl Valve for GreetingValve {
    async fn invoke(
        &self,
        request: &mut DispatchRequest,
        response: &mut DispatchResponse,
    ) -> atrium_core::Result<()> {
        let tenant = request.attribute("tenant").unwrap_or("unknown");
        response.append_body(&format!("hello from {tenant}"));
        request.mark_dispatched();
        Ok(())
    }
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    info!("Atrium runtime core starting...");

    let application = Arc::new(DemoApplication);
    let service_key = ServiceKey::from_string("demo-timer-service");

    // Build the demo timers and the registry that resolves them.
    let timers: Vec<Arc<DemoTimer>> = (0..cli.demo_timers)
        .map(|i| {
            Arc::new(DemoTimer {
                id: TimerId::new(),
                delay: Duration::from_millis(500 * (i + 1)),
                service_key: service_key.clone(),
            })
        })
        .collect();

    let service = Arc::new(DemoTimerService {
        timers: timers.iter().map(|t| (t.id(), Arc::clone(t))).collect(),
    });
    let registry = Arc::new(DemoRegistry {
        services: HashMap::from([(service_key, service)]),
    });

    // Start the timer daemon.
    let config = TimerExecutorConfig {
        tick_interval_ms: cli.tick_ms,
    };
    let executor = Arc::new(TimerServiceExecutor::new(application.clone(), registry));
    let driver = Arc::new(DaemonDriver::new(
        Arc::clone(&executor),
        config.tick_timeout(),
    ));

    let loop_handle = tokio::spawn({
        let driver = Arc::clone(&driver);
        async move { driver.start().await }
    });

    for timer in &timers {
        executor.schedule(timer.as_ref()).await;
    }
    info!(count = timers.len(), "Demo timers scheduled");

    // Dispatch one demo request through the valve chain.
    let handler = RequestHandler::new(
        vec![Arc::new(AccessLogValve), Arc::new(GreetingValve)],
        application,
        DispatchRequest::new(Method::GET, "/demo"),
        DispatchResponse::new(),
    );
    let response = handler.spawn().into_response().await;
    info!(
        status = %response.status(),
        body = %response.body(),
        "Demo dispatch completed"
    );

    info!("Atrium is running. Press Ctrl+C to stop.");
    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down...");
    driver.stop().await;
    loop_handle
        .await
        .context("daemon loop task failed")?
        .context("daemon loop terminated with an error")?;

    info!("Atrium stopped");
    Ok(())
}

/// Initialize tracing with env-filter support (`RUST_LOG`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
