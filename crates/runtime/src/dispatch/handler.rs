//! The per-request dispatch unit.
//!
//! Each inbound request is handled on its own task, in its own context.
//! The unit owns its request/response pair for the whole dispatch: no state
//! is shared with other units, so no locking is involved here.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use atrium_core::{Error, Result};

use crate::context::Application;

use super::request::DispatchRequest;
use super::response::DispatchResponse;
use super::valve::Valve;

/// Component label attached to the unit's profiling records.
const PROFILE_COMPONENT: &str = "request-handler";

/// A one-shot dispatch unit for a single request.
///
/// All four inputs - the valve chain, the application, the request and the
/// response - are constructor parameters, so a unit can never start in an
/// incompletely-injected state.
pub struct RequestHandler {
    valves: Vec<Arc<dyn Valve>>,
    application: Arc<dyn Application>,
    request: DispatchRequest,
    response: DispatchResponse,
}

impl RequestHandler {
    /// Create a dispatch unit with its complete set of inputs.
    #[must_use]
    pub fn new(
        valves: Vec<Arc<dyn Valve>>,
        application: Arc<dyn Application>,
        request: DispatchRequest,
        response: DispatchResponse,
    ) -> Self {
        Self {
            valves,
            application,
            request,
            response,
        }
    }

    /// Run the dispatch to completion and return the finalized response.
    ///
    /// The unit body executes inside a deferred recovery boundary. A stage
    /// error is attached to the response; an unrecoverable fault (a panic
    /// anywhere in the body) forces the response to 500 with the fault
    /// message appended to the body. Neither escapes to the caller.
    pub async fn handle(self) -> DispatchResponse {
        let Self {
            valves,
            application,
            mut request,
            mut response,
        } = self;

        let outcome = AssertUnwindSafe(Self::run_chain(
            &valves,
            &application,
            &mut request,
            &mut response,
        ))
        .catch_unwind()
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(error = %e, path = %request.path(), "Dispatch recovered a stage error");
                response.set_error(e);
            }
            Err(fault) => {
                let message = fault_message(fault.as_ref());
                error!(
                    fault = %message,
                    path = %request.path(),
                    "Dispatch unit terminated by an unrecoverable fault"
                );
                response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                response.append_body(&message);
            }
        }

        response
    }

    /// The unit body: context setup, then the valve chain.
    async fn run_chain(
        valves: &[Arc<dyn Valve>],
        application: &Arc<dyn Application>,
        request: &mut DispatchRequest,
        response: &mut DispatchResponse,
    ) -> Result<()> {
        application.initialize()?;

        request.bind_application(Arc::clone(application));

        for valve in valves {
            valve.invoke(request, response).await?;
            if request.is_dispatched() {
                break;
            }
        }

        if let Some(profile) = application.profile_sink() {
            profile
                .with_component(PROFILE_COMPONENT)
                .debug(request.path());
        }

        Ok(())
    }

    /// Run the dispatch on its own task.
    #[must_use]
    pub fn spawn(self) -> RequestHandlerHandle {
        RequestHandlerHandle {
            handle: tokio::spawn(self.handle()),
        }
    }
}

/// Handle to a spawned dispatch unit.
pub struct RequestHandlerHandle {
    handle: JoinHandle<DispatchResponse>,
}

impl RequestHandlerHandle {
    /// Wait for the unit and take its finalized response.
    ///
    /// Always yields a well-formed response: if the unit's task could not be
    /// joined at all, a forced 500 response carries the join failure.
    pub async fn into_response(self) -> DispatchResponse {
        match self.handle.await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Dispatch unit task could not be joined");
                let mut response = DispatchResponse::new();
                response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                response.set_error(Error::dispatch_aborted(e.to_string()));
                response
            }
        }
    }
}

/// Extract a printable message from a caught panic payload.
fn fault_message(fault: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = fault.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = fault.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown fatal fault".to_string()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use http::Method;

    struct TestApplication;

    impl Application for TestApplication {
        fn name(&self) -> &str {
            "test-app"
        }

        fn initialize(&self) -> Result<()> {
            Ok(())
        }
    }

    struct AppendValve(&'static str);

    #[async_trait::async_trait]
    impl Valve for AppendValve {
        async fn invoke(
            &self,
            _request: &mut DispatchRequest,
            response: &mut DispatchResponse,
        ) -> Result<()> {
            response.append_body(self.0);
            Ok(())
        }
    }

    struct FailingApplication;

    impl Application for FailingApplication {
        fn name(&self) -> &str {
            "failing-app"
        }

        fn initialize(&self) -> Result<()> {
            Err(Error::application_init_failed("failing-app", "no loader"))
        }
    }

    #[tokio::test]
    async fn should_run_valves_in_chain_order() {
        let handler = RequestHandler::new(
            vec![Arc::new(AppendValve("a")), Arc::new(AppendValve("b"))],
            Arc::new(TestApplication),
            DispatchRequest::new(Method::GET, "/chain"),
            DispatchResponse::new(),
        );

        let response = handler.handle().await;

        assert_eq!(response.body(), "ab");
        assert!(!response.has_error());
    }

    #[tokio::test]
    async fn should_attach_application_init_failure_to_response() {
        let handler = RequestHandler::new(
            vec![Arc::new(AppendValve("never"))],
            Arc::new(FailingApplication),
            DispatchRequest::new(Method::GET, "/boot"),
            DispatchResponse::new(),
        );

        let response = handler.handle().await;

        assert!(response.has_error());
        // The valve chain never ran.
        assert_eq!(response.body(), "");
    }

    #[tokio::test]
    async fn should_return_response_through_spawned_task() {
        let handler = RequestHandler::new(
            vec![Arc::new(AppendValve("spawned"))],
            Arc::new(TestApplication),
            DispatchRequest::new(Method::GET, "/spawned"),
            DispatchResponse::new(),
        );

        let response = handler.spawn().into_response().await;

        assert_eq!(response.body(), "spawned");
    }
}
