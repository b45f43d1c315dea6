//! Application capability and per-unit execution context.
//!
//! Every concurrent unit in the runtime (a request handler task, the timer
//! daemon) works on behalf of exactly one application. The application is
//! reached through the [`Application`] capability trait; the unit's own
//! identity travels in an explicit [`ExecutionContext`] value that is built
//! once at bootstrap and passed by reference, never looked up through
//! process-wide globals.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use atrium_core::Result;

/// Correlation identifier seeding a unit's session/request identity.
///
/// These are pure correlation tokens for log records and downstream
/// collaborators; they are not tied to any real HTTP session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Create a new unique correlation ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Optional profiling sink backed by `tracing`.
///
/// Records are tagged with a fixed component label so that a unit's
/// profiling output can be told apart from every other unit's.
#[derive(Debug, Clone)]
pub struct ProfileSink {
    component: String,
}

impl ProfileSink {
    /// Create an untagged sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            component: "profile".to_string(),
        }
    }

    /// Tag all subsequent records with the given component label.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = component.into();
        self
    }

    /// The current component label.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Emit a profiling record.
    pub fn debug(&self, message: impl AsRef<str>) {
        debug!(
            target: "atrium::profile",
            component = %self.component,
            "{}",
            message.as_ref()
        );
    }
}

impl Default for ProfileSink {
    fn default() -> Self {
        Self::new()
    }
}

/// The owning application, as seen by the runtime core.
///
/// The runtime never constructs applications; it receives one and asks it to
/// prepare the execution environment of each concurrent unit (the
/// class-loading and registry setup live behind [`Application::initialize`]).
pub trait Application: Send + Sync {
    /// The application name, used in log records.
    fn name(&self) -> &str;

    /// Prepare the per-unit execution environment.
    ///
    /// Called once per dispatch unit and once when the timer daemon
    /// bootstraps.
    ///
    /// # Errors
    ///
    /// Returns an error if the application's runtime environment cannot be
    /// set up; the calling unit converts this into its normal failure path.
    fn initialize(&self) -> Result<()>;

    /// The profiling sink, if profiling is enabled for this application.
    fn profile_sink(&self) -> Option<ProfileSink> {
        None
    }
}

/// Explicit per-unit execution context.
///
/// Built once when a background unit bootstraps and then threaded by
/// reference through every call that needs the owning application or the
/// unit's correlation identity. Session and request IDs are equal for
/// background units.
#[derive(Clone)]
pub struct ExecutionContext {
    application: Arc<dyn Application>,
    session_id: CorrelationId,
    request_id: CorrelationId,
}

impl ExecutionContext {
    /// Initialize the application and seed a fresh unit identity.
    ///
    /// # Errors
    ///
    /// Returns an error if [`Application::initialize`] fails.
    pub fn bootstrap(application: Arc<dyn Application>) -> Result<Self> {
        application.initialize()?;

        let session_id = CorrelationId::new();
        let request_id = session_id.clone();

        Ok(Self {
            application,
            session_id,
            request_id,
        })
    }

    /// The owning application.
    #[must_use]
    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    /// The session correlation ID.
    #[must_use]
    pub fn session_id(&self) -> &CorrelationId {
        &self.session_id
    }

    /// The request correlation ID.
    #[must_use]
    pub fn request_id(&self) -> &CorrelationId {
        &self.request_id
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("application", &self.application.name())
            .field("session_id", &self.session_id)
            .field("request_id", &self.request_id)
            .finish()
    }
}
