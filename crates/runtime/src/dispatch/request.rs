//! The request side of a dispatch unit.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use crate::context::Application;

/// A request flowing through one dispatch unit's valve chain.
///
/// The pair of request and response belongs to exactly one
/// [`RequestHandler`](crate::dispatch::RequestHandler) for its entire
/// lifetime; valves receive both mutably and may read or write either.
pub struct DispatchRequest {
    method: Method,
    path: String,
    attributes: HashMap<String, String>,
    dispatched: bool,
    application: Option<Arc<dyn Application>>,
}

impl DispatchRequest {
    /// Create a request for the given method and target path.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            attributes: HashMap::new(),
            dispatched: false,
            application: None,
        }
    }

    /// Add an attribute, builder-style.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read an attribute set by an earlier valve or the owner.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute for later valves.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Mark the request as dispatched, halting further valve execution.
    pub fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }

    /// Whether a valve has marked this request dispatched.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    /// Bind the application context into the request.
    pub fn bind_application(&mut self, application: Arc<dyn Application>) {
        self.application = Some(application);
    }

    /// The bound application context, if the unit has bound one.
    #[must_use]
    pub fn application(&self) -> Option<&Arc<dyn Application>> {
        self.application.as_ref()
    }
}
