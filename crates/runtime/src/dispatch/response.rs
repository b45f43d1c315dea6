//! The response side of a dispatch unit.

use http::StatusCode;

use atrium_core::Error;

/// The response produced by one dispatch unit.
///
/// Always well-formed: whichever failure path a dispatch takes, the owner
/// receives a response with a status, a body and - for recovered stage
/// errors - the terminal error attached for upstream translation.
pub struct DispatchResponse {
    status: StatusCode,
    body: String,
    error: Option<Error>,
}

impl DispatchResponse {
    /// Create an empty 200 response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            body: String::new(),
            error: None,
        }
    }

    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Set the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Append to the body stream.
    pub fn append_body(&mut self, chunk: &str) {
        self.body.push_str(chunk);
    }

    /// The body accumulated so far.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Attach the terminal error recovered at the unit boundary.
    pub fn set_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    /// The attached terminal error, if the dispatch recovered one.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Whether a terminal error is attached.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

impl Default for DispatchResponse {
    fn default() -> Self {
        Self::new()
    }
}
