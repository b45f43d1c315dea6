//! Valves: the ordered, short-circuitable stages of the dispatch pipeline.

use async_trait::async_trait;

use atrium_core::Result;

use super::request::DispatchRequest;
use super::response::DispatchResponse;

/// A single processing stage in a dispatch unit's chain.
///
/// Valves are stateless with respect to the core: the chain is supplied per
/// dispatch unit and each valve sees the unit's private request/response
/// pair. After every invocation the unit checks
/// [`DispatchRequest::is_dispatched`] and stops the chain once it is set.
///
/// An `Err` return is recovered at the unit boundary and attached to the
/// response; it never reaches the unit's owner.
#[async_trait]
pub trait Valve: Send + Sync {
    /// Process the request/response pair.
    ///
    /// # Errors
    ///
    /// Returns an error when the stage cannot process the request; the
    /// dispatch unit attaches it to the response as the terminal error.
    async fn invoke(
        &self,
        request: &mut DispatchRequest,
        response: &mut DispatchResponse,
    ) -> Result<()>;
}
