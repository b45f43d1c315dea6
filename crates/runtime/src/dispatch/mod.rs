//! Request dispatch: one transient unit per inbound request.
//!
//! A [`RequestHandler`] consumes an externally-supplied ordered chain of
//! [`Valve`] stages together with the request/response pair, runs the chain
//! (stopping early once the request is marked dispatched) and hands a
//! finalized [`DispatchResponse`] back to its owner - whatever failed on the
//! way.

mod handler;
mod request;
mod response;
mod valve;

pub use handler::{RequestHandler, RequestHandlerHandle};
pub use request::DispatchRequest;
pub use response::DispatchResponse;
pub use valve::Valve;
