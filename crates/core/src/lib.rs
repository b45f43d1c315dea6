//! Core error and result types shared across the Atrium runtime.
//!
//! Every fallible operation in the runtime crates returns
//! [`Result`]; the binary layers `anyhow` on top for startup context.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::{Result, ResultExt};
