//! Domain types for the orchestration system
//!
//! Messages, function-call descriptors and typed assistant results.

mod message;
mod response;
mod tool_call;

pub use message::*;
pub use response::*;
pub use tool_call::*;
