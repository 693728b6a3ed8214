//! Tool-server connections and tool routing
//!
//! ```text
//! ToolInvoker ──find_tool_owner──▶ ToolConnectionRegistry
//!                                   │  connect / disconnect
//!                                   ▼
//!                              ToolConnector ──spawns──▶ ToolSession (one per server)
//! ```
//!
//! The registry owns every session; the invoker only borrows a handle
//! for the duration of one call.

mod backoff;
mod error;
mod invoker;
mod registry;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use backoff::{Backoff, FixedBackoff};
pub use error::{ToolError, ToolResult};
pub use invoker::ToolInvoker;
pub use registry::{ConnectOptions, ServerSummary, ToolConnection, ToolConnectionRegistry};
pub use session::{ToolConnector, ToolSession};
