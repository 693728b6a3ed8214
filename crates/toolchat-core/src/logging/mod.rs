//! Logging abstractions for runtime-agnostic logging

mod traits;
mod noop;
mod memory;
mod tracing_logger;

pub use traits::{LogLevel, Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use memory::MemoryLogger;
pub use tracing_logger::{init_tracing, TracingLogger};
