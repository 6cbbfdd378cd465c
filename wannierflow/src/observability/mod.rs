//! Logging setup for binaries and tests embedding the workflow.

mod subscriber;

pub use subscriber::{init_tracing, stage_span, TracingConfig};
