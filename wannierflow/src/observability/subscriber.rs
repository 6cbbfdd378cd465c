//! Tracing subscriber setup and workflow spans.

use tracing::{info_span, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit one JSON object per line.
    pub json_format: bool,
    /// Include the module path of each event.
    pub with_target: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl TracingConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fallback filter.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switches to JSON output.
    #[must_use]
    pub fn with_json_format(mut self) -> Self {
        self.json_format = true;
        self
    }

    /// Builds the filter, preferring `RUST_LOG`.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let subscriber = tracing_subscriber::registry().with(config.env_filter());
    if config.json_format {
        subscriber
            .with(fmt::layer().json().with_target(config.with_target).with_line_number(true))
            .try_init()
    } else {
        subscriber.with(fmt::layer().with_target(config.with_target)).try_init()
    }
}

/// Span wrapping one stage of a run.
#[must_use]
pub fn stage_span(sequence: &str, run_id: &str, stage: &str, index: usize) -> Span {
    info_span!("stage", sequence = %sequence, run_id = %run_id, stage = %stage, index)
}
