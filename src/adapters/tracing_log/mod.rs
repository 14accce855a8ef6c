// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::EnvFilter;

use crate::domain::errors::*;
use crate::ports::LogLevel;

/// Tracing log adapter
#[derive(Debug, Clone)]
pub struct TracingLogAdapter {
    level: Option<LogLevel>,
    json_output: bool,
}

impl TracingLogAdapter {
    /// Explicit level wins over `RUST_LOG`; `info` when neither is set
    pub fn new(level: Option<&str>, json_output: bool) -> Result<Self, DomainError> {
        let level = level.map(LogLevel::parse).transpose()?;
        Ok(Self { level, json_output })
    }

    pub fn filter(&self) -> EnvFilter {
        match self.level {
            Some(level) => EnvFilter::new(level.as_str()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }

    /// Install the global subscriber; a second call is a no-op.
    ///
    /// Logs go to stderr so command output on stdout stays machine readable.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr)
            .with_target(false);
        let _ = if self.json_output {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
    }
}
