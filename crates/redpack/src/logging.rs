//! Logging utilities, available with the `logging` feature.
//!
//! As a library, redpack only emits `tracing` events - install your own
//! subscriber. Applications embedding the orchestrator can use these
//! convenience initializers instead.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log level for redpack output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// No logging output.
    Silent,
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and info (default).
    #[default]
    Info,
    /// All logs including debug.
    Debug,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {other}")),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter())
    }
}

/// Initialize redpack logging at the given level.
///
/// Installs a global subscriber; only the first call per process takes
/// effect.
pub fn init_logging(level: LogLevel) {
    init_with_filter(
        EnvFilter::builder()
            .with_default_directive(level.as_filter().parse().expect("static filter directive"))
            .from_env_lossy(),
    );
}

/// Initialize logging from the `RUST_LOG` environment variable, falling back
/// to `info`.
pub fn init_logging_from_env() {
    init_with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(LogLevel::Info.as_filter().parse().expect("static filter directive"))
            .from_env_lossy()
    }));
}

fn init_with_filter(filter: EnvFilter) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false).without_time())
            .init();
    });
}
