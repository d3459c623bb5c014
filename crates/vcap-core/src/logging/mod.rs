//! Structured logging for vcap.
//!
//! - stdout is reserved for command payloads (snapshot JSON)
//! - stderr receives all log output, human-readable or JSON lines
//! - each CLI invocation carries a `run_id` for correlation

pub mod config;

pub use config::{LogConfig, LogFormat};

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for the vcap crates at `level`.
pub fn filter_directive(level: LevelFilter) -> String {
    let level = level.to_string().to_ascii_lowercase();
    format!("vcap_core={level},vcap={level}")
}

/// Initialize the logging subsystem.
///
/// Must be called once at startup. `RUST_LOG`, when set, replaces the
/// computed filter entirely.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.level)));

    match config.format {
        LogFormat::Human => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Jsonl => {
            let json_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    format!("run-{}", &uuid.simple().to_string()[..12])
}
