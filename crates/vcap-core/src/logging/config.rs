//! Logging configuration.
//!
//! Resolved from `VCAP_LOG` and `VCAP_LOG_FORMAT`, then overridden by the
//! CLI flags (`-v`, `-q`, `--log-format`). `RUST_LOG` is handled by the
//! subscriber itself and replaces the computed filter.

use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;

/// Level variable.
pub const ENV_LOG_LEVEL: &str = "VCAP_LOG";

/// Format variable.
pub const ENV_LOG_FORMAT: &str = "VCAP_LOG_FORMAT";

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format '{}' (expected human or jsonl)", s)),
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
        }
    }
}

impl LogConfig {
    /// Read the environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LevelFilter>, cli_format: Option<LogFormat>) -> Self {
        let level = std::env::var(ENV_LOG_LEVEL).ok();
        let format = std::env::var(ENV_LOG_FORMAT).ok();
        Self::resolve(level.as_deref(), format.as_deref(), cli_level, cli_format)
    }

    /// Unparseable environment values are ignored.
    fn resolve(
        env_level: Option<&str>,
        env_format: Option<&str>,
        cli_level: Option<LevelFilter>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let defaults = LogConfig::default();
        let level = cli_level
            .or_else(|| env_level.and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.level);
        let format = cli_format
            .or_else(|| env_format.and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.format);
        LogConfig { format, level }
    }
}
