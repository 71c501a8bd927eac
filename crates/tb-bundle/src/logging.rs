//! Logging setup for binaries and tests embedding the bundle codec.
//!
//! The library itself only emits `tracing` events. Hosts that have no
//! subscriber of their own can call [`init_logging`].
//!
//! Environment:
//! - `TB_LOG`: level (`trace`, `debug`, `info`, `warn`, `error`, `off`)
//! - `TB_LOG_FORMAT`: `human` or `jsonl`
//! - `RUST_LOG`: full filter directive, takes precedence over `TB_LOG`

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

const ENV_LOG_LEVEL: &str = "TB_LOG";
const ENV_LOG_FORMAT: &str = "TB_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {s}")),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Minimum level for `tb_bundle` and `tb_tenant` targets.
    pub level: LevelFilter,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
        }
    }
}

impl LogConfig {
    /// Read `TB_LOG` and `TB_LOG_FORMAT`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = LogConfig::default();

        if let Some(level) = lookup(ENV_LOG_LEVEL).and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT).and_then(|v| v.parse().ok()) {
            config.format = format;
        }

        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    fn filter_directive(&self) -> String {
        format!("tb_bundle={level},tb_tenant={level}", level = self.level)
    }
}

fn build_subscriber(config: &LogConfig, filter: EnvFilter) -> Box<dyn Subscriber + Send + Sync> {
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Human => Box::new(
            registry.with(fmt::layer().with_writer(std::io::stderr).with_target(false)),
        ),
        LogFormat::Jsonl => Box::new(registry.with(fmt::layer().json().with_writer(std::io::stderr))),
    }
}

/// Install a global subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed; calling this
/// more than once is harmless.
pub fn init_logging(config: &LogConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    tracing::subscriber::set_global_default(build_subscriber(config, filter)).is_ok()
}
