#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result as AnyResult;
use clap::{Parser, ValueEnum};

use crate::domain::Timeline;
use crate::validation::validate_config;

/// Ramp memory along a schedule of `<size_MB> <seconds>` pairs while
/// reporting FLOPS measured over the allocated buffer.
#[derive(Parser, Debug)]
#[command(name = "synthetic-alloc")]
#[command(version, about)]
pub struct Cli {
    /// Schedule file (stdin when omitted)
    pub schedule: Option<PathBuf>,

    /// Throughput measurement window in milliseconds
    #[arg(long, env = "SYNTHETIC_ALLOC_WINDOW_MS", default_value_t = 4000)]
    pub window_ms: u64,

    /// Monitor pause between windows in milliseconds
    #[arg(long, env = "SYNTHETIC_ALLOC_PAUSE_MS", default_value_t = 1000)]
    pub pause_ms: u64,

    /// Ramp sampling interval in milliseconds
    #[arg(long, env = "SYNTHETIC_ALLOC_TICK_MS", default_value_t = 1000)]
    pub tick_ms: u64,

    /// How schedule entries are anchored in time
    #[arg(long, value_enum, env = "SYNTHETIC_ALLOC_TIMELINE", default_value_t = Timeline::Relative)]
    pub timeline: Timeline,

    /// Serve /healthz, /metrics and /status on this address
    #[arg(long, env = "SYNTHETIC_ALLOC_METRICS_BIND")]
    pub metrics_bind: Option<String>,

    /// Diagnostic log format (stderr)
    #[arg(long, value_enum, env = "SYNTHETIC_ALLOC_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Json => f.write_str("json"),
            LogFormat::Text => f.write_str("text"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadConfig {
    pub schedule: Option<PathBuf>,
    pub window: Duration,
    pub pause: Duration,
    pub tick: Duration,
    pub timeline: Timeline,
    pub metrics_bind: Option<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            schedule: None,
            window: Duration::from_secs(4),
            pause: Duration::from_secs(1),
            tick: Duration::from_secs(1),
            timeline: Timeline::Relative,
            metrics_bind: None,
        }
    }
}

impl Cli {
    pub fn into_config(self) -> AnyResult<LoadConfig> {
        let cfg = LoadConfig {
            schedule: self.schedule,
            window: Duration::from_millis(self.window_ms),
            pause: Duration::from_millis(self.pause_ms),
            tick: Duration::from_millis(self.tick_ms),
            timeline: self.timeline,
            metrics_bind: self.metrics_bind,
        };
        validate_config(&cfg)?;
        Ok(cfg)
    }
}
