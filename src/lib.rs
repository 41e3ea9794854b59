#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

pub mod buffer;
pub mod config;
pub mod domain;
pub mod http;
pub mod lib_cpu;
pub mod lib_mem;
pub mod metrics;
pub mod report;
pub mod schedule;
pub mod service;
pub mod validation;

pub use buffer::{BufferView, SharedBuffer};
pub use config::{Cli, LoadConfig, LogFormat};
pub use domain::{interpolate, RampState, RunStatus, ScheduleEntry, StatusBoard, Timeline};
pub use http::{healthz, scrape_metrics, serve, status, AppState};
pub use lib_cpu::{Throughput, ThroughputMonitor};
pub use lib_mem::{RampController, RampSummary};
pub use metrics::Metrics;
pub use report::{CaptureReporter, ConsoleReporter, Report, Reporter};
pub use schedule::ScheduleReader;
pub use service::LoadRunner;
pub use validation::validate_config;
