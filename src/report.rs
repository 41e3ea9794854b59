#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::io::Write;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::domain::MIB;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Memory { bytes: u64 },
    Throughput { mflops: f64, accumulator: f64 },
}

impl Report {
    pub fn memory_mb(&self) -> Option<u64> {
        match self {
            Report::Memory { bytes } => Some(bytes / MIB),
            Report::Throughput { .. } => None,
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::Memory { bytes } => write!(f, "MEM: {} MB", bytes / MIB),
            Report::Throughput {
                mflops,
                accumulator,
            } => write!(f, "CPU: {mflops:.3} MFLOPS {accumulator}"),
        }
    }
}

pub fn format_line(at: &DateTime<Local>, report: &Report) -> String {
    format!("{} {report}", at.format(TIMESTAMP_FORMAT))
}

pub trait Reporter: Send + Sync {
    fn report(&self, report: &Report);
}

/// Timestamped lines on stdout.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, report: &Report) {
        let line = format_line(&Local::now(), report);
        debug!(line = %line, "report");
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %e, "write report failed");
        }
    }
}

/// Keeps every report in memory, in emission order.
#[derive(Debug, Default)]
pub struct CaptureReporter {
    reports: Mutex<Vec<Report>>,
}

impl CaptureReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn memory_mb(&self) -> Vec<u64> {
        self.reports
            .lock()
            .iter()
            .filter_map(Report::memory_mb)
            .collect()
    }

    pub fn throughput(&self) -> Vec<(f64, f64)> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Throughput {
                    mflops,
                    accumulator,
                } => Some((*mflops, *accumulator)),
                Report::Memory { .. } => None,
            })
            .collect()
    }
}

impl Reporter for CaptureReporter {
    fn report(&self, report: &Report) {
        self.reports.lock().push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn memory_line_truncates_to_whole_mb() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).single().expect("time");
        let line = format_line(&at, &Report::Memory { bytes: 31 * MIB - 1 });
        assert_eq!(line, "2024-03-09 07:05:01 MEM: 30 MB");
    }

    #[test]
    fn throughput_line_shape() {
        let r = Report::Throughput {
            mflops: 1234.5,
            accumulator: 131_072.0,
        };
        assert_eq!(r.to_string(), "CPU: 1234.500 MFLOPS 131072");
    }
}
