#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tokio::io::AsyncBufRead;
use tracing::{error, info};

use crate::buffer::SharedBuffer;
use crate::config::LoadConfig;
use crate::domain::{RunStatus, StatusBoard};
use crate::lib_cpu::ThroughputMonitor;
use crate::lib_mem::{RampController, RampSummary};
use crate::metrics::Metrics;
use crate::report::Reporter;
use crate::schedule::ScheduleReader;

/// Owns the shared state and drives both concurrent components.
#[derive(Clone)]
pub struct LoadRunner {
    buffer: Arc<SharedBuffer>,
    status: StatusBoard,
    metrics: Metrics,
    reporter: Arc<dyn Reporter>,
    config: LoadConfig,
    stop: Arc<AtomicBool>,
}

impl LoadRunner {
    pub fn new(config: LoadConfig, reporter: Arc<dyn Reporter>, metrics: Metrics) -> Self {
        Self {
            buffer: Arc::new(SharedBuffer::new()),
            status: StatusBoard::default(),
            metrics,
            reporter,
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn buffer(&self) -> Arc<SharedBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn status_board(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn status(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    pub fn ramp(&self) -> RampController {
        RampController::new(
            self.buffer(),
            Arc::clone(&self.reporter),
            self.metrics.clone(),
            self.status.clone(),
        )
        .with_tick(self.config.tick)
        .with_timeline(self.config.timeline)
    }

    pub fn monitor(&self) -> ThroughputMonitor {
        ThroughputMonitor::new(
            self.buffer(),
            Arc::clone(&self.reporter),
            self.metrics.clone(),
            self.status.clone(),
        )
        .with_window(self.config.window)
        .with_pause(self.config.pause)
        .with_stop(Arc::clone(&self.stop))
    }

    /// Asks the monitor to finish its current window and exit.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Runs the schedule with the monitor alongside. After the schedule is
    /// exhausted the monitor keeps measuring until [`Self::shutdown`]; a
    /// ramp failure stops it and is returned.
    pub async fn run<R: AsyncBufRead + Unpin>(
        &self,
        schedule: &mut ScheduleReader<R>,
    ) -> AnyResult<RampSummary> {
        let monitor = tokio::spawn(self.monitor().run());
        let summary = match self.ramp().run(schedule).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %format!("{e:#}"), "ramp controller failed");
                self.shutdown();
                return Err(e);
            }
        };
        info!(
            entries = summary.entries,
            final_bytes = summary.final_bytes,
            "schedule done, monitor keeps running"
        );
        monitor
            .await
            .context("throughput monitor task failed")??;
        Ok(summary)
    }
}
