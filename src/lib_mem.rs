#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Ramp controller: drives the shared buffer along the schedule.

use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use tokio::io::AsyncBufRead;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use crate::buffer::{Resize, SharedBuffer};
use crate::domain::{RampState, ScheduleEntry, StatusBoard, Timeline};
use crate::metrics::Metrics;
use crate::report::{Report, Reporter};
use crate::schedule::ScheduleReader;

/// One sample of the ramp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub elapsed_secs: u64,
    pub resize: Resize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RampSummary {
    pub entries: usize,
    pub ticks: u64,
    pub final_bytes: u64,
}

#[derive(Clone)]
pub struct RampController {
    buffer: Arc<SharedBuffer>,
    reporter: Arc<dyn Reporter>,
    metrics: Metrics,
    status: StatusBoard,
    tick: Duration,
    timeline: Timeline,
}

impl RampController {
    pub fn new(
        buffer: Arc<SharedBuffer>,
        reporter: Arc<dyn Reporter>,
        metrics: Metrics,
        status: StatusBoard,
    ) -> Self {
        Self {
            buffer,
            reporter,
            metrics,
            status,
            tick: Duration::from_secs(1),
            timeline: Timeline::Relative,
        }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }

    /// Ramps through every entry of `schedule`, in order. Returns once the
    /// schedule is exhausted; a failed allocation aborts the run.
    pub async fn run<R: AsyncBufRead + Unpin>(
        &self,
        schedule: &mut ScheduleReader<R>,
    ) -> AnyResult<RampSummary> {
        let origin = Instant::now();
        let mut scheduled = Duration::ZERO;
        let mut summary = RampSummary::default();
        while let Some(entry) = schedule.next_entry().await? {
            let ramp = RampState::new(
                summary.final_bytes,
                entry.target_bytes(),
                entry.duration_secs,
            );
            let start = match self.timeline {
                Timeline::Relative => Instant::now(),
                Timeline::Cumulative => origin + scheduled,
            };
            info!(index = summary.entries, entry = %entry, baseline_bytes = ramp.baseline_bytes, "schedule entry");
            self.status.begin_entry(summary.entries, ramp.target_bytes);
            self.metrics.record_entry_target(ramp.target_bytes);

            summary.ticks += self.run_entry(&entry, ramp, start).await?;

            summary.final_bytes = ramp.target_bytes;
            summary.entries += 1;
            scheduled += Duration::from_secs(ramp.duration_secs);
            self.status.finish_entry();
            self.metrics.schedule_entries_total.inc();
        }
        self.status.mark_exhausted();
        info!(entries = summary.entries, final_bytes = summary.final_bytes, "schedule exhausted");
        Ok(summary)
    }

    async fn run_entry(&self, entry: &ScheduleEntry, ramp: RampState, start: Instant) -> AnyResult<u64> {
        let mut ticks = 0;
        loop {
            let tick = self.tick_once(ramp, start).await?;
            ticks += 1;
            let size_bytes = tick.resize.size_bytes;
            self.metrics.record_tick(size_bytes);
            self.status.set_buffer_bytes(size_bytes);
            self.reporter.report(&Report::Memory { bytes: size_bytes });
            debug!(
                elapsed = tick.elapsed_secs,
                size_bytes,
                initialized_cells = tick.resize.initialized_cells,
                "ramp tick"
            );
            if ramp.is_complete(tick.elapsed_secs) {
                debug!(entry = %entry, ticks, "entry complete");
                return Ok(ticks);
            }
            sleep(self.tick).await;
        }
    }

    /// Samples the ramp and resizes the buffer under one lock acquisition.
    /// The elapsed time is read after the lock is taken, so a long monitor
    /// scan delays the sample instead of making it stale.
    pub async fn tick_once(&self, ramp: RampState, start: Instant) -> AnyResult<Tick> {
        let buffer = Arc::clone(&self.buffer);
        tokio::task::spawn_blocking(move || -> AnyResult<Tick> {
            let mut guard = buffer.lock();
            let elapsed_secs = ramp.elapsed_secs(Instant::now().saturating_duration_since(start));
            let resize = guard.resize(ramp.size_at(elapsed_secs))?;
            Ok(Tick {
                elapsed_secs,
                resize,
            })
        })
        .await
        .context("ramp tick task failed")?
    }
}
