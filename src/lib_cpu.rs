#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

//! Throughput monitor: measures multiply-accumulate rate over the live buffer.

use std::hint::black_box;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result as AnyResult};
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use crate::buffer::SharedBuffer;
use crate::domain::StatusBoard;
use crate::metrics::Metrics;
use crate::report::{Report, Reporter};

/// Outcome of one throughput window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Throughput {
    pub operations: u64,
    pub elapsed: Duration,
    pub accumulator: f64,
    pub size_bytes: u64,
}

impl Throughput {
    #[allow(clippy::cast_precision_loss)]
    pub fn mflops(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.operations as f64 / 1e6 / secs
        } else {
            0.0
        }
    }
}

/// One pass over `cells`: sums the products of the disjoint consecutive
/// pairs `(0,1), (2,3), ...`. A trailing odd cell is not read.
pub fn multiply_accumulate(cells: &[f32]) -> f64 {
    cells
        .chunks_exact(2)
        .fold(0.0, |acc, pair| acc + f64::from(pair[0] * pair[1]))
}

/// Floating-point operations of one pass: a multiply and an add per pair.
pub fn pass_operations(cells: usize) -> u64 {
    (cells / 2) as u64 * 2
}

/// Repeats full passes over `cells` until more than `window` has elapsed or
/// `stop` is raised. Always completes at least one pass. With fewer than two
/// cells every pass is empty and the loop spins for the whole window.
pub fn measure(cells: &[f32], size_bytes: u64, window: Duration, stop: &AtomicBool) -> Throughput {
    let start = Instant::now();
    let per_pass = pass_operations(cells.len());
    let mut operations = 0;
    loop {
        let accumulator = black_box(multiply_accumulate(black_box(cells)));
        operations += per_pass;
        let elapsed = start.elapsed();
        if elapsed > window || stop.load(Ordering::Relaxed) {
            return Throughput {
                operations,
                elapsed,
                accumulator,
                size_bytes,
            };
        }
    }
}

#[derive(Clone)]
pub struct ThroughputMonitor {
    buffer: Arc<SharedBuffer>,
    reporter: Arc<dyn Reporter>,
    metrics: Metrics,
    status: StatusBoard,
    window: Duration,
    pause: Duration,
    stop: Arc<AtomicBool>,
}

impl ThroughputMonitor {
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
            window: Duration::from_secs(4),
            pause: Duration::from_secs(1),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// One measurement with the lock held for the whole window. `None` when
    /// the buffer holds no whole pair of cells, which includes the empty
    /// buffer and sizes below 8 bytes.
    pub fn cycle(&self) -> Option<Throughput> {
        self.buffer.with_view(|view| {
            if view.cells.len() < 2 {
                return None;
            }
            Some(measure(view.cells, view.size_bytes, self.window, &self.stop))
        })
    }

    /// Measures, reports and pauses until the stop flag is raised.
    pub async fn run(self) -> AnyResult<()> {
        info!(window_ms = self.window.as_millis(), "throughput monitor started");
        while !self.stop.load(Ordering::Relaxed) {
            let this = self.clone();
            let measured = tokio::task::spawn_blocking(move || this.cycle())
                .await
                .context("throughput task failed")?;
            // a window cut short by shutdown is not a measurement
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            match measured {
                Some(t) => self.publish(&t),
                None => debug!("buffer empty, idle"),
            }
            sleep(self.pause).await;
        }
        info!("throughput monitor stopped");
        Ok(())
    }

    fn publish(&self, t: &Throughput) {
        let mflops = t.mflops();
        self.metrics.record_throughput(mflops);
        self.status.record_throughput(mflops);
        self.reporter.report(&Report::Throughput {
            mflops,
            accumulator: t.accumulator,
        });
        debug!(
            operations = t.operations,
            elapsed_ms = t.elapsed.as_millis(),
            size_bytes = t.size_bytes,
            mflops,
            "throughput window"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_disjoint() {
        let cells = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((multiply_accumulate(&cells) - 14.0).abs() < f64::EPSILON);
        assert_eq!(pass_operations(cells.len()), 4);
    }

    #[test]
    fn measure_runs_at_least_one_pass() {
        let cells = vec![1.0_f32; 1024];
        let stop = AtomicBool::new(true);
        let t = measure(&cells, 4096, Duration::from_secs(60), &stop);
        assert_eq!(t.operations, 1024);
        assert!((t.accumulator - 512.0).abs() < f64::EPSILON);
    }

    fn monitor_over(bytes: u64) -> ThroughputMonitor {
        let buffer = Arc::new(SharedBuffer::new());
        buffer.lock().resize(bytes).expect("resize");
        ThroughputMonitor::new(
            buffer,
            Arc::new(crate::report::CaptureReporter::new()),
            Metrics::new().expect("metrics"),
            StatusBoard::default(),
        )
        .with_window(Duration::from_secs(60))
    }

    #[test]
    fn sub_pair_buffer_is_idle() {
        for bytes in [1, 3, 4, 7] {
            assert!(monitor_over(bytes).cycle().is_none(), "{bytes} bytes");
        }
        let m = monitor_over(8);
        m.stop_handle().store(true, Ordering::Relaxed);
        let t = m.cycle().expect("one pair");
        assert_eq!(t.operations, 2);
    }
}
