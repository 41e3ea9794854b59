#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Bytes per schedule megabyte.
pub const MIB: u64 = 1024 * 1024;

/// Size in bytes of one numeric cell of the shared buffer.
pub const CELL_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Value written into every newly exposed cell.
pub const SENTINEL: f32 = 1.0;

/// One `<size_MB> <duration_seconds>` pair of the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub size_mb: u64,
    pub duration_secs: u64,
}

impl ScheduleEntry {
    pub fn new(size_mb: i64, duration_secs: i64) -> AnyResult<Self> {
        if size_mb < 0 {
            bail!("size must be >= 0 MB, got {size_mb}");
        }
        let size_mb = size_mb.unsigned_abs();
        if size_mb.checked_mul(MIB).is_none() {
            bail!("size of {size_mb} MB overflows the addressable range");
        }
        // durations below one second collapse to one second
        let duration_secs = u64::try_from(duration_secs.max(1)).unwrap_or(1);
        Ok(Self {
            size_mb,
            duration_secs,
        })
    }

    pub fn target_bytes(&self) -> u64 {
        self.size_mb.saturating_mul(MIB)
    }
}

impl std::fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} MB over {}s", self.size_mb, self.duration_secs)
    }
}

/// Linear ramp from `baseline_bytes` to `target_bytes` over `duration_secs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RampState {
    pub baseline_bytes: u64,
    pub target_bytes: u64,
    pub duration_secs: u64,
}

impl RampState {
    pub fn new(baseline_bytes: u64, target_bytes: u64, duration_secs: u64) -> Self {
        Self {
            baseline_bytes,
            target_bytes,
            duration_secs: duration_secs.max(1),
        }
    }

    /// Whole seconds into the ramp, clamped to its duration.
    pub fn elapsed_secs(&self, since_start: Duration) -> u64 {
        since_start.as_secs().min(self.duration_secs)
    }

    pub fn size_at(&self, elapsed_secs: u64) -> u64 {
        interpolate(
            self.baseline_bytes,
            self.target_bytes,
            elapsed_secs,
            self.duration_secs,
        )
    }

    pub fn is_complete(&self, elapsed_secs: u64) -> bool {
        elapsed_secs >= self.duration_secs
    }
}

/// Size at `elapsed` seconds of a linear blend from `previous` to `target`
/// over `duration` seconds.
///
/// Evaluated as `(target*e + previous*d - previous*e) / d` in `i128`, so no
/// intermediate term can wrap. Division truncates toward zero; both endpoints
/// are exact.
pub fn interpolate(previous: u64, target: u64, elapsed: u64, duration: u64) -> u64 {
    let d = i128::from(duration.max(1));
    let e = i128::from(elapsed).min(d);
    let p = i128::from(previous);
    let t = i128::from(target);
    let size = (t * e + p * d - p * e) / d;
    // the blend never leaves [min(p, t), max(p, t)]
    u64::try_from(size).unwrap_or(target)
}

/// How the start instant of each schedule entry is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    /// Each entry starts when the previous one finished ticking.
    #[default]
    Relative,
    /// Each entry starts at the sum of all previous durations, so lock
    /// contention never accumulates drift.
    Cumulative,
}

impl std::fmt::Display for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timeline::Relative => f.write_str("relative"),
            Timeline::Cumulative => f.write_str("cumulative"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub buffer_bytes: u64,
    pub target_bytes: u64,
    pub entry_index: Option<usize>,
    pub entries_completed: usize,
    pub schedule_exhausted: bool,
    pub last_mflops: Option<f64>,
    pub monitor_cycles: u64,
}

impl RunStatus {
    pub fn buffer_mb(&self) -> u64 {
        self.buffer_bytes / MIB
    }
}

/// Observable progress of a run, shared with the status endpoint.
#[derive(Clone, Default)]
pub struct StatusBoard {
    pub state: Arc<Mutex<RunStatus>>,
}

impl StatusBoard {
    pub fn snapshot(&self) -> RunStatus {
        self.state.lock().clone()
    }

    pub fn begin_entry(&self, index: usize, target_bytes: u64) {
        let mut st = self.state.lock();
        st.entry_index = Some(index);
        st.target_bytes = target_bytes;
    }

    pub fn set_buffer_bytes(&self, bytes: u64) {
        self.state.lock().buffer_bytes = bytes;
    }

    pub fn finish_entry(&self) {
        self.state.lock().entries_completed += 1;
    }

    pub fn mark_exhausted(&self) {
        let mut st = self.state.lock();
        st.entry_index = None;
        st.schedule_exhausted = true;
    }

    pub fn record_throughput(&self, mflops: f64) {
        let mut st = self.state.lock();
        st.last_mflops = Some(mflops);
        st.monitor_cycles += 1;
    }
}
