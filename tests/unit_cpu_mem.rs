#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use synthetic_alloc::domain::{RampState, StatusBoard, MIB};
use synthetic_alloc::{CaptureReporter, Metrics, RampController, SharedBuffer, ThroughputMonitor};

fn monitor(buffer: &Arc<SharedBuffer>, reporter: &Arc<CaptureReporter>) -> ThroughputMonitor {
    ThroughputMonitor::new(
        Arc::clone(buffer),
        reporter.clone(),
        Metrics::new().expect("metrics"),
        StatusBoard::default(),
    )
    .with_window(Duration::from_millis(20))
    .with_pause(Duration::from_millis(10))
}

#[test]
fn monitor_idle_on_empty_buffer() {
    let buffer = Arc::new(SharedBuffer::new());
    let reporter = Arc::new(CaptureReporter::new());
    assert!(monitor(&buffer, &reporter).cycle().is_none());
    assert!(reporter.reports().is_empty());
}

#[test]
fn monitor_measures_sentinel_buffer() {
    let buffer = Arc::new(SharedBuffer::new());
    buffer.lock().resize(MIB).expect("resize");
    let reporter = Arc::new(CaptureReporter::new());
    let t = monitor(&buffer, &reporter).cycle().expect("measured");
    let cells = MIB / 4;
    assert_eq!(t.size_bytes, MIB);
    assert!(t.elapsed > Duration::from_millis(20));
    assert_eq!(t.operations % cells, 0);
    assert!(t.operations >= cells);
    #[allow(clippy::cast_precision_loss)]
    let pairs = (cells / 2) as f64;
    assert!((t.accumulator - pairs).abs() < f64::EPSILON);
    assert!(t.mflops() > 0.0);
}

#[tokio::test(start_paused = true)]
async fn monitor_run_reports_until_stopped() {
    let buffer = Arc::new(SharedBuffer::new());
    buffer.lock().resize(64 * 1024).expect("resize");
    let reporter = Arc::new(CaptureReporter::new());
    let m = monitor(&buffer, &reporter);
    let stop = m.stop_handle();
    let task = tokio::spawn(m.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    task.await.expect("join").expect("monitor");
    let cpu = reporter.throughput();
    assert!(!cpu.is_empty());
    assert!(cpu.iter().all(|(_, acc)| (*acc - 8192.0).abs() < f64::EPSILON));
}

#[tokio::test(start_paused = true)]
async fn ramp_tick_lands_on_endpoints() {
    let buffer = Arc::new(SharedBuffer::new());
    let reporter = Arc::new(CaptureReporter::new());
    let ramp = RampController::new(
        Arc::clone(&buffer),
        reporter,
        Metrics::new().expect("metrics"),
        StatusBoard::default(),
    );
    let state = RampState::new(0, 4 * MIB, 4);
    let start = tokio::time::Instant::now();
    let first = ramp.tick_once(state, start).await.expect("tick");
    assert_eq!(first.elapsed_secs, 0);
    assert_eq!(first.resize.size_bytes, 0);

    tokio::time::advance(Duration::from_secs(2)).await;
    let mid = ramp.tick_once(state, start).await.expect("tick");
    assert_eq!(mid.resize.size_bytes, 2 * MIB);
    assert_eq!(buffer.size_bytes(), 2 * MIB);

    tokio::time::advance(Duration::from_secs(10)).await;
    let last = ramp.tick_once(state, start).await.expect("tick");
    assert_eq!(last.elapsed_secs, 4);
    assert_eq!(last.resize.size_bytes, 4 * MIB);
    buffer.with_view(|v| {
        assert_eq!(v.cells.len() as u64, v.size_bytes / 4);
        assert!(v.cells.iter().all(|&c| (c - 1.0).abs() < f32::EPSILON));
    });
}

#[tokio::test]
async fn shutdown_mid_window_reports_nothing() {
    let buffer = Arc::new(SharedBuffer::new());
    buffer.lock().resize(64 * 1024).expect("resize");
    let reporter = Arc::new(CaptureReporter::new());
    let m = monitor(&buffer, &reporter).with_window(Duration::from_secs(60));
    let stop = m.stop_handle();
    let task = tokio::spawn(m.run());
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("monitor exits promptly")
        .expect("join")
        .expect("monitor");
    assert!(reporter.throughput().is_empty());
}
