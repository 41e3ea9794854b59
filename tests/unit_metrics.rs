#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use synthetic_alloc::metrics::Metrics;

#[test]
fn create_and_encode() {
    let m = Metrics::new().expect("metrics");
    let buf = m.encode_text().expect("encode");
    assert!(!buf.is_empty());
}

#[test]
fn records_ticks_and_throughput() {
    let m = Metrics::new().expect("metrics");
    m.record_tick(3 * 1024 * 1024);
    m.record_tick(4 * 1024 * 1024);
    m.record_throughput(12.5);
    assert_eq!(m.buffer_bytes.get(), 4 * 1024 * 1024);
    assert_eq!(m.ramp_ticks_total.get(), 2);
    assert_eq!(m.monitor_cycles_total.get(), 1);
    let text = String::from_utf8(m.encode_text().expect("encode")).expect("utf8");
    assert!(text.contains("synthetic_alloc_throughput_mflops 12.5"));
}
