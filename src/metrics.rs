#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{Context, Result as AnyResult};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub buffer_bytes: IntGauge,
    pub target_bytes: IntGauge,
    pub throughput_mflops: Gauge,
    pub ramp_ticks_total: IntCounter,
    pub monitor_cycles_total: IntCounter,
    pub schedule_entries_total: IntCounter,
}

impl Metrics {
    pub fn new() -> AnyResult<Self> {
        let registry = Registry::new();
        let buffer_bytes = IntGauge::with_opts(Opts::new(
            "synthetic_alloc_buffer_bytes",
            "current size of the shared buffer",
        ))
        .context("create buffer_bytes")?;
        let target_bytes = IntGauge::with_opts(Opts::new(
            "synthetic_alloc_target_bytes",
            "target size of the active schedule entry",
        ))
        .context("create target_bytes")?;
        let throughput_mflops = Gauge::with_opts(Opts::new(
            "synthetic_alloc_throughput_mflops",
            "last measured throughput",
        ))
        .context("create throughput_mflops")?;
        registry
            .register(Box::new(buffer_bytes.clone()))
            .context("register buffer_bytes")?;
        registry
            .register(Box::new(target_bytes.clone()))
            .context("register target_bytes")?;
        registry
            .register(Box::new(throughput_mflops.clone()))
            .context("register throughput_mflops")?;
        let ramp_ticks_total = IntCounter::with_opts(Opts::new(
            "synthetic_alloc_ramp_ticks_total",
            "ramp controller ticks",
        ))
        .context("create ramp_ticks_total")?;
        let monitor_cycles_total = IntCounter::with_opts(Opts::new(
            "synthetic_alloc_monitor_cycles_total",
            "completed throughput windows",
        ))
        .context("create monitor_cycles_total")?;
        let schedule_entries_total = IntCounter::with_opts(Opts::new(
            "synthetic_alloc_schedule_entries_total",
            "schedule entries ramped to completion",
        ))
        .context("create schedule_entries_total")?;
        registry
            .register(Box::new(ramp_ticks_total.clone()))
            .context("register ramp_ticks_total")?;
        registry
            .register(Box::new(monitor_cycles_total.clone()))
            .context("register monitor_cycles_total")?;
        registry
            .register(Box::new(schedule_entries_total.clone()))
            .context("register schedule_entries_total")?;
        Ok(Self {
            registry,
            buffer_bytes,
            target_bytes,
            throughput_mflops,
            ramp_ticks_total,
            monitor_cycles_total,
            schedule_entries_total,
        })
    }

    pub fn record_tick(&self, size_bytes: u64) {
        self.buffer_bytes.set(i64::try_from(size_bytes).unwrap_or(i64::MAX));
        self.ramp_ticks_total.inc();
    }

    pub fn record_entry_target(&self, target_bytes: u64) {
        self.target_bytes
            .set(i64::try_from(target_bytes).unwrap_or(i64::MAX));
    }

    pub fn record_throughput(&self, mflops: f64) {
        self.throughput_mflops.set(mflops);
        self.monitor_cycles_total.inc();
    }

    pub fn encode_text(&self) -> AnyResult<Vec<u8>> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf).context("encode metrics")?;
        Ok(buf)
    }
}
