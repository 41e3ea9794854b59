#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use anyhow::{bail, Result as AnyResult};
use crate::config::LoadConfig;

pub fn validate_config(cfg: &LoadConfig) -> AnyResult<()> {
    if cfg.window.is_zero() { bail!("throughput window must be > 0"); }
    if cfg.tick.is_zero() { bail!("ramp tick must be > 0"); }
    if let Some(bind) = &cfg.metrics_bind {
        if bind.trim().is_empty() { bail!("metrics bind address is empty"); }
    }
    Ok(())
}
