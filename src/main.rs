#![forbid(unsafe_code)]
#![deny(warnings)]
#![warn(clippy::pedantic)]

use std::sync::Arc;

use clap::Parser;
use synthetic_alloc::{serve, AppState, Cli, ConsoleReporter, LoadRunner, LogFormat, Metrics};
use tracing::{error, info};

fn init_tracing(format: LogFormat) {
    let fmt = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => fmt.json().init(),
        LogFormat::Text => fmt.init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    let config = cli.into_config()?;
    info!(window_ms = config.window.as_millis(), tick_ms = config.tick.as_millis(), timeline = %config.timeline, "starting synthetic-alloc");

    let metrics = Metrics::new()?;
    let runner = LoadRunner::new(config.clone(), Arc::new(ConsoleReporter), metrics.clone());
    let mut schedule = synthetic_alloc::schedule::open(config.schedule.as_deref()).await?;

    let server = match &config.metrics_bind {
        Some(bind) => {
            let state = AppState {
                status: runner.status_board(),
                metrics,
            };
            Some(serve(bind, state)?)
        }
        None => None,
    };
    let server = async move {
        match server {
            Some(server) => server.await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        res = runner.run(&mut schedule) => {
            if let Err(e) = res {
                error!(error = %format!("{e:#}"), "fatal");
                return Err(e.into());
            }
        }
        res = server => {
            res?;
        }
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("interrupted, shutting down");
        }
    }
    runner.shutdown();
    Ok(())
}
