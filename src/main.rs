use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use tokio_native_tls::TlsConnector as TokioTlsConnector;

use idleprobe::config::model::{ProbeArgs, ProbeConfig};
use idleprobe::http_probe::prelude::*;

// Trials must run strictly one after another, so a single-threaded runtime
// is all this needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("debug")).init();

    let args = ProbeArgs::parse();
    let config = ProbeConfig::from_args(&args)?;

    // Anything a trial could not recover from is checked here, before the
    // first connection is opened.
    build_request(&config).context("unable to construct request")?;
    let connector = TokioTlsConnector::from(
        native_tls::TlsConnector::new().context("unable to build tls connector")?,
    );

    match config.keepalive {
        Some(interval) => info!(
            "probing {} with a keepalive write every {}s",
            config.target,
            interval.as_secs()
        ),
        None => info!("probing {} without keepalives", config.target),
    }

    for wait in config.schedule() {
        match run_trial(&config, &connector, Duration::from_secs(wait)).await {
            TrialOutcome::Success { bytes } => {
                debug!("at {wait}s, read response of size: {bytes}")
            }
            TrialOutcome::RequestError(err) | TrialOutcome::ReadError(err) => {
                debug!("at {wait}s, {}", report(&err))
            }
        }
    }

    Ok(())
}
