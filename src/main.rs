use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use asset_tag_reader::bluetooth::BluerLink;
use asset_tag_reader::utils::summarize;
use asset_tag_reader::{ReaderConfig, SessionHandle, SessionRuntime, TelemetryStore};

/// Log the latest reading of every tag seen so far
fn log_summary(store: &TelemetryStore) {
    let summaries = summarize(&store.snapshot());

    // Warning if no data collected
    if summaries.is_empty() {
        warn!("No asset tags seen yet!");
        return;
    }

    for summary in summaries {
        info!(
            "Summary for {} ({}):",
            summary.address, summary.latest.device_id
        );
        info!(
            "  Based on {} samples, {} in low power mode",
            summary.samples, summary.low_power_samples
        );
        info!("  Latest: {}", summary.latest);
    }
}

fn spawn_summary(store: TelemetryStore, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            log_summary(&store);
        }
    })
}

fn spawn_stop_listener(handle: SessionHandle) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Program terminated by user. Stopping session...");
        handle.stop();
    });
}

#[cfg(unix)]
fn spawn_reset_listener(handle: SessionHandle) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut requests = match signal(SignalKind::user_defined1()) {
            Ok(requests) => requests,
            Err(e) => {
                warn!("Failed to listen for SIGUSR1, operator resets disabled: {}", e);
                return;
            }
        };
        while requests.recv().await.is_some() {
            if let Err(e) = handle.reset().await {
                error!("Failed to reset device: {}", e);
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reset_listener(_handle: SessionHandle) {}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging; RUST_LOG overrides the default level
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match ReaderConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let link = Arc::new(BluerLink::new(config.adapter.clone()));
    let runtime = SessionRuntime::new(link, config.session.clone());

    spawn_stop_listener(runtime.handle());
    spawn_reset_listener(runtime.handle());
    let summary = config
        .summary_interval
        .map(|every| spawn_summary(runtime.store().clone(), every));

    let result = runtime.run().await;

    if let Some(summary) = summary {
        summary.abort();
    }
    log_summary(runtime.store());

    match result {
        Ok(()) => {
            info!("Program completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
