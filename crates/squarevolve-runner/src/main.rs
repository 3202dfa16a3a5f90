//! Headless SquaRevolve host: runs the frame loop, reports stats and reads
//! control commands from stdin.

mod console;
mod host;
mod report;
mod telemetry;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use squarevolve_core::RunnerConfig;
use squarevolve_world::Simulation;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing::{error, info};

const CONFIG_ENV: &str = "SQUAREVOLVE_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry()?;

    let config = load_config()?;
    let sim = Simulation::new(config.simulation.clone())?;
    let (width, height) = sim.grid_dimensions();
    info!(
        run_id = %sim.run_id(),
        grid_width = width,
        grid_height = height,
        target_fps = config.target_fps,
        "Starting SquaRevolve runner"
    );
    let sim = Arc::new(Mutex::new(sim));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (command_tx, command_rx) = mpsc::channel(64);
    console::spawn_stdin_reader(command_tx);

    let mut frame_handle = tokio::spawn(host::run_frame_loop(
        sim.clone(),
        command_rx,
        config.clone(),
        shutdown_rx.clone(),
    ));
    let stats_handle = tokio::spawn(host::run_stats_loop(
        sim.clone(),
        config.stats_interval_ms,
        shutdown_rx,
    ));

    let frame_loop_done = tokio::select! {
        _ = shutdown_signal() => false,
        result = &mut frame_handle => {
            if let Err(e) = result {
                error!("Frame loop failed: {}", e);
            }
            true
        }
    };

    info!("Shutting down runner");
    let _ = shutdown_tx.send(true);

    let mut handles = vec![stats_handle];
    if !frame_loop_done {
        handles.push(frame_handle);
    }

    let timeout = tokio::time::sleep(Duration::from_secs(5));
    tokio::pin!(timeout);

    tokio::select! {
        _ = futures::future::join_all(handles) => {
            info!("All host tasks completed");
        }
        _ = &mut timeout => {
            info!("Shutdown timeout reached");
        }
    }

    report::print_report(sim.lock().stats());
    Ok(())
}

/// Defaults, overridden by the JSON file named in `SQUAREVOLVE_CONFIG`
fn load_config() -> Result<RunnerConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            let config = RunnerConfig::from_json(&json)
                .with_context(|| format!("parsing config file {path}"))?;
            info!(path = %path, "Loaded configuration");
            Ok(config)
        }
        Err(_) => Ok(RunnerConfig::default()),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
