//! Headless host loops driving a shared simulation.

use crate::report;
use parking_lot::Mutex;
use squarevolve_core::RunnerConfig;
use squarevolve_world::{apply_control_command, ControlCommand, FrameOutcome, Simulation};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub type SharedSimulation = Arc<Mutex<Simulation>>;

/// Run frames at the configured rate until shutdown or `max_frames`.
///
/// Pending commands are drained before each frame so they apply between ticks.
pub async fn run_frame_loop(
    sim: SharedSimulation,
    mut commands: mpsc::Receiver<ControlCommand>,
    config: RunnerConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    let mut frames: u64 = 0;
    let mut resets: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        while let Ok(command) = commands.try_recv() {
            let reply = apply_control_command(&mut *sim.lock(), command);
            if let Some(stats) = reply {
                report::print_report(stats);
            }
        }

        let now = Instant::now();
        let delta = now - last;
        last = now;
        if sim.lock().frame(delta) == FrameOutcome::Reset {
            resets += 1;
        }

        frames += 1;
        if config.max_frames.is_some_and(|max| frames >= max) {
            info!(frames = frames, "Frame limit reached");
            break;
        }
    }

    info!(frames = frames, auto_resets = resets, "Frame loop stopped");
}

/// Print a stats report every `interval_ms` until shutdown
pub async fn run_stats_loop(sim: SharedSimulation, interval_ms: u64, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        let stats = sim.lock().stats();
        report::print_report(stats);
    }
    debug!("Stats loop stopped");
}
