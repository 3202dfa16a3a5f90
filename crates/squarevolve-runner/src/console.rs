//! Stdin control console.

use squarevolve_core::Result;
use squarevolve_world::ControlCommand;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Parse one console line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str) -> Option<Result<ControlCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}

/// Forward stdin commands to the frame loop.
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
pub fn spawn_stdin_reader(commands: mpsc::Sender<ControlCommand>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    break;
                }
            };
            match parse_line(&line) {
                Some(Ok(command)) => {
                    if commands.blocking_send(command).is_err() {
                        break;
                    }
                }
                Some(Err(e)) => warn!(error = %e, "Ignoring console input"),
                None => {}
            }
        }
        debug!("Console reader finished");
    })
}
