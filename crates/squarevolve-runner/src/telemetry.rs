//! Log subscriber setup for the runner.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,squarevolve_world=debug";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter; `SQUAREVOLVE_LOG_FORMAT=json`
/// switches to JSON lines. Logs go to stderr so stdout carries only reports.
pub fn init_telemetry() -> Result<()> {
    let json = matches!(
        std::env::var("SQUAREVOLVE_LOG_FORMAT").as_deref(),
        Ok("json")
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with((!json).then(|| fmt::layer().with_target(true).with_writer(std::io::stderr)))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .try_init()?;

    info!(json = json, "Telemetry initialized");
    Ok(())
}
