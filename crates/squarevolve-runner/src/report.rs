//! JSON stats lines written to stdout.

use chrono::{DateTime, Utc};
use serde::Serialize;
use squarevolve_core::PopulationStats;

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub timestamp: DateTime<Utc>,
    pub occupancy_ratio: f64,
    #[serde(flatten)]
    pub stats: PopulationStats,
}

impl StatsReport {
    pub fn new(stats: PopulationStats) -> Self {
        Self {
            timestamp: Utc::now(),
            occupancy_ratio: stats.occupancy_ratio(),
            stats,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Print one report line; serialization failures are logged, not fatal
pub fn print_report(stats: PopulationStats) {
    match StatsReport::new(stats).to_json_line() {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize stats report"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_flattens_stats() {
        let stats = PopulationStats {
            tick: 42,
            entity_count: 6,
            grid_width: 4,
            grid_height: 3,
            ..Default::default()
        };
        let line = StatsReport::new(stats).to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["tick"], 42);
        assert_eq!(value["entity_count"], 6);
        assert_eq!(value["occupancy_ratio"], 0.5);
        assert!(value["timestamp"].is_string());
        assert!(value.get("stats").is_none());
    }
}
