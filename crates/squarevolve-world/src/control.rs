//! Host-facing control surface: speed, food fraction, pause, reset, resize.

use crate::simulation::Simulation;
use rand::Rng;
use serde::{Deserialize, Serialize};
use squarevolve_core::{Error, PopulationStats, Result};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    SetSpeed { multiplier: f64 },
    SetMinFoodFraction { fraction: f64 },
    SetPaused { paused: bool },
    Reset,
    /// New viewport size in pixels
    Resize { width: u32, height: u32 },
    /// Request a stats snapshot
    Stats,
}

impl FromStr for ControlCommand {
    type Err = Error;

    /// Parse a console line such as `speed 2`, `food 0.3` or `resize 800 600`
    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            return Err(Error::InvalidCommand("empty command".to_string()));
        };
        let args: Vec<&str> = parts.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("speed", [value]) => ControlCommand::SetSpeed {
                multiplier: parse_arg(verb, value)?,
            },
            ("food", [value]) => ControlCommand::SetMinFoodFraction {
                fraction: parse_arg(verb, value)?,
            },
            ("pause", []) => ControlCommand::SetPaused { paused: true },
            ("resume", []) => ControlCommand::SetPaused { paused: false },
            ("reset", []) => ControlCommand::Reset,
            ("resize", [width, height]) => ControlCommand::Resize {
                width: parse_arg(verb, width)?,
                height: parse_arg(verb, height)?,
            },
            ("stats", []) => ControlCommand::Stats,
            _ => return Err(Error::InvalidCommand(line.trim().to_string())),
        };
        Ok(command)
    }
}

fn parse_arg<T: FromStr>(verb: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::InvalidCommand(format!("{verb}: cannot parse '{value}'")))
}

/// Apply a command; only [`ControlCommand::Stats`] produces a reply
pub fn apply_control_command<R: Rng>(
    sim: &mut Simulation<R>,
    command: ControlCommand,
) -> Option<PopulationStats> {
    info!(event = "control_command", command = ?command, "Applying control command");
    match command {
        ControlCommand::SetSpeed { multiplier } => sim.set_speed_multiplier(multiplier),
        ControlCommand::SetMinFoodFraction { fraction } => sim.set_min_food_fraction(fraction),
        ControlCommand::SetPaused { paused } => sim.set_paused(paused),
        ControlCommand::Reset => sim.reset(),
        ControlCommand::Resize { width, height } => sim.resize(width, height),
        ControlCommand::Stats => return Some(sim.stats()),
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use squarevolve_core::{SimulationConfig, MAX_GRID_SIDE};

    fn sim() -> Simulation {
        Simulation::new(SimulationConfig {
            seed: Some(21),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_console_lines() {
        assert_eq!(
            "speed 2.5".parse::<ControlCommand>().unwrap(),
            ControlCommand::SetSpeed { multiplier: 2.5 }
        );
        assert_eq!(
            "  FOOD 0.3 ".parse::<ControlCommand>().unwrap(),
            ControlCommand::SetMinFoodFraction { fraction: 0.3 }
        );
        assert_eq!(
            "pause".parse::<ControlCommand>().unwrap(),
            ControlCommand::SetPaused { paused: true }
        );
        assert_eq!(
            "resume".parse::<ControlCommand>().unwrap(),
            ControlCommand::SetPaused { paused: false }
        );
        assert_eq!(
            "resize 800 600".parse::<ControlCommand>().unwrap(),
            ControlCommand::Resize {
                width: 800,
                height: 600
            }
        );
        assert_eq!("stats".parse::<ControlCommand>().unwrap(), ControlCommand::Stats);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for line in ["", "fly", "speed", "speed fast", "resize 800", "reset now"] {
            assert!(matches!(
                line.parse::<ControlCommand>(),
                Err(Error::InvalidCommand(_))
            ));
        }
    }

    #[test]
    fn test_json_tagging() {
        let json = r#"{"command":"set_speed","multiplier":3.0}"#;
        let command: ControlCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command, ControlCommand::SetSpeed { multiplier: 3.0 });
        let reset = serde_json::to_string(&ControlCommand::Reset).unwrap();
        assert_eq!(reset, r#"{"command":"reset"}"#);
    }

    #[test]
    fn test_apply_commands() {
        let mut sim = sim();

        apply_control_command(&mut sim, ControlCommand::SetSpeed { multiplier: 2.0 });
        assert_eq!(sim.speed_multiplier(), 2.0);

        apply_control_command(&mut sim, ControlCommand::SetPaused { paused: true });
        assert!(sim.is_paused());

        apply_control_command(&mut sim, ControlCommand::SetMinFoodFraction { fraction: 7.0 });
        assert_eq!(sim.world().food.min_food_fraction(), 1.0);

        apply_control_command(
            &mut sim,
            ControlCommand::Resize {
                width: 200,
                height: 100,
            },
        );
        assert_eq!(sim.grid_dimensions(), (10, 5));

        let stats = apply_control_command(&mut sim, ControlCommand::Stats).unwrap();
        assert!(stats.paused);
        assert_eq!(stats.speed_multiplier, 2.0);
    }

    #[test]
    fn test_reset_keeps_user_settings() {
        let mut sim = sim();
        let run = sim.run_id();
        apply_control_command(&mut sim, ControlCommand::SetSpeed { multiplier: 0.5 });
        apply_control_command(&mut sim, ControlCommand::SetMinFoodFraction { fraction: 0.4 });
        for _ in 0..5 {
            sim.step();
        }

        apply_control_command(&mut sim, ControlCommand::Reset);
        assert_ne!(sim.run_id(), run);
        assert_eq!(sim.tick(), 0);
        assert_eq!(sim.speed_multiplier(), 0.5);
        assert_eq!(sim.world().food.min_food_fraction(), 0.4);
        assert_eq!(sim.entities().count(), 10);
        assert!(sim.entities().all(|(_, e)| e.move_delay == 30));
    }

    #[test]
    fn test_oversized_resize_is_clamped() {
        let mut sim = sim();
        let command: ControlCommand = "resize 4000000 4000000".parse().unwrap();
        apply_control_command(&mut sim, command);

        assert_eq!(sim.grid_dimensions(), (MAX_GRID_SIDE, MAX_GRID_SIDE));
        assert_eq!(sim.entities().count(), 10);
        assert!(sim.world().check_invariants().is_ok());
        sim.step();

        apply_control_command(
            &mut sim,
            ControlCommand::Resize {
                width: 400,
                height: 300,
            },
        );
        assert_eq!(sim.grid_dimensions(), (20, 15));
        assert!(sim.world().check_invariants().is_ok());
    }
}
