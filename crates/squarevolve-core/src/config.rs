//! Configuration types for the simulation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lowest speed multiplier the simulation accepts; smaller inputs are clamped
pub const MIN_SPEED_MULTIPLIER: f64 = 0.1;

/// Largest grid edge in cells; larger viewports are clamped to it
pub const MAX_GRID_SIDE: i32 = 2048;

/// Grid geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one cell in pixels
    pub cell_size: u32,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 20,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

impl GridConfig {
    /// Grid dimensions for the configured viewport (at least 1x1)
    pub fn dimensions(&self) -> (i32, i32) {
        grid_dimensions(self.viewport_width, self.viewport_height, self.cell_size)
    }
}

/// `floor(viewport / cell)` per axis, clamped to `1..=MAX_GRID_SIDE`
pub fn grid_dimensions(viewport_width: u32, viewport_height: u32, cell_size: u32) -> (i32, i32) {
    let cell = cell_size.max(1);
    let side = |viewport: u32| (viewport / cell).clamp(1, MAX_GRID_SIDE as u32) as i32;
    (side(viewport_width), side(viewport_height))
}

/// Clamp raw grid dimensions into the supported range
pub fn clamp_grid_dimensions(width: i32, height: i32) -> (i32, i32) {
    (width.clamp(1, MAX_GRID_SIDE), height.clamp(1, MAX_GRID_SIDE))
}

/// Number of cells in a grid, computed without `i32` overflow
pub fn cell_count(width: i32, height: i32) -> usize {
    let (width, height) = clamp_grid_dimensions(width, height);
    width as usize * height as usize
}

/// When the parent pays for a successful reproduction roll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyPolicy {
    /// Charge food and hunger only once the child has been placed
    #[default]
    OnPlacement,
    /// Charge as soon as the chance roll succeeds, even if no cell is free
    OnChance,
}

/// Hunger, movement and reproduction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Ticks an entity survives without eating at 1.0x speed
    pub base_survival_ticks: u32,
    /// Ticks spent flashing before a starving entity is removed
    pub dying_animation_ticks: u32,
    /// Ticks between moves at 1.0x speed
    pub base_move_delay: u32,
    /// Food units spent on one offspring
    pub reproduction_cost: u32,
    /// Minimum health percentage required to reproduce
    pub min_health_pct: f64,
    /// Reproduction probability at full health in an uncrowded area
    pub base_reproduction_chance: f64,
    /// Chebyshev radius used for the local density count
    pub density_radius: i32,
    /// Neighbor count above which reproduction is damped
    pub density_threshold: u32,
    /// Fraction of survival ticks added to the parent's hunger
    pub parent_hunger_penalty: f64,
    /// Fraction of survival ticks a child starts with as hunger
    pub birth_hunger: f64,
    /// Founders seeded on every (re)initialization
    pub initial_entities: u32,
    pub penalty_policy: PenaltyPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            base_survival_ticks: 600, // 10 s at 60 fps
            dying_animation_ticks: 30,
            base_move_delay: 15,
            reproduction_cost: 3,
            min_health_pct: 70.0,
            base_reproduction_chance: 0.1,
            density_radius: 5,
            density_threshold: 5,
            parent_hunger_penalty: 0.2,
            birth_hunger: 0.3,
            initial_entities: 10,
            penalty_policy: PenaltyPolicy::OnPlacement,
        }
    }
}

/// Food field parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Food spawned on (re)initialization
    pub initial_food: u32,
    /// Fraction of free cells the field is topped up to (0.0 to 1.0)
    pub min_food_fraction: f64,
    /// Ticks between food-limit recomputations
    pub limits_refresh_ticks: u64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            initial_food: 200,
            min_food_fraction: 0.15,
            limits_refresh_ticks: 60,
        }
    }
}

/// Inheritance parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Chance that a child drops each inherited volatile trait
    pub volatile_loss_chance: f64,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            volatile_loss_chance: 0.05,
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    /// Initial speed multiplier
    pub speed_multiplier: f64,
    /// Wall-clock time an empty world waits before reinitializing
    pub auto_reset_after_ms: u64,
    /// Ticks between population snapshots in the log
    pub metrics_interval_ticks: u64,
    pub grid: GridConfig,
    pub lifecycle: LifecycleConfig,
    pub food: FoodConfig,
    pub mutation: MutationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            speed_multiplier: 1.0,
            auto_reset_after_ms: 1000,
            metrics_interval_ticks: 600,
            grid: GridConfig::default(),
            lifecycle: LifecycleConfig::default(),
            food: FoodConfig::default(),
            mutation: MutationConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Reject configurations the engine cannot start from.
    ///
    /// Runtime knobs (speed, food fraction) are clamped instead; this only
    /// guards construction.
    pub fn validate(&self) -> Result<()> {
        if self.grid.cell_size == 0 {
            return Err(Error::InvalidConfig("grid.cell_size must be positive".into()));
        }
        if !self.speed_multiplier.is_finite() {
            return Err(Error::InvalidConfig("speed_multiplier must be finite".into()));
        }
        if self.lifecycle.base_survival_ticks == 0 {
            return Err(Error::InvalidConfig(
                "lifecycle.base_survival_ticks must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.food.min_food_fraction) {
            return Err(Error::InvalidConfig(format!(
                "food.min_food_fraction must be within [0, 1], got {}",
                self.food.min_food_fraction
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Clamp a user-supplied speed multiplier into the accepted range
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() && speed >= MIN_SPEED_MULTIPLIER {
        speed
    } else if speed.is_infinite() && speed > 0.0 {
        f64::MAX
    } else {
        MIN_SPEED_MULTIPLIER
    }
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Frames per second of the host loop
    pub target_fps: u32,
    /// Milliseconds between stats reports
    pub stats_interval_ms: u64,
    /// Stop after this many frames (runs until interrupted when `None`)
    pub max_frames: Option<u64>,
    pub simulation: SimulationConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            stats_interval_ms: 1000,
            max_frames: None,
            simulation: SimulationConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(Error::InvalidConfig("target_fps must be positive".into()));
        }
        if self.stats_interval_ms == 0 {
            return Err(Error::InvalidConfig("stats_interval_ms must be positive".into()));
        }
        self.simulation.validate()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Duration of one host frame
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }
}
