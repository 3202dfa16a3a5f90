//! Step driver: owns the world and runs one tick per frame.

use crate::entity::{Entity, ENTITY_SIZE_RATIO};
use crate::food::{FoodItem, FOOD_RADIUS_RATIO};
use crate::lifecycle::{self, HungerState, ReproductionOutcome};
use crate::movement;
use crate::mutation::MutationRegistry;
use crate::state::{SimParams, WorldState};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use squarevolve_core::{
    clamp_speed, grid_dimensions, Color, EntityId, PixelPosition, PopulationStats, Position,
    Result, RunId, SimulationConfig,
};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, event, info, instrument, Level};

/// What one call to [`Simulation::frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// State frozen; nothing mutated
    Paused,
    Ticked,
    /// The population had been empty long enough and was reseeded
    Reset,
}

/// Per-tick bookkeeping, mostly for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub meals: u32,
    pub predations: u32,
    pub moves: u32,
    pub starvations: u32,
    pub births: u32,
}

/// An entity as the renderer needs it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedEntity {
    pub id: EntityId,
    pub position: Position,
    pub pixel: PixelPosition,
    pub size: f32,
    pub color: Color,
    pub dying: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedFood {
    pub position: Position,
    pub pixel: PixelPosition,
    pub radius: f32,
}

/// Everything drawn in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderFrame {
    pub grid_width: i32,
    pub grid_height: i32,
    pub cell_size: u32,
    pub entities: Vec<RenderedEntity>,
    pub foods: Vec<RenderedFood>,
}

pub struct Simulation<R: Rng = ChaCha8Rng> {
    config: SimulationConfig,
    world: WorldState,
    registry: MutationRegistry,
    rng: R,
    run_id: RunId,
    paused: bool,
    /// Wall-clock time the population has been empty
    empty_for: Duration,
}

impl Simulation<ChaCha8Rng> {
    /// Build a simulation; randomness comes from the configured seed or OS entropy
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let (width, height) = config.grid.dimensions();
        let params = SimParams::new(
            config.speed_multiplier,
            config.grid.cell_size,
            config.lifecycle.clone(),
        );
        let world = WorldState::new(width, height, params, config.food.min_food_fraction);
        let registry = MutationRegistry::new(config.mutation.clone());

        let mut sim = Self {
            config,
            world,
            registry,
            rng,
            run_id: RunId::new(),
            paused: false,
            empty_for: Duration::ZERO,
        };
        sim.seed_population();
        Ok(sim)
    }

    /// Founders and initial food for a fresh run
    fn seed_population(&mut self) {
        for _ in 0..self.config.lifecycle.initial_entities {
            if lifecycle::spawn_founder(&mut self.world, &self.registry, &mut self.rng).is_none() {
                break;
            }
        }
        self.world.refresh_food_limits(true);
        self.world
            .food
            .add(self.config.food.initial_food as usize, &mut self.rng);

        info!(
            event = "run_started",
            run_id = %self.run_id,
            grid_width = self.world.width(),
            grid_height = self.world.height(),
            founders = self.world.entities.len(),
            food = self.world.food.len(),
            max_food = self.world.food.max_food(),
            min_food_target = self.world.food.min_food_target(),
            speed = self.world.params.speed_multiplier,
            "Simulation run started"
        );
    }

    /// One host frame: top up food, tick, run the empty-world watchdog.
    ///
    /// `delta` is the wall-clock time since the previous frame.
    pub fn frame(&mut self, delta: Duration) -> FrameOutcome {
        if self.paused {
            return FrameOutcome::Paused;
        }

        let refresh = self.config.food.limits_refresh_ticks.max(1);
        if self.world.tick % refresh == 0 {
            self.world.refresh_food_limits(false);
        }
        let target = self.world.food.min_food_target();
        self.world.food.top_up(target, &mut self.rng);

        self.step();

        if self.world.entities.is_empty() {
            self.empty_for += delta;
            if self.empty_for >= Duration::from_millis(self.config.auto_reset_after_ms) {
                info!(
                    event = "auto_reset",
                    run_id = %self.run_id,
                    tick = self.world.tick,
                    empty_for_ms = self.empty_for.as_millis() as u64,
                    "Population extinct, reinitializing"
                );
                self.reset();
                return FrameOutcome::Reset;
            }
        } else {
            self.empty_for = Duration::ZERO;
        }
        FrameOutcome::Ticked
    }

    /// Run exactly one tick regardless of the pause flag
    pub fn step(&mut self) -> TickReport {
        let mut report = TickReport::default();

        // Phase 1: trait behaviors. Prey eaten here vanish from later phases.
        for id in self.world.entities.snapshot().into_iter().rev() {
            if !self.world.entities.contains(id) {
                continue;
            }
            let effects = self.registry.tick(id, &mut self.world);
            if effects.ate_food {
                report.meals += 1;
            }
            if effects.prey.is_some() {
                report.predations += 1;
            }
        }

        // Phase 2: hunger, death, movement and reproduction. Children born
        // here are not in the snapshot and wait for the next tick.
        for id in self.world.entities.snapshot().into_iter().rev() {
            if !self.world.entities.contains(id) {
                continue;
            }
            if lifecycle::advance_hunger(&mut self.world, id) == HungerState::Expired {
                lifecycle::starve(&mut self.world, id);
                report.starvations += 1;
                continue;
            }

            match movement::step_movement(&mut self.world, id, &mut self.rng) {
                movement::MoveOutcome::Moved(_) => report.moves += 1,
                movement::MoveOutcome::Attacked { .. } => {
                    report.moves += 1;
                    report.predations += 1;
                }
                movement::MoveOutcome::Waiting | movement::MoveOutcome::Stayed => {}
            }

            if let ReproductionOutcome::Born(_) =
                lifecycle::attempt_reproduction(&mut self.world, &self.registry, id, &mut self.rng)
            {
                report.births += 1;
            }
        }

        self.world.entities.compact();
        debug_assert!(
            self.world.check_invariants().is_ok(),
            "{:?}",
            self.world.check_invariants()
        );

        self.world.tick += 1;
        let interval = self.config.metrics_interval_ticks;
        if interval > 0 && self.world.tick % interval == 0 {
            self.emit_population_metrics();
        }
        report
    }

    fn emit_population_metrics(&self) {
        let stats = self.stats();
        info!(
            event = "population_metrics",
            run_id = %self.run_id,
            tick = stats.tick,
            total_population = stats.entity_count,
            producers = stats.producers,
            predators = stats.predators,
            food = stats.food_count,
            max_food = stats.max_food,
            births = stats.counters.births,
            starvations = stats.counters.starvations,
            kills = stats.counters.kills,
            producer_to_predator = stats.tally.producer_to_predator,
            predator_to_producer = stats.tally.predator_to_producer,
            "Population metrics snapshot"
        );
        event!(
            Level::INFO,
            gauge_name = "population_total",
            gauge_value = stats.entity_count,
            tick = stats.tick,
            "Population gauge"
        );
        event!(
            Level::INFO,
            gauge_name = "food_total",
            gauge_value = stats.food_count,
            tick = stats.tick,
            "Food gauge"
        );
    }

    /// Change the speed multiplier; move delay and survival time follow at once
    pub fn set_speed_multiplier(&mut self, speed: f64) {
        let speed = clamp_speed(speed);
        self.world.params.speed_multiplier = speed;
        let delay = self.world.params.move_delay();
        for entity in self.world.entities.iter_mut() {
            entity.reset_locomotion(delay);
        }
        debug!(
            event = "speed_changed",
            speed = speed,
            move_delay = delay,
            survival_ticks = self.world.params.survival_ticks(),
            "Speed multiplier updated"
        );
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.world.params.speed_multiplier
    }

    /// Fraction of free cells kept stocked with food, clamped to [0, 1]
    pub fn set_min_food_fraction(&mut self, fraction: f64) {
        self.world.food.set_min_food_fraction(fraction);
        self.world.refresh_food_limits(false);
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Discard all state and reseed; speed, food fraction and grid size persist
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn reset(&mut self) {
        self.world.clear();
        self.run_id = RunId::new();
        self.empty_for = Duration::ZERO;
        self.seed_population();
    }

    /// Adopt a new viewport size in pixels.
    ///
    /// Entities outside the new grid are pulled to the nearest free cell; those
    /// that cannot fit are dropped.
    #[instrument(skip(self))]
    pub fn resize(&mut self, viewport_width: u32, viewport_height: u32) {
        let (width, height) =
            grid_dimensions(viewport_width, viewport_height, self.config.grid.cell_size);
        self.config.grid.viewport_width = viewport_width;
        self.config.grid.viewport_height = viewport_height;

        self.world.occupancy.resize(width, height);
        let mut dropped = 0;
        for id in self.world.entities.snapshot() {
            let Some(pos) = self.world.entities.get(id).map(|e| e.position) else {
                continue;
            };
            match self.world.occupancy.nearest_free(pos) {
                Some(free) => {
                    self.world.occupancy.set(free, id);
                    if let Some(entity) = self.world.entities.get_mut(id) {
                        entity.position = free;
                    }
                }
                None => {
                    self.world.entities.remove(id);
                    dropped += 1;
                }
            }
        }
        self.world.entities.compact();
        self.world.food.resize(width, height);
        self.world.refresh_food_limits(false);

        info!(
            event = "grid_resized",
            run_id = %self.run_id,
            grid_width = width,
            grid_height = height,
            dropped_entities = dropped,
            "Grid resized"
        );
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn tick(&self) -> u64 {
        self.world.tick
    }

    pub fn grid_dimensions(&self) -> (i32, i32) {
        (self.world.width(), self.world.height())
    }

    pub fn cell_size(&self) -> u32 {
        self.config.grid.cell_size
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    pub fn registry(&self) -> &MutationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Live entities in population order
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.world.entities.iter()
    }

    pub fn foods(&self) -> &[FoodItem] {
        self.world.food.items()
    }

    /// Survival time at the current speed
    pub fn survival_ticks(&self) -> u32 {
        self.world.params.survival_ticks()
    }

    pub fn stats(&self) -> PopulationStats {
        let mut stats = PopulationStats {
            run_id: Some(self.run_id),
            tick: self.world.tick,
            paused: self.paused,
            speed_multiplier: self.world.params.speed_multiplier,
            food_count: self.world.food.len(),
            max_food: self.world.food.max_food(),
            min_food_target: self.world.food.min_food_target(),
            grid_width: self.world.width(),
            grid_height: self.world.height(),
            counters: self.world.counters,
            tally: self.world.tally,
            ..Default::default()
        };
        for (_, entity) in self.world.entities.iter() {
            stats.add_entity(&entity.traits);
        }
        stats
    }

    /// Resolved draw list at wall-clock time `now_ms` (milliseconds since the epoch)
    pub fn render_snapshot(&self, now_ms: u128) -> RenderFrame {
        let cell = self.config.grid.cell_size;
        let entities = self
            .world
            .entities
            .iter()
            .map(|(id, entity)| RenderedEntity {
                id,
                position: entity.position,
                pixel: entity.pixel_position(cell),
                size: cell as f32 * ENTITY_SIZE_RATIO,
                color: self
                    .registry
                    .color_at(&entity.traits, entity.is_dying, now_ms),
                dying: entity.is_dying,
            })
            .collect();
        let foods = self
            .world
            .food
            .items()
            .iter()
            .map(|food| RenderedFood {
                position: food.position,
                pixel: food.pixel_position(cell),
                radius: cell as f32 * FOOD_RADIUS_RATIO,
            })
            .collect();

        RenderFrame {
            grid_width: self.world.width(),
            grid_height: self.world.height(),
            cell_size: cell,
            entities,
            foods,
        }
    }

    /// [`Self::render_snapshot`] at the current system time
    pub fn render_now(&self) -> RenderFrame {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        self.render_snapshot(now_ms)
    }
}
