//! Shared world state mutated by the step driver.

use crate::arena::EntityArena;
use crate::entity::Entity;
use crate::food::FoodField;
use crate::occupancy::OccupancyIndex;
use squarevolve_core::{clamp_speed, EntityId, LifecycleConfig, LifetimeCounters, MutationTally};

/// Parameters derived from the speed multiplier
#[derive(Debug, Clone)]
pub struct SimParams {
    pub speed_multiplier: f64,
    pub cell_size: u32,
    pub lifecycle: LifecycleConfig,
}

impl SimParams {
    pub fn new(speed_multiplier: f64, cell_size: u32, lifecycle: LifecycleConfig) -> Self {
        Self {
            speed_multiplier: clamp_speed(speed_multiplier),
            cell_size,
            lifecycle,
        }
    }

    /// `round(base_survival / speed)`, at least one tick
    pub fn survival_ticks(&self) -> u32 {
        let ticks = (self.lifecycle.base_survival_ticks as f64 / self.speed_multiplier).round();
        (ticks as u32).max(1)
    }

    /// Hunger at which a dying entity is removed
    pub fn removal_threshold(&self) -> f64 {
        self.survival_ticks() as f64 + self.lifecycle.dying_animation_ticks as f64
    }

    /// `max(1, round(base_move_delay / speed))`
    pub fn move_delay(&self) -> u32 {
        let delay = (self.lifecycle.base_move_delay as f64 / self.speed_multiplier).round();
        (delay as u32).max(1)
    }
}

/// Everything a tick reads and writes
#[derive(Debug, Clone)]
pub struct WorldState {
    pub entities: EntityArena,
    pub occupancy: OccupancyIndex,
    pub food: FoodField,
    pub params: SimParams,
    pub counters: LifetimeCounters,
    pub tally: MutationTally,
    pub tick: u64,
}

impl WorldState {
    pub fn new(width: i32, height: i32, params: SimParams, min_food_fraction: f64) -> Self {
        Self {
            entities: EntityArena::new(),
            occupancy: OccupancyIndex::new(width, height),
            food: FoodField::new(width, height, min_food_fraction),
            params,
            counters: LifetimeCounters::default(),
            tally: MutationTally::default(),
            tick: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.occupancy.width
    }

    pub fn height(&self) -> i32 {
        self.occupancy.height
    }

    pub fn total_cells(&self) -> usize {
        self.occupancy.total_cells()
    }

    /// Insert an entity on a free in-bounds cell; `None` if the cell is taken
    pub fn insert_entity(&mut self, entity: Entity) -> Option<EntityId> {
        let pos = entity.position;
        if self.occupancy.is_occupied(pos, None) {
            return None;
        }
        let id = self.entities.insert(entity);
        self.occupancy.set(pos, id);
        Some(id)
    }

    /// Recompute food capacity against the current population
    pub fn refresh_food_limits(&mut self, is_initial: bool) {
        let total = self.total_cells();
        let live = self.entities.len();
        self.food.compute_limits(total, live, is_initial);
    }

    /// Verify index/arena agreement and food capacity
    pub fn check_invariants(&self) -> Result<(), String> {
        for (id, entity) in self.entities.iter() {
            match self.occupancy.get(entity.position) {
                Some(occupant) if occupant == id => {}
                other => {
                    return Err(format!(
                        "entity {} at {:?} indexed as {:?}",
                        id, entity.position, other
                    ))
                }
            }
        }
        let indexed = self.occupancy.occupied_count();
        if indexed != self.entities.len() {
            return Err(format!(
                "index holds {} cells for {} live entities",
                indexed,
                self.entities.len()
            ));
        }
        if self.food.len() > self.food.max_food() {
            return Err(format!(
                "{} food items exceed capacity {}",
                self.food.len(),
                self.food.max_food()
            ));
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.occupancy.resize(self.width(), self.height());
        self.food.clear();
        self.counters = LifetimeCounters::default();
        self.tally = MutationTally::default();
        self.tick = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squarevolve_core::{Position, TraitSet};

    fn params(speed: f64) -> SimParams {
        SimParams::new(speed, 20, LifecycleConfig::default())
    }

    #[test]
    fn test_speed_scaling() {
        let normal = params(1.0);
        assert_eq!(normal.survival_ticks(), 600);
        assert_eq!(normal.move_delay(), 15);
        assert_eq!(normal.removal_threshold(), 630.0);

        let double = params(2.0);
        assert_eq!(double.survival_ticks(), 300);
        // 7.5 rounds half away from zero
        assert_eq!(double.move_delay(), 8);

        let fast = params(100.0);
        assert_eq!(fast.move_delay(), 1);
        assert_eq!(fast.survival_ticks(), 6);
    }

    #[test]
    fn test_non_positive_speed_is_clamped() {
        let p = params(0.0);
        assert!(p.speed_multiplier > 0.0);
        assert_eq!(p.survival_ticks(), 6000);
        assert_eq!(p.move_delay(), 150);
    }

    #[test]
    fn test_insert_entity_rejects_taken_cell() {
        let mut world = WorldState::new(5, 5, params(1.0), 0.1);
        let pos = Position::new(2, 2);
        let a = world.insert_entity(Entity::new(pos, TraitSet::empty(), 15, 0));
        assert!(a.is_some());
        assert!(world.insert_entity(Entity::new(pos, TraitSet::empty(), 15, 0)).is_none());
        assert!(world
            .insert_entity(Entity::new(Position::new(5, 0), TraitSet::empty(), 15, 0))
            .is_none());
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_detects_stale_entry() {
        let mut world = WorldState::new(5, 5, params(1.0), 0.1);
        let id = world
            .insert_entity(Entity::new(Position::new(1, 1), TraitSet::empty(), 15, 0))
            .unwrap();
        world.entities.get_mut(id).unwrap().position = Position::new(2, 2);
        assert!(world.check_invariants().is_err());
    }
}
