//! Entity state.

use squarevolve_core::{PixelPosition, Position, TraitKind, TraitSet};
use serde::{Deserialize, Serialize};

/// Draw size of an entity relative to the cell
pub const ENTITY_SIZE_RATIO: f32 = 0.8;

/// An entity on the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub position: Position,
    /// Food units gathered or eaten, spent on reproduction
    pub food_collected: u32,
    pub traits: TraitSet,
    /// Ticks since the last meal
    pub hunger: f64,
    /// Hunger added per tick
    pub hunger_rate: f64,
    pub is_dying: bool,
    pub move_cooldown: u32,
    pub move_delay: u32,
    /// Locomotion traits whose modifiers are already folded into
    /// `move_delay` and `hunger_rate`
    pub applied_modifiers: TraitSet,
    pub birth_tick: u64,
    pub offspring_count: u32,
    pub kills: u32,
}

impl Entity {
    pub fn new(position: Position, traits: TraitSet, move_delay: u32, birth_tick: u64) -> Self {
        Self {
            position,
            food_collected: 0,
            traits,
            hunger: 0.0,
            hunger_rate: 1.0,
            is_dying: false,
            move_cooldown: 0,
            move_delay: move_delay.max(1),
            applied_modifiers: TraitSet::empty(),
            birth_tick,
            offspring_count: 0,
            kills: 0,
        }
    }

    pub fn is_predator(&self) -> bool {
        self.traits.contains(TraitKind::Predator)
    }

    /// Record one meal
    pub fn feed(&mut self) {
        self.food_collected += 1;
        self.hunger = 0.0;
        self.is_dying = false;
    }

    /// Remaining health in percent of the survival window (negative once dying)
    pub fn health_pct(&self, survival_ticks: u32) -> f64 {
        (1.0 - self.hunger / survival_ticks.max(1) as f64) * 100.0
    }

    pub fn pixel_position(&self, cell_size: u32) -> PixelPosition {
        self.position.to_pixel(cell_size)
    }

    /// Drop all locomotion adjustments so they are re-applied from `move_delay`
    pub fn reset_locomotion(&mut self, move_delay: u32) {
        self.move_delay = move_delay.max(1);
        self.hunger_rate = 1.0;
        self.applied_modifiers = TraitSet::empty();
        self.move_cooldown = self.move_cooldown.min(self.move_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_creation() {
        let traits: TraitSet = [TraitKind::Producer].into_iter().collect();
        let entity = Entity::new(Position::new(5, 5), traits, 15, 3);

        assert_eq!(entity.position, Position::new(5, 5));
        assert_eq!(entity.move_delay, 15);
        assert_eq!(entity.move_cooldown, 0);
        assert_eq!(entity.birth_tick, 3);
        assert!(!entity.is_predator());
        assert_eq!(entity.health_pct(600), 100.0);
    }

    #[test]
    fn test_feed_resets_hunger() {
        let mut entity = Entity::new(Position::new(0, 0), TraitSet::empty(), 0, 0);
        assert_eq!(entity.move_delay, 1);

        entity.hunger = 610.0;
        entity.is_dying = true;
        entity.feed();

        assert_eq!(entity.food_collected, 1);
        assert_eq!(entity.hunger, 0.0);
        assert!(!entity.is_dying);
    }

    #[test]
    fn test_health_pct() {
        let mut entity = Entity::new(Position::new(0, 0), TraitSet::empty(), 15, 0);
        entity.hunger = 180.0;
        assert!((entity.health_pct(600) - 70.0).abs() < 1e-9);
        entity.hunger = 900.0;
        assert!(entity.health_pct(600) < 0.0);
    }

    #[test]
    fn test_pixel_position() {
        let entity = Entity::new(Position::new(2, 1), TraitSet::empty(), 15, 0);
        let px = entity.pixel_position(20);
        assert_eq!((px.x, px.y), (50.0, 30.0));
    }
}
