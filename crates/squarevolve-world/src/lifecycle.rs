//! Entity creation, hunger, death and reproduction.

use crate::entity::Entity;
use crate::mutation::MutationRegistry;
use crate::state::WorldState;
use rand::seq::SliceRandom;
use rand::Rng;
use squarevolve_core::{Direction, EntityId, PenaltyPolicy, Position};
use tracing::{debug, event, trace, Level};

/// Random probes before a founder falls back to scanning for a free cell
const FOUNDER_PLACEMENT_ATTEMPTS: usize = 100;

/// Where an entity stands in its lifecycle after a hunger update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HungerState {
    Healthy,
    Dying,
    /// Past the dying window; the entity must be removed
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReproductionOutcome {
    /// Health or food below the threshold
    Ineligible,
    RollFailed,
    /// The roll succeeded but no adjacent cell was free
    NoSpace,
    Born(EntityId),
}

/// Create a parentless entity on a random free cell
pub fn spawn_founder<R: Rng + ?Sized>(
    world: &mut WorldState,
    registry: &MutationRegistry,
    rng: &mut R,
) -> Option<EntityId> {
    let pos = random_free_cell(world, rng)?;
    let traits = registry.roll_traits(None, rng);
    let entity = Entity::new(pos, traits, world.params.move_delay(), world.tick);
    let id = world.insert_entity(entity)?;
    world.counters.births += 1;
    Some(id)
}

fn random_free_cell<R: Rng + ?Sized>(world: &WorldState, rng: &mut R) -> Option<Position> {
    let (width, height) = (world.width(), world.height());
    for _ in 0..FOUNDER_PLACEMENT_ATTEMPTS {
        let pos = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
        if !world.occupancy.is_occupied(pos, None) {
            return Some(pos);
        }
    }
    let start = Position::new(rng.gen_range(0..width), rng.gen_range(0..height));
    world.occupancy.nearest_free(start)
}

/// First free cell of the parent's 8-neighborhood, probed in shuffled order
pub fn find_free_adjacent<R: Rng + ?Sized>(
    world: &WorldState,
    pos: Position,
    rng: &mut R,
) -> Option<Position> {
    let mut directions = Direction::all();
    directions.shuffle(rng);
    directions.into_iter().find_map(|dir| {
        let (dx, dy) = dir.to_delta();
        let candidate = pos.add(dx, dy);
        (!world.occupancy.is_occupied(candidate, None)).then_some(candidate)
    })
}

/// Remove an entity from the arena and release its cell
pub fn remove_entity(world: &mut WorldState, id: EntityId) -> Option<Entity> {
    let entity = world.entities.remove(id)?;
    world.occupancy.release(entity.position, id);
    Some(entity)
}

/// Advance hunger by one tick and classify the result
pub fn advance_hunger(world: &mut WorldState, id: EntityId) -> HungerState {
    let survival = world.params.survival_ticks() as f64;
    let removal = world.params.removal_threshold();
    let Some(entity) = world.entities.get_mut(id) else {
        return HungerState::Expired;
    };

    entity.hunger += entity.hunger_rate;
    if entity.hunger >= removal {
        HungerState::Expired
    } else if entity.hunger >= survival {
        entity.is_dying = true;
        HungerState::Dying
    } else {
        entity.is_dying = false;
        HungerState::Healthy
    }
}

/// Remove a starved entity and record the death
pub fn starve(world: &mut WorldState, id: EntityId) {
    if let Some(entity) = remove_entity(world, id) {
        world.counters.starvations += 1;
        debug!(
            event = "entity_starved",
            entity_id = %id,
            tick = world.tick,
            age = world.tick.saturating_sub(entity.birth_tick),
            traits = %entity.traits.label(),
            offspring_count = entity.offspring_count,
            kills = entity.kills,
            "Entity starved"
        );
    }
}

/// Other entities within the density radius, read from the occupancy index
pub fn local_density(world: &WorldState, id: EntityId) -> u32 {
    match world.entities.get(id) {
        Some(entity) => world.occupancy.count_within(
            entity.position,
            world.params.lifecycle.density_radius,
            Some(id),
        ),
        None => 0,
    }
}

/// `base_chance * health * density_factor`, damped once density passes the threshold
pub fn reproduction_chance(health_pct: f64, density: u32, base_chance: f64, threshold: u32) -> f64 {
    let density_factor = if density <= threshold {
        1.0
    } else {
        threshold as f64 / density as f64
    };
    base_chance * (health_pct / 100.0) * density_factor
}

/// Roll for offspring and place a child next to the parent on success
pub fn attempt_reproduction<R: Rng + ?Sized>(
    world: &mut WorldState,
    registry: &MutationRegistry,
    id: EntityId,
    rng: &mut R,
) -> ReproductionOutcome {
    let survival = world.params.survival_ticks();
    let cfg = world.params.lifecycle.clone();

    let Some(parent) = world.entities.get(id) else {
        return ReproductionOutcome::Ineligible;
    };
    let health_pct = parent.health_pct(survival);
    if health_pct < cfg.min_health_pct || parent.food_collected < cfg.reproduction_cost {
        return ReproductionOutcome::Ineligible;
    }
    let parent_pos = parent.position;
    let parent_traits = parent.traits;

    world.counters.reproduction_attempts += 1;
    let density = local_density(world, id);
    let chance = reproduction_chance(
        health_pct,
        density,
        cfg.base_reproduction_chance,
        cfg.density_threshold,
    );
    if rng.gen::<f64>() >= chance {
        return ReproductionOutcome::RollFailed;
    }

    let penalty = cfg.parent_hunger_penalty * survival as f64;
    if cfg.penalty_policy == PenaltyPolicy::OnChance {
        charge_parent(world, id, cfg.reproduction_cost, penalty);
    }

    let Some(child_pos) = find_free_adjacent(world, parent_pos, rng) else {
        world.counters.placement_failures += 1;
        trace!(
            entity_id = %id,
            tick = world.tick,
            position_x = parent_pos.x,
            position_y = parent_pos.y,
            density = density,
            "Reproduction failed: no empty adjacent cell found"
        );
        event!(
            Level::TRACE,
            counter_name = "reproduction_failures",
            counter_value = 1,
            failure_reason = "no_empty_adjacent_cell",
            "Reproduction attempt failed"
        );
        return ReproductionOutcome::NoSpace;
    };

    let traits = registry.roll_traits(Some(&parent_traits), rng);
    world.tally.record(&parent_traits, &traits);

    let mut child = Entity::new(child_pos, traits, world.params.move_delay(), world.tick);
    child.hunger = cfg.birth_hunger * survival as f64;
    let Some(child_id) = world.insert_entity(child) else {
        return ReproductionOutcome::NoSpace;
    };

    if cfg.penalty_policy == PenaltyPolicy::OnPlacement {
        charge_parent(world, id, cfg.reproduction_cost, penalty);
    }
    if let Some(parent) = world.entities.get_mut(id) {
        parent.offspring_count += 1;
    }
    world.counters.births += 1;

    debug!(
        event = "reproduction_success",
        parent_id = %id,
        offspring_id = %child_id,
        tick = world.tick,
        parent_traits = %parent_traits.label(),
        offspring_traits = %traits.label(),
        health_pct = health_pct,
        density = density,
        offspring_position_x = child_pos.x,
        offspring_position_y = child_pos.y,
        population = world.entities.len(),
        "Entity reproduced"
    );

    ReproductionOutcome::Born(child_id)
}

fn charge_parent(world: &mut WorldState, id: EntityId, cost: u32, hunger_penalty: f64) {
    if let Some(parent) = world.entities.get_mut(id) {
        parent.food_collected = parent.food_collected.saturating_sub(cost);
        parent.hunger += hunger_penalty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SimParams;
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use squarevolve_core::{LifecycleConfig, MutationConfig, TraitKind, TraitSet};

    fn world_with(lifecycle: LifecycleConfig) -> WorldState {
        WorldState::new(10, 10, SimParams::new(1.0, 20, lifecycle), 0.0)
    }

    fn producer_at(world: &mut WorldState, x: i32, y: i32) -> EntityId {
        let traits: TraitSet = [TraitKind::Producer].into_iter().collect();
        world
            .insert_entity(Entity::new(Position::new(x, y), traits, 15, 0))
            .unwrap()
    }

    /// Occupy every neighbor of (5,5) except (6,5)
    fn crowd_except_east(world: &mut WorldState) {
        for (dx, dy) in [(-1, -1), (0, -1), (1, -1), (-1, 0), (-1, 1), (0, 1), (1, 1)] {
            producer_at(world, 5 + dx, 5 + dy);
        }
    }

    #[test]
    fn test_hunger_states() {
        let mut world = world_with(LifecycleConfig::default());
        let id = producer_at(&mut world, 1, 1);

        assert_eq!(advance_hunger(&mut world, id), HungerState::Healthy);
        assert_eq!(world.entities.get(id).unwrap().hunger, 1.0);

        world.entities.get_mut(id).unwrap().hunger = 599.0;
        assert_eq!(advance_hunger(&mut world, id), HungerState::Dying);
        assert!(world.entities.get(id).unwrap().is_dying);

        world.entities.get_mut(id).unwrap().hunger = 629.0;
        assert_eq!(advance_hunger(&mut world, id), HungerState::Expired);

        starve(&mut world, id);
        assert!(!world.entities.contains(id));
        assert_eq!(world.occupancy.get(Position::new(1, 1)), None);
        assert_eq!(world.counters.starvations, 1);
    }

    #[test]
    fn test_reproduction_chance_density_factor() {
        assert!((reproduction_chance(100.0, 0, 0.1, 5) - 0.1).abs() < 1e-12);
        assert!((reproduction_chance(100.0, 5, 0.1, 5) - 0.1).abs() < 1e-12);
        assert!((reproduction_chance(80.0, 10, 0.1, 5) - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_local_density_uses_radius() {
        let mut world = world_with(LifecycleConfig::default());
        let center = producer_at(&mut world, 2, 2);
        producer_at(&mut world, 7, 7);
        producer_at(&mut world, 8, 2);
        producer_at(&mut world, 0, 0);
        assert_eq!(local_density(&world, center), 2);
    }

    #[test]
    fn test_reproduction_places_child_and_charges_parent() {
        let lifecycle = LifecycleConfig {
            reproduction_cost: 5,
            ..Default::default()
        };
        let mut world = world_with(lifecycle);
        let registry = MutationRegistry::new(MutationConfig::default());
        let parent = producer_at(&mut world, 5, 5);
        crowd_except_east(&mut world);
        world.entities.get_mut(parent).unwrap().food_collected = 5;

        let mut rng = StepRng::new(0, 0);
        let outcome = attempt_reproduction(&mut world, &registry, parent, &mut rng);

        let ReproductionOutcome::Born(child) = outcome else {
            panic!("expected a birth, got {:?}", outcome);
        };
        let survival = world.params.survival_ticks() as f64;
        let child = world.entities.get(child).unwrap();
        assert_eq!(child.position, Position::new(6, 5));
        assert!((child.hunger - 0.3 * survival).abs() < 1e-9);

        let parent = world.entities.get(parent).unwrap();
        assert_eq!(parent.food_collected, 0);
        assert!((parent.hunger - 0.2 * survival).abs() < 1e-9);
        assert_eq!(parent.offspring_count, 1);
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn test_full_neighborhood_on_placement_policy_keeps_parent_intact() {
        let mut world = world_with(LifecycleConfig::default());
        let registry = MutationRegistry::new(MutationConfig::default());
        let parent = producer_at(&mut world, 5, 5);
        crowd_except_east(&mut world);
        producer_at(&mut world, 6, 5);
        world.entities.get_mut(parent).unwrap().food_collected = 3;

        let mut rng = StepRng::new(0, 0);
        let outcome = attempt_reproduction(&mut world, &registry, parent, &mut rng);
        assert_eq!(outcome, ReproductionOutcome::NoSpace);
        let parent = world.entities.get(parent).unwrap();
        assert_eq!(parent.food_collected, 3);
        assert_eq!(parent.hunger, 0.0);
        assert_eq!(world.counters.placement_failures, 1);
    }

    #[test]
    fn test_full_neighborhood_on_chance_policy_charges_parent() {
        let lifecycle = LifecycleConfig {
            penalty_policy: PenaltyPolicy::OnChance,
            ..Default::default()
        };
        let mut world = world_with(lifecycle);
        let registry = MutationRegistry::new(MutationConfig::default());
        let parent = producer_at(&mut world, 5, 5);
        crowd_except_east(&mut world);
        producer_at(&mut world, 6, 5);
        world.entities.get_mut(parent).unwrap().food_collected = 3;

        let mut rng = StepRng::new(0, 0);
        let outcome = attempt_reproduction(&mut world, &registry, parent, &mut rng);
        assert_eq!(outcome, ReproductionOutcome::NoSpace);
        let parent = world.entities.get(parent).unwrap();
        assert_eq!(parent.food_collected, 0);
        assert!((parent.hunger - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_health_never_reproduces() {
        let mut world = world_with(LifecycleConfig::default());
        let registry = MutationRegistry::new(MutationConfig::default());
        let parent = producer_at(&mut world, 5, 5);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        // 69% health: hunger is 31% of 600 ticks
        for _ in 0..10_000 {
            let entity = world.entities.get_mut(parent).unwrap();
            entity.hunger = 186.0;
            entity.food_collected = 100;
            let outcome = attempt_reproduction(&mut world, &registry, parent, &mut rng);
            assert_eq!(outcome, ReproductionOutcome::Ineligible);
        }
        assert_eq!(world.entities.len(), 1);
        assert_eq!(world.counters.reproduction_attempts, 0);
    }

    #[test]
    fn test_insufficient_food_is_ineligible() {
        let mut world = world_with(LifecycleConfig::default());
        let registry = MutationRegistry::new(MutationConfig::default());
        let parent = producer_at(&mut world, 5, 5);
        world.entities.get_mut(parent).unwrap().food_collected = 2;
        let mut rng = StepRng::new(0, 0);
        assert_eq!(
            attempt_reproduction(&mut world, &registry, parent, &mut rng),
            ReproductionOutcome::Ineligible
        );
    }

    #[test]
    fn test_founders_fill_small_grid_without_overlap() {
        let mut world = WorldState::new(3, 3, SimParams::new(1.0, 20, LifecycleConfig::default()), 0.0);
        let registry = MutationRegistry::new(MutationConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..9 {
            assert!(spawn_founder(&mut world, &registry, &mut rng).is_some());
        }
        assert!(spawn_founder(&mut world, &registry, &mut rng).is_none());
        assert_eq!(world.entities.len(), 9);
        assert!(world.check_invariants().is_ok());
        assert!(world
            .entities
            .iter()
            .all(|(_, e)| e.traits.contains(TraitKind::Producer)));
    }

    #[test]
    fn test_find_free_adjacent_respects_bounds() {
        let mut world = world_with(LifecycleConfig::default());
        producer_at(&mut world, 1, 0);
        producer_at(&mut world, 0, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(
            find_free_adjacent(&world, Position::new(0, 0), &mut rng),
            Some(Position::new(1, 1))
        );
    }
}
