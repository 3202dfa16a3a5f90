//! Movement resolution against the occupancy index.

use crate::lifecycle;
use crate::state::WorldState;
use rand::seq::SliceRandom;
use rand::Rng;
use squarevolve_core::{Direction, EntityId, Position};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Cooldown still running
    Waiting,
    /// No valid direction
    Stayed,
    Moved(Position),
    /// Moved onto a non-predator and ate it
    Attacked { to: Position, prey: EntityId },
}

/// Destinations `id` may step to, with the prey it would eat there
pub fn valid_moves(world: &WorldState, id: EntityId) -> Vec<(Position, Option<EntityId>)> {
    let Some(entity) = world.entities.get(id) else {
        return Vec::new();
    };
    let is_predator = entity.is_predator();

    Direction::all()
        .into_iter()
        .filter_map(|dir| {
            let (dx, dy) = dir.to_delta();
            let dest = entity.position.add(dx, dy);
            if !world.occupancy.in_bounds(dest) {
                return None;
            }
            match world.occupancy.get(dest) {
                None => Some((dest, None)),
                Some(occupant) if occupant == id => None,
                Some(occupant) => {
                    let is_prey = world
                        .entities
                        .get(occupant)
                        .map_or(false, |other| !other.is_predator());
                    (is_predator && is_prey).then_some((dest, Some(occupant)))
                }
            }
        })
        .collect()
}

/// Pick a valid direction uniformly and commit the move
pub fn resolve_move<R: Rng + ?Sized>(world: &mut WorldState, id: EntityId, rng: &mut R) -> MoveOutcome {
    let moves = valid_moves(world, id);
    let Some(&(dest, prey)) = moves.choose(rng) else {
        return MoveOutcome::Stayed;
    };
    let Some(from) = world.entities.get(id).map(|e| e.position) else {
        return MoveOutcome::Stayed;
    };

    if let Some(prey) = prey {
        lifecycle::remove_entity(world, prey);
    }
    world.occupancy.move_entity(from, dest, id);

    let Some(entity) = world.entities.get_mut(id) else {
        return MoveOutcome::Stayed;
    };
    entity.position = dest;

    match prey {
        Some(prey) => {
            entity.feed();
            entity.kills += 1;
            world.counters.kills += 1;
            debug!(
                event = "attack_move",
                predator = %id,
                prey = %prey,
                x = dest.x,
                y = dest.y,
                tick = world.tick,
                "Predator moved onto prey"
            );
            MoveOutcome::Attacked { to: dest, prey }
        }
        None => MoveOutcome::Moved(dest),
    }
}

/// Cooldown-gated movement for one tick
pub fn step_movement<R: Rng + ?Sized>(world: &mut WorldState, id: EntityId, rng: &mut R) -> MoveOutcome {
    let Some(entity) = world.entities.get_mut(id) else {
        return MoveOutcome::Stayed;
    };
    if entity.move_cooldown > 0 {
        entity.move_cooldown -= 1;
        return MoveOutcome::Waiting;
    }
    entity.move_cooldown = entity.move_delay;
    resolve_move(world, id, rng)
}
