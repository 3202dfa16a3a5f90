//! Trait registry: definitions, inheritance rolls, per-tick behaviors and colors.

use crate::lifecycle;
use crate::state::WorldState;
use rand::Rng;
use serde::{Deserialize, Serialize};
use squarevolve_core::{Color, EntityId, ExclusionGroup, MutationConfig, TraitKind, TraitSet};
use tracing::debug;

/// Trait every founder starts with
pub const FOUNDER_TRAIT: TraitKind = TraitKind::Producer;

/// Color of an entity without a food-source trait
pub const BASE_COLOR: Color = Color::rgb(0x77, 0x77, 0x77);

/// Overlay shown on the "on" half of a dying entity's flash cycle
pub const DYING_FLASH_COLOR: Color = Color::rgba(255, 255, 255, 0.7);

/// Length of one flash phase in wall-clock milliseconds
pub const DYING_FLASH_PERIOD_MS: u128 = 100;

/// What a trait does once per tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TraitBehavior {
    /// Eat one food item on the entity's cell
    ConsumeFood,
    /// Eat one co-located entity that is not a predator
    ConsumePrey,
    /// Scale move delay and hunger rate, once per entity
    Locomotion { delay_factor: f64, hunger_factor: f64 },
}

/// How a trait affects the entity's color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TraitAppearance {
    /// Replaces the fill color
    Fill(Color),
    /// Lightens (positive) or darkens (negative) the fill color
    Shade(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitDefinition {
    pub kind: TraitKind,
    /// Chance per reproduction event that a child acquires the trait
    pub spawn_chance: f64,
    pub appearance: TraitAppearance,
    pub group: Option<ExclusionGroup>,
    /// Volatile traits may be lost during inheritance
    pub volatile: bool,
    pub behavior: TraitBehavior,
}

/// Built-in definitions in registry order
pub const DEFAULT_DEFINITIONS: [TraitDefinition; 4] = [
    TraitDefinition {
        kind: TraitKind::Producer,
        spawn_chance: 0.01,
        appearance: TraitAppearance::Fill(Color::rgb(0x3b, 0x82, 0xf6)),
        group: Some(ExclusionGroup::FoodSource),
        volatile: false,
        behavior: TraitBehavior::ConsumeFood,
    },
    TraitDefinition {
        kind: TraitKind::Predator,
        spawn_chance: 0.01,
        appearance: TraitAppearance::Fill(Color::rgb(0xef, 0x44, 0x44)),
        group: Some(ExclusionGroup::FoodSource),
        volatile: false,
        behavior: TraitBehavior::ConsumePrey,
    },
    TraitDefinition {
        kind: TraitKind::Swift,
        spawn_chance: 0.02,
        appearance: TraitAppearance::Shade(0.35),
        group: Some(ExclusionGroup::Locomotion),
        volatile: true,
        behavior: TraitBehavior::Locomotion {
            delay_factor: 0.5,
            hunger_factor: 1.5,
        },
    },
    TraitDefinition {
        kind: TraitKind::Sluggish,
        spawn_chance: 0.02,
        appearance: TraitAppearance::Shade(-0.35),
        group: Some(ExclusionGroup::Locomotion),
        volatile: true,
        behavior: TraitBehavior::Locomotion {
            delay_factor: 2.0,
            hunger_factor: 0.75,
        },
    },
];

/// Outcome of one behavior pass over an entity's traits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEffects {
    pub ate_food: bool,
    pub prey: Option<EntityId>,
}

impl TickEffects {
    pub fn consumed(&self) -> bool {
        self.ate_food || self.prey.is_some()
    }
}

pub struct MutationRegistry {
    config: MutationConfig,
    definitions: Vec<TraitDefinition>,
}

impl MutationRegistry {
    pub fn new(config: MutationConfig) -> Self {
        Self::with_definitions(config, DEFAULT_DEFINITIONS.to_vec())
    }

    /// Registry with a custom table; table order becomes registry order
    pub fn with_definitions(config: MutationConfig, definitions: Vec<TraitDefinition>) -> Self {
        Self {
            config,
            definitions,
        }
    }

    pub fn definitions(&self) -> &[TraitDefinition] {
        &self.definitions
    }

    pub fn definition(&self, kind: TraitKind) -> Option<&TraitDefinition> {
        self.definitions.iter().find(|def| def.kind == kind)
    }

    /// Traits for a new entity.
    ///
    /// Founders get [`FOUNDER_TRAIT`]. Children copy the parent, may lose each
    /// volatile trait, then roll every trait they do not hold.
    pub fn roll_traits<R: Rng + ?Sized>(&self, parent: Option<&TraitSet>, rng: &mut R) -> TraitSet {
        let Some(parent) = parent else {
            let mut traits = TraitSet::empty();
            traits.insert(FOUNDER_TRAIT);
            return traits;
        };

        let mut traits = *parent;

        for def in &self.definitions {
            if def.volatile
                && traits.contains(def.kind)
                && rng.gen::<f64>() < self.config.volatile_loss_chance
            {
                traits.remove(def.kind);
            }
        }

        for def in &self.definitions {
            if traits.contains(def.kind) {
                continue;
            }
            if rng.gen::<f64>() < def.spawn_chance {
                self.acquire(&mut traits, def.kind);
            }
        }

        traits
    }

    /// Add `kind`, evicting every other trait of its exclusion group
    pub fn acquire(&self, traits: &mut TraitSet, kind: TraitKind) {
        let group = self.definition(kind).and_then(|def| def.group);
        if let Some(group) = group {
            for other in &self.definitions {
                if other.kind != kind && other.group == Some(group) {
                    traits.remove(other.kind);
                }
            }
        }
        traits.insert(kind);
    }

    /// Run every held trait's behavior for `id`, in registry order.
    ///
    /// Each trait feeds at most once. When anything was eaten the entity's
    /// hunger is reset.
    pub fn tick(&self, id: EntityId, world: &mut WorldState) -> TickEffects {
        let mut effects = TickEffects::default();
        let Some(traits) = world.entities.get(id).map(|e| e.traits) else {
            return effects;
        };

        for def in &self.definitions {
            if !traits.contains(def.kind) {
                continue;
            }
            match def.behavior {
                TraitBehavior::ConsumeFood => {
                    if feed_on_food(world, id) {
                        effects.ate_food = true;
                    }
                }
                TraitBehavior::ConsumePrey => {
                    if let Some(prey) = feed_on_prey(world, id) {
                        effects.prey = Some(prey);
                    }
                }
                TraitBehavior::Locomotion {
                    delay_factor,
                    hunger_factor,
                } => apply_locomotion(world, id, def.kind, delay_factor, hunger_factor),
            }
        }

        if effects.consumed() {
            if let Some(entity) = world.entities.get_mut(id) {
                entity.hunger = 0.0;
            }
        }
        effects
    }

    /// Display color for `traits`, ignoring the dying flash
    pub fn trait_color(&self, traits: &TraitSet) -> Color {
        let mut color = [TraitKind::Predator, TraitKind::Producer]
            .into_iter()
            .filter(|kind| traits.contains(*kind))
            .find_map(|kind| match self.definition(kind)?.appearance {
                TraitAppearance::Fill(c) => Some(c),
                TraitAppearance::Shade(_) => None,
            })
            .unwrap_or(BASE_COLOR);

        for def in &self.definitions {
            if let TraitAppearance::Shade(amount) = def.appearance {
                if traits.contains(def.kind) {
                    color = color.shade(amount);
                }
            }
        }
        color
    }

    /// Display color at wall-clock time `now_ms`; dying entities flash
    pub fn color_at(&self, traits: &TraitSet, is_dying: bool, now_ms: u128) -> Color {
        if is_dying && (now_ms / DYING_FLASH_PERIOD_MS) % 2 == 0 {
            return DYING_FLASH_COLOR;
        }
        self.trait_color(traits)
    }
}

fn feed_on_food(world: &mut WorldState, id: EntityId) -> bool {
    let Some(pos) = world.entities.get(id).map(|e| e.position) else {
        return false;
    };
    if !world.food.consume_at(pos) {
        return false;
    }
    if let Some(entity) = world.entities.get_mut(id) {
        entity.feed();
    }
    true
}

/// Eat the last co-located non-predator in population order
fn feed_on_prey(world: &mut WorldState, id: EntityId) -> Option<EntityId> {
    let pos = world.entities.get(id)?.position;
    let prey = world
        .entities
        .iter()
        .filter(|(other, e)| *other != id && e.position == pos && !e.is_predator())
        .map(|(other, _)| other)
        .last()?;

    lifecycle::remove_entity(world, prey);
    // The predator keeps (or reclaims) the cell it stands on
    world.occupancy.set(pos, id);
    if let Some(predator) = world.entities.get_mut(id) {
        predator.feed();
        predator.kills += 1;
    }
    world.counters.kills += 1;
    debug!(
        event = "predation",
        predator = %id,
        prey = %prey,
        x = pos.x,
        y = pos.y,
        tick = world.tick,
        "Predator ate co-located prey"
    );
    Some(prey)
}

fn apply_locomotion(
    world: &mut WorldState,
    id: EntityId,
    kind: TraitKind,
    delay_factor: f64,
    hunger_factor: f64,
) {
    let Some(entity) = world.entities.get_mut(id) else {
        return;
    };
    if entity.applied_modifiers.contains(kind) {
        return;
    }
    let scaled = (entity.move_delay as f64 * delay_factor).round() as u32;
    entity.move_delay = scaled.max(1);
    entity.move_cooldown = entity.move_cooldown.min(entity.move_delay);
    entity.hunger_rate *= hunger_factor;
    entity.applied_modifiers.insert(kind);
}
