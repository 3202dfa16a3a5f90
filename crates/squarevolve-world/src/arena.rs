//! Entity storage on a generational slot map.
//!
//! Besides the slot map the arena keeps the population order (birth order),
//! which the step driver walks in reverse. Removing an entity frees its slot
//! at once; the order list is only compacted at the end of a tick, and
//! iteration skips keys whose entity is gone.

use crate::entity::Entity;
use slotmap::SlotMap;
use squarevolve_core::EntityId;

#[derive(Debug, Clone, Default)]
pub struct EntityArena {
    entities: SlotMap<EntityId, Entity>,
    order: Vec<EntityId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity and append it to the population order
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = self.entities.insert(entity);
        self.order.push(id);
        id
    }

    /// Remove an entity; every outstanding key to it goes stale
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live keys in population order, detached from the arena
    pub fn snapshot(&self) -> Vec<EntityId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.entities.contains_key(*id))
            .collect()
    }

    /// Live entities in population order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.entities.get(*id).map(|entity| (*id, entity)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> + '_ {
        self.entities.values_mut()
    }

    /// Drop stale keys from the population order
    pub fn compact(&mut self) {
        let entities = &self.entities;
        self.order.retain(|id| entities.contains_key(*id));
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.order.clear();
    }
}
