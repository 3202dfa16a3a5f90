//! Population telemetry read by stats/UI collaborators once per frame.

use crate::{RunId, TraitKind, TraitSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How often children switched food source relative to their parent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationTally {
    pub producer_to_predator: u64,
    pub predator_to_producer: u64,
}

impl MutationTally {
    /// Record one inheritance event
    pub fn record(&mut self, parent: &TraitSet, child: &TraitSet) {
        if parent.contains(TraitKind::Producer) && child.contains(TraitKind::Predator) {
            self.producer_to_predator += 1;
        } else if parent.contains(TraitKind::Predator) && child.contains(TraitKind::Producer) {
            self.predator_to_producer += 1;
        }
    }
}

/// Cumulative event counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCounters {
    pub births: u64,
    pub starvations: u64,
    pub kills: u64,
    pub reproduction_attempts: u64,
    /// Successful chance rolls that found no free adjacent cell
    pub placement_failures: u64,
}

/// Read-only snapshot of the simulation's population
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationStats {
    pub run_id: Option<RunId>,
    pub tick: u64,
    pub paused: bool,
    pub speed_multiplier: f64,
    pub entity_count: usize,
    pub producers: usize,
    pub predators: usize,
    /// Entities per trait combination label (e.g. `producer+swift`)
    pub by_combination: BTreeMap<String, usize>,
    pub food_count: usize,
    pub max_food: usize,
    pub min_food_target: usize,
    pub grid_width: i32,
    pub grid_height: i32,
    pub counters: LifetimeCounters,
    pub tally: MutationTally,
}

impl PopulationStats {
    /// Count one entity's trait combination
    pub fn add_entity(&mut self, traits: &TraitSet) {
        self.entity_count += 1;
        if traits.contains(TraitKind::Producer) {
            self.producers += 1;
        }
        if traits.contains(TraitKind::Predator) {
            self.predators += 1;
        }
        *self.by_combination.entry(traits.label()).or_insert(0) += 1;
    }

    pub fn total_cells(&self) -> usize {
        (self.grid_width.max(0) as usize) * (self.grid_height.max(0) as usize)
    }

    /// Fraction of cells held by entities
    pub fn occupancy_ratio(&self) -> f64 {
        let cells = self.total_cells();
        if cells == 0 {
            0.0
        } else {
            self.entity_count as f64 / cells as f64
        }
    }
}
