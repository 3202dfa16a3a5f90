//! Grid world engine.
//!
//! Entities live on a bounded grid, eat food or each other, move, reproduce
//! with inherited traits and starve. [`Simulation`] drives one tick per frame.

pub mod arena;
pub mod control;
pub mod entity;
pub mod food;
pub mod lifecycle;
pub mod movement;
pub mod mutation;
pub mod occupancy;
pub mod simulation;
pub mod state;

pub use arena::EntityArena;
pub use control::{apply_control_command, ControlCommand};
pub use entity::Entity;
pub use food::{FoodField, FoodItem};
pub use mutation::{MutationRegistry, TraitDefinition};
pub use occupancy::OccupancyIndex;
pub use simulation::{FrameOutcome, RenderFrame, Simulation, TickReport};
pub use state::{SimParams, WorldState};
