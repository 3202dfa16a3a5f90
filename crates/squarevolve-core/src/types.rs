//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, Key};
use std::fmt;
use uuid::Uuid;

/// Identifier for one initialization of the simulation (changes on every reset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

new_key_type! {
    /// Stable handle to an entity in the arena.
    ///
    /// Keys carry a slot version, so a handle held past the entity's death
    /// never aliases its successor.
    pub struct EntityId;
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ffi = self.data().as_ffi();
        write!(f, "{}v{}", ffi & 0xffff_ffff, ffi >> 32)
    }
}

/// 2D position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Chebyshev (king-move) distance to another position
    pub fn chebyshev_distance(&self, other: &Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Center of this cell in pixel space
    pub fn to_pixel(&self, cell_size: u32) -> PixelPosition {
        let cell = cell_size as f32;
        PixelPosition {
            x: self.x as f32 * cell + cell / 2.0,
            y: self.y as f32 * cell + cell / 2.0,
        }
    }
}

/// Derived pixel coordinates, recomputed from grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: f32,
    pub y: f32,
}

/// Map a pixel coordinate back onto the grid, clamped to its bounds
pub fn pixel_to_grid(px: f32, py: f32, cell_size: u32, width: i32, height: i32) -> Position {
    let cell = cell_size.max(1) as f32;
    let gx = (px / cell).floor() as i32;
    let gy = (py / cell).floor() as i32;
    Position::new(
        gx.clamp(0, (width - 1).max(0)),
        gy.clamp(0, (height - 1).max(0)),
    )
}

/// Direction for movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::NorthEast => (1, -1),
            Direction::SouthEast => (1, 1),
            Direction::SouthWest => (-1, 1),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn all() -> [Direction; 8] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::NorthEast,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::NorthWest,
        ]
    }
}

/// The closed vocabulary of inheritable traits.
///
/// Declaration order is the registry order: behaviors run, spawn chances are
/// rolled and colors are resolved in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKind {
    /// Eats food items (the founder trait)
    Producer,
    /// Eats co-located non-predator entities
    Predator,
    /// Moves more often, gets hungry faster
    Swift,
    /// Moves less often, gets hungry slower
    Sluggish,
}

impl TraitKind {
    pub const ALL: [TraitKind; 4] = [
        TraitKind::Producer,
        TraitKind::Predator,
        TraitKind::Swift,
        TraitKind::Sluggish,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn name(self) -> &'static str {
        match self {
            TraitKind::Producer => "producer",
            TraitKind::Predator => "predator",
            TraitKind::Swift => "swift",
            TraitKind::Sluggish => "sluggish",
        }
    }
}

impl fmt::Display for TraitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Traits of which an entity may carry at most one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionGroup {
    FoodSource,
    Locomotion,
}

/// Small bitset over [`TraitKind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet(u8);

impl TraitSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn contains(&self, kind: TraitKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: TraitKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: TraitKind) {
        self.0 &= !kind.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate held traits in registry order
    pub fn iter(&self) -> impl Iterator<Item = TraitKind> + '_ {
        TraitKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Stable label for a trait combination, e.g. `predator+swift` or `none`
    pub fn label(&self) -> String {
        if self.is_empty() {
            return "none".to_string();
        }
        self.iter().map(TraitKind::name).collect::<Vec<_>>().join("+")
    }
}

impl FromIterator<TraitKind> for TraitSet {
    fn from_iter<I: IntoIterator<Item = TraitKind>>(iter: I) -> Self {
        let mut set = TraitSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// RGBA display color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Move each channel toward white (`amount > 0`) or black (`amount < 0`)
    pub fn shade(&self, amount: f32) -> Self {
        let amount = amount.clamp(-1.0, 1.0);
        let channel = |c: u8| -> u8 {
            let c = c as f32;
            let shifted = if amount >= 0.0 {
                c + (255.0 - c) * amount
            } else {
                c * (1.0 + amount)
            };
            shifted.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: channel(self.r),
            g: channel(self.g),
            b: channel(self.b),
            a: self.a,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a >= 1.0 {
            write!(f, "{}", self.to_hex())
        } else {
            write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_entity_id_display_tracks_slot_version() {
        let mut slots: SlotMap<EntityId, ()> = SlotMap::with_key();
        let a = slots.insert(());
        slots.remove(a);
        let b = slots.insert(());

        let a_label = a.to_string();
        let b_label = b.to_string();
        let (a_index, a_version) = a_label.split_once('v').unwrap();
        let (b_index, b_version) = b_label.split_once('v').unwrap();
        assert_eq!(a_index, b_index);
        assert_ne!(a_version, b_version);
        assert_ne!(a, b);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = Position::new(0, 0);
        assert_eq!(a.chebyshev_distance(&Position::new(3, 4)), 4);
        assert_eq!(a.chebyshev_distance(&Position::new(-2, 1)), 2);
    }

    #[test]
    fn test_pixel_round_trip_is_clamped() {
        let pos = Position::new(3, 2);
        let px = pos.to_pixel(20);
        assert_eq!(px, PixelPosition { x: 70.0, y: 50.0 });
        assert_eq!(pixel_to_grid(px.x, px.y, 20, 10, 10), pos);
        assert_eq!(pixel_to_grid(-5.0, 999.0, 20, 10, 10), Position::new(0, 9));
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::North.to_delta(), (0, -1));
        assert_eq!(Direction::South.to_delta(), (0, 1));
        assert_eq!(Direction::East.to_delta(), (1, 0));
        assert_eq!(Direction::West.to_delta(), (-1, 0));
        let unique: std::collections::HashSet<_> =
            Direction::all().iter().map(|d| d.to_delta()).collect();
        assert_eq!(unique.len(), 8);
    }

    #[test]
    fn test_trait_set_ops() {
        let mut set = TraitSet::empty();
        assert!(set.is_empty());
        set.insert(TraitKind::Swift);
        set.insert(TraitKind::Predator);
        assert_eq!(set.len(), 2);
        assert_eq!(set.label(), "predator+swift");
        set.remove(TraitKind::Swift);
        assert!(!set.contains(TraitKind::Swift));
        assert_eq!(TraitSet::empty().label(), "none");
    }

    #[test]
    fn test_color_shade() {
        let c = Color::rgb(100, 100, 100);
        assert_eq!(c.shade(0.5), Color::rgb(178, 178, 178));
        assert_eq!(c.shade(-0.5), Color::rgb(50, 50, 50));
        assert_eq!(Color::rgb(0x3b, 0x82, 0xf6).to_hex(), "#3b82f6");
    }
}
