//! Food items and the replenishment policy.
//!
//! Food is a separate layer from occupancy: any cell may hold food and an
//! entity at the same time, and several food items may pile onto one cell.

use rand::Rng;
use serde::{Deserialize, Serialize};
use squarevolve_core::{cell_count, clamp_grid_dimensions, PixelPosition, Position};

/// Food radius relative to the cell
pub const FOOD_RADIUS_RATIO: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub position: Position,
}

impl FoodItem {
    pub fn pixel_position(&self, cell_size: u32) -> PixelPosition {
        self.position.to_pixel(cell_size)
    }
}

#[derive(Debug, Clone)]
pub struct FoodField {
    items: Vec<FoodItem>,
    /// Items per cell, row-major, so empty cells short-circuit lookups
    counts: Vec<u32>,
    width: i32,
    height: i32,
    max_food: usize,
    min_food_target: usize,
    min_food_fraction: f64,
}

impl FoodField {
    pub fn new(width: i32, height: i32, min_food_fraction: f64) -> Self {
        let (width, height) = clamp_grid_dimensions(width, height);
        Self {
            items: Vec::new(),
            counts: vec![0; cell_count(width, height)],
            width,
            height,
            max_food: cell_count(width, height),
            min_food_target: 0,
            min_food_fraction: min_food_fraction.clamp(0.0, 1.0),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    pub fn max_food(&self) -> usize {
        self.max_food
    }

    pub fn min_food_target(&self) -> usize {
        self.min_food_target
    }

    pub fn min_food_fraction(&self) -> f64 {
        self.min_food_fraction
    }

    /// Set the user fraction; takes effect on the next [`Self::compute_limits`]
    pub fn set_min_food_fraction(&mut self, fraction: f64) {
        self.min_food_fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
    }

    /// Recompute capacity and top-up target from the free (non-entity) cells.
    ///
    /// The target is rounded to the nearest ten. When capacity shrank below the
    /// current food count the newest items are discarded.
    pub fn compute_limits(&mut self, total_cells: usize, live_entities: usize, is_initial: bool) {
        self.max_food = total_cells.saturating_sub(live_entities);
        let basis = if is_initial { total_cells } else { self.max_food };
        let raw = basis as f64 * self.min_food_fraction;
        let rounded = ((raw / 10.0).round() * 10.0).max(0.0) as usize;
        self.min_food_target = rounded.min(self.max_food);

        if self.items.len() > self.max_food {
            for item in self.items.drain(self.max_food..) {
                let i = (item.position.y * self.width + item.position.x) as usize;
                self.counts[i] -= 1;
            }
        }
    }

    /// Spawn up to `amount` items on uniformly random cells, never past capacity.
    /// Returns how many were added.
    pub fn add<R: Rng + ?Sized>(&mut self, amount: usize, rng: &mut R) -> usize {
        let to_add = amount.min(self.max_food.saturating_sub(self.items.len()));
        for _ in 0..to_add {
            let pos = Position::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height));
            self.push(pos);
        }
        to_add
    }

    /// Add food until `target` items exist or capacity runs out
    pub fn top_up<R: Rng + ?Sized>(&mut self, target: usize, rng: &mut R) -> usize {
        self.add(target.saturating_sub(self.items.len()), rng)
    }

    /// Place one item at a fixed cell, respecting capacity
    pub fn place(&mut self, pos: Position) -> bool {
        if !self.in_bounds(pos) || self.items.len() >= self.max_food {
            return false;
        }
        self.push(pos);
        true
    }

    pub fn count_at(&self, pos: Position) -> u32 {
        if self.in_bounds(pos) {
            self.counts[(pos.y * self.width + pos.x) as usize]
        } else {
            0
        }
    }

    /// Remove at most one item lying on `pos`
    pub fn consume_at(&mut self, pos: Position) -> bool {
        if self.count_at(pos) == 0 {
            return false;
        }
        match self.items.iter().rposition(|item| item.position == pos) {
            Some(i) => {
                self.items.swap_remove(i);
                self.counts[(pos.y * self.width + pos.x) as usize] -= 1;
                true
            }
            None => false,
        }
    }

    /// Adopt new grid dimensions, dropping items that fall outside
    pub fn resize(&mut self, width: i32, height: i32) {
        let (w, h) = clamp_grid_dimensions(width, height);
        self.width = w;
        self.height = h;
        self.items
            .retain(|item| item.position.x < w && item.position.y < h);
        self.counts = vec![0; cell_count(w, h)];
        for item in &self.items {
            self.counts[(item.position.y * w + item.position.x) as usize] += 1;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    fn push(&mut self, pos: Position) {
        self.counts[(pos.y * self.width + pos.x) as usize] += 1;
        self.items.push(FoodItem { position: pos });
    }

    fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_limits_round_to_tens() {
        let mut field = FoodField::new(10, 10, 0.15);
        field.compute_limits(100, 0, true);
        assert_eq!(field.max_food(), 100);
        // 15 rounds to 20
        assert_eq!(field.min_food_target(), 20);

        field.compute_limits(100, 40, false);
        assert_eq!(field.max_food(), 60);
        // 9 rounds to 10
        assert_eq!(field.min_food_target(), 10);
    }

    #[test]
    fn test_target_clamped_to_capacity() {
        let mut field = FoodField::new(10, 10, 1.0);
        field.compute_limits(100, 96, true);
        assert_eq!(field.max_food(), 4);
        assert_eq!(field.min_food_target(), 4);
    }

    #[test]
    fn test_add_never_exceeds_capacity() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut field = FoodField::new(5, 5, 0.5);
        field.compute_limits(25, 5, false);

        assert_eq!(field.add(15, &mut rng), 15);
        assert_eq!(field.add(15, &mut rng), 5);
        assert_eq!(field.add(1, &mut rng), 0);
        assert_eq!(field.len(), field.max_food());
    }

    #[test]
    fn test_top_up_reaches_target() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut field = FoodField::new(20, 20, 0.25);
        field.compute_limits(400, 0, true);
        let added = field.top_up(field.min_food_target(), &mut rng);
        assert_eq!(added, 100);
        assert_eq!(field.top_up(field.min_food_target(), &mut rng), 0);
    }

    #[test]
    fn test_consume_one_item_per_call() {
        let mut field = FoodField::new(4, 4, 0.0);
        let pos = Position::new(2, 2);
        assert!(field.place(pos));
        assert!(field.place(pos));
        assert_eq!(field.count_at(pos), 2);

        assert!(field.consume_at(pos));
        assert_eq!(field.count_at(pos), 1);
        assert_eq!(field.len(), 1);
        assert!(field.consume_at(pos));
        assert!(!field.consume_at(pos));
        assert!(!field.consume_at(Position::new(0, 0)));
    }

    #[test]
    fn test_shrinking_capacity_discards_excess() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut field = FoodField::new(10, 10, 0.0);
        field.compute_limits(100, 0, true);
        field.add(80, &mut rng);

        field.compute_limits(100, 50, false);
        assert_eq!(field.len(), 50);
        let mut total = 0;
        for y in 0..10 {
            for x in 0..10 {
                total += field.count_at(Position::new(x, y));
            }
        }
        assert_eq!(total, 50);
    }

    #[test]
    fn test_resize_drops_outside_items() {
        let mut field = FoodField::new(10, 10, 0.0);
        field.place(Position::new(1, 1));
        field.place(Position::new(8, 8));
        field.resize(5, 5);
        assert_eq!(field.len(), 1);
        assert_eq!(field.count_at(Position::new(1, 1)), 1);
    }

    #[test]
    fn test_fraction_is_clamped() {
        let mut field = FoodField::new(4, 4, 0.0);
        field.set_min_food_fraction(3.0);
        assert_eq!(field.min_food_fraction(), 1.0);
        field.set_min_food_fraction(-1.0);
        assert_eq!(field.min_food_fraction(), 0.0);
        field.set_min_food_fraction(f64::NAN);
        assert_eq!(field.min_food_fraction(), 0.0);
    }
}
