//! Cell → entity occupancy index for the bounded grid.

use squarevolve_core::{cell_count, clamp_grid_dimensions, Direction, EntityId, Position};

/// Row-major grid holding at most one entity handle per cell
#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    pub width: i32,
    pub height: i32,
    cells: Vec<Option<EntityId>>,
}

impl OccupancyIndex {
    pub fn new(width: i32, height: i32) -> Self {
        let (width, height) = clamp_grid_dimensions(width, height);
        Self {
            width,
            height,
            cells: vec![None; cell_count(width, height)],
        }
    }

    pub fn total_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    /// Entity occupying `pos`; out-of-bounds cells are never occupied by anyone
    pub fn get(&self, pos: Position) -> Option<EntityId> {
        self.pos_to_index(pos).and_then(|i| self.cells[i])
    }

    /// Claim `pos` for `id`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Position, id: EntityId) {
        debug_assert!(self.in_bounds(pos), "set out of bounds: {:?}", pos);
        if let Some(i) = self.pos_to_index(pos) {
            self.cells[i] = Some(id);
        }
    }

    pub fn clear(&mut self, pos: Position) {
        if let Some(i) = self.pos_to_index(pos) {
            self.cells[i] = None;
        }
    }

    /// Clear `pos` only while it still belongs to `id`
    pub fn release(&mut self, pos: Position, id: EntityId) {
        if self.get(pos) == Some(id) {
            self.clear(pos);
        }
    }

    /// True when `pos` is out of bounds or held by someone other than `excluding`
    pub fn is_occupied(&self, pos: Position, excluding: Option<EntityId>) -> bool {
        match self.pos_to_index(pos) {
            None => true,
            Some(i) => match self.cells[i] {
                None => false,
                Some(occupant) => Some(occupant) != excluding,
            },
        }
    }

    /// Move `id` from `from` to `to` in one step
    pub fn move_entity(&mut self, from: Position, to: Position, id: EntityId) {
        self.release(from, id);
        self.set(to, id);
    }

    /// In-bounds 8-neighborhood of `pos`
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        Direction::all().into_iter().filter_map(move |dir| {
            let (dx, dy) = dir.to_delta();
            let next = pos.add(dx, dy);
            self.in_bounds(next).then_some(next)
        })
    }

    /// Occupied cells within Chebyshev `radius` of `center`, not counting `excluding`.
    ///
    /// Only the clipped window around `center` is visited.
    pub fn count_within(&self, center: Position, radius: i32, excluding: Option<EntityId>) -> u32 {
        let radius = radius.max(0);
        let x0 = (center.x - radius).max(0);
        let x1 = (center.x + radius).min(self.width - 1);
        let y0 = (center.y - radius).max(0);
        let y1 = (center.y + radius).min(self.height - 1);

        let mut count = 0;
        for y in y0..=y1 {
            let row = (y * self.width) as usize;
            for x in x0..=x1 {
                if let Some(occupant) = self.cells[row + x as usize] {
                    if Some(occupant) != excluding {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    /// Closest free cell to `pos` by Chebyshev ring, scanning rows within a ring
    pub fn nearest_free(&self, pos: Position) -> Option<Position> {
        let start = Position::new(
            pos.x.clamp(0, self.width - 1),
            pos.y.clamp(0, self.height - 1),
        );
        let max_radius = self.width.max(self.height);
        for radius in 0..=max_radius {
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let candidate = start.add(dx, dy);
                    if !self.is_occupied(candidate, None) {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }

    /// Resize and forget every entry; callers re-insert their entities
    pub fn resize(&mut self, width: i32, height: i32) {
        *self = Self::new(width, height);
    }

    /// Replace all entries with `entries`. Later entries win on collisions.
    pub fn rebuild<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (EntityId, Position)>,
    {
        self.cells.iter_mut().for_each(|cell| *cell = None);
        for (id, pos) in entries {
            if self.in_bounds(pos) {
                self.set(pos, id);
            }
        }
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Iterator over all occupied cells
    pub fn iter(&self) -> impl Iterator<Item = (Position, EntityId)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, cell)| cell.map(|id| (self.index_to_pos(i), id)))
    }

    fn pos_to_index(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }
}
