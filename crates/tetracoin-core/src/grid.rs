use crate::entity::{Color, Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A cell position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance between two cells
    pub fn distance(&self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

/// Errors raised when placing an entity
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("cell ({row}, {col}) is already occupied by entity {occupant}")]
    Occupied {
        row: usize,
        col: usize,
        occupant: EntityId,
    },
    #[error("entity ids are exhausted")]
    IdsExhausted,
}

/// Snapshot of the whole board: dimensions plus the entities it owns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridState {
    pub rows: usize,
    pub cols: usize,
    pub entities: Vec<Entity>,
}

impl GridState {
    /// Create an empty grid
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            entities: Vec::new(),
        }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Offset a cell, returning `None` when the result leaves the grid
    pub fn offset(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<Position> {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        self.in_bounds(r, c).then_some(Position::new(r, c))
    }

    /// Linear cell index
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Live entity occupying a cell
    pub fn entity_at(&self, row: usize, col: usize) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.is_live() && e.row == row && e.col == col)
    }

    /// True when the cell is inside the grid and holds no live entity
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && self.entity_at(row, col).is_none()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Next unused entity id
    pub fn next_id(&self) -> Result<EntityId, GridError> {
        match self.entities.iter().map(|e| e.id).max() {
            Some(top) => top.checked_add(1).ok_or(GridError::IdsExhausted),
            None => Ok(0),
        }
    }

    /// Add an entity to an empty in-bounds cell
    pub fn spawn(
        &mut self,
        kind: EntityKind,
        color: Option<Color>,
        row: usize,
        col: usize,
    ) -> Result<EntityId, GridError> {
        if !self.in_bounds(row, col) {
            return Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        if let Some(occupant) = self.entity_at(row, col) {
            return Err(GridError::Occupied {
                row,
                col,
                occupant: occupant.id,
            });
        }
        let id = self.next_id()?;
        self.entities.push(Entity::new(id, kind, color, row, col));
        Ok(id)
    }

    /// Remove an entity by id
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let idx = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(idx))
    }

    /// Per-cell index of the live entity occupying it
    pub fn occupancy(&self) -> Vec<Option<usize>> {
        let mut cells = vec![None; self.cell_count()];
        for (i, e) in self.entities.iter().enumerate() {
            if e.is_live() && self.in_bounds(e.row, e.col) {
                let idx = self.index(e.row, e.col);
                cells[idx] = Some(i);
            }
        }
        cells
    }

    /// Live entities matching a predicate
    pub fn live<'a>(
        &'a self,
        pred: impl Fn(&EntityKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Entity> + 'a {
        self.entities
            .iter()
            .filter(move |e| e.is_live() && pred(&e.kind))
    }

    /// All coins, collected or not
    pub fn coins(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.kind.is_coin())
    }

    pub fn containers(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.kind.is_container())
    }

    pub fn movables(&self) -> impl Iterator<Item = &Entity> {
        self.live(EntityKind::is_movable)
    }

    pub fn coin_count(&self) -> usize {
        self.coins().count()
    }

    pub fn uncollected_coins(&self) -> usize {
        self.coins().filter(|e| !e.is_collected).count()
    }

    pub fn movable_count(&self) -> usize {
        self.movables().count()
    }

    pub fn obstacle_count(&self) -> usize {
        self.live(EntityKind::is_obstacle).count()
    }

    /// Fraction of cells taken by obstacles of any kind
    pub fn obstacle_density(&self) -> f64 {
        if self.cell_count() == 0 {
            return 0.0;
        }
        self.obstacle_count() as f64 / self.cell_count() as f64
    }

    /// Sum of coins already absorbed by containers
    pub fn collected_total(&self) -> u32 {
        self.entities
            .iter()
            .map(|e| match e.kind {
                EntityKind::Container { current_count, .. } => current_count,
                _ => 0,
            })
            .sum()
    }

    /// Empty cells in row-major order
    pub fn empty_cells(&self) -> Vec<Position> {
        let occ = self.occupancy();
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| Position::new(r, c)))
            .filter(|p| occ[p.row * self.cols + p.col].is_none())
            .collect()
    }

    /// Empty cells above the bottom row, where coins and obstacles may go
    pub fn empty_upper_cells(&self) -> Vec<Position> {
        let bottom = self.rows.saturating_sub(1);
        self.empty_cells()
            .into_iter()
            .filter(|p| p.row < bottom)
            .collect()
    }

    /// Containers accepting coins of `color`
    pub fn containers_for(&self, color: Option<Color>) -> impl Iterator<Item = &Entity> {
        self.containers()
            .filter(move |e| color.is_some() && e.color == color)
    }

    /// Distance from a cell to the nearest container of `color`
    pub fn distance_to_container(&self, pos: Position, color: Option<Color>) -> Option<usize> {
        self.containers_for(color)
            .map(|pb| pos.distance(Position::new(pb.row, pb.col)))
            .min()
    }
}

impl std::fmt::Display for GridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occ = self.occupancy();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let glyph = occ[self.index(row, col)]
                    .map(|i| self.entities[i].glyph())
                    .unwrap_or('.');
                write!(f, "{}", glyph)?;
                if col + 1 < self.cols {
                    write!(f, " ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_rejects_out_of_bounds_and_occupied() {
        let mut grid = GridState::new(3, 3);
        let id = grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
        assert_eq!(id, 0);

        assert!(matches!(
            grid.spawn(EntityKind::Coin, Some(Color::Red), 3, 0),
            Err(GridError::OutOfBounds { .. })
        ));
        assert_eq!(
            grid.spawn(EntityKind::Obstacle, None, 0, 1),
            Err(GridError::Occupied {
                row: 0,
                col: 1,
                occupant: 0
            })
        );
    }

    #[test]
    fn test_collected_entities_free_their_cell() {
        let mut grid = GridState::new(2, 2);
        let id = grid.spawn(EntityKind::Coin, Some(Color::Blue), 1, 1).unwrap();
        assert!(!grid.is_empty(1, 1));
        grid.entity_mut(id).unwrap().is_collected = true;
        assert!(grid.is_empty(1, 1));
        assert_eq!(grid.uncollected_coins(), 0);
        assert_eq!(grid.coin_count(), 1);
    }

    #[test]
    fn test_next_id_after_removal() {
        let mut grid = GridState::new(3, 3);
        grid.spawn(EntityKind::Obstacle, None, 0, 0).unwrap();
        let b = grid.spawn(EntityKind::Obstacle, None, 0, 1).unwrap();
        grid.remove(0);
        assert_eq!(grid.next_id(), Ok(b + 1));
    }

    #[test]
    fn test_spawn_fails_when_ids_run_out() {
        let mut grid = GridState::new(2, 2);
        grid.entities
            .push(Entity::new(EntityId::MAX, EntityKind::Obstacle, None, 0, 0));
        assert_eq!(grid.next_id(), Err(GridError::IdsExhausted));
        assert_eq!(
            grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1),
            Err(GridError::IdsExhausted)
        );
        assert_eq!(grid.entities.len(), 1);
    }

    #[test]
    fn test_offset_stays_in_bounds() {
        let grid = GridState::new(2, 3);
        assert_eq!(grid.offset(0, 0, -1, 0), None);
        assert_eq!(grid.offset(0, 2, 0, 1), None);
        assert_eq!(grid.offset(0, 1, 1, 1), Some(Position::new(1, 2)));
    }

    #[test]
    fn test_display_renders_glyphs() {
        let mut grid = GridState::new(2, 2);
        grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 0).unwrap();
        grid.spawn(EntityKind::container(1), Some(Color::Red), 1, 0)
            .unwrap();
        assert_eq!(grid.to_string(), "r .\nR .\n");
    }

    #[test]
    fn test_obstacle_density() {
        let mut grid = GridState::new(2, 2);
        grid.spawn(EntityKind::FixedBlock, None, 0, 0).unwrap();
        grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
        assert!((grid.obstacle_density() - 0.25).abs() < 1e-9);
    }
}
