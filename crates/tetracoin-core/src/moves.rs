//! Player moves: the handler shared by the solver and any front end.

use crate::entity::{Direction, EntityId};
use crate::grid::GridState;
use crate::physics::{settle, INITIAL_SETTLE_TICKS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Push one movable entity a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub entity_id: EntityId,
    pub direction: Direction,
}

impl Move {
    pub fn new(entity_id: EntityId, direction: Direction) -> Self {
        Self {
            entity_id,
            direction,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.entity_id, self.direction)
    }
}

/// Why a move was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no live entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("entity {id} is a {kind} and cannot be moved")]
    NotMovable { id: EntityId, kind: &'static str },
    #[error("moving entity {0} would leave the grid")]
    OutOfBounds(EntityId),
    #[error("destination ({row}, {col}) is occupied")]
    Occupied { row: usize, col: usize },
}

/// Move without settling. The grid is left untouched on error.
pub(crate) fn shift(grid: &mut GridState, mv: Move) -> Result<(), MoveError> {
    let (row, col) = {
        let entity = grid
            .entity(mv.entity_id)
            .filter(|e| e.is_live())
            .ok_or(MoveError::UnknownEntity(mv.entity_id))?;
        if !entity.kind.is_movable() {
            return Err(MoveError::NotMovable {
                id: entity.id,
                kind: entity.kind.name(),
            });
        }
        (entity.row, entity.col)
    };

    let (dr, dc) = mv.direction.delta();
    let dest = grid
        .offset(row, col, dr, dc)
        .ok_or(MoveError::OutOfBounds(mv.entity_id))?;
    if !grid.is_empty(dest.row, dest.col) {
        return Err(MoveError::Occupied {
            row: dest.row,
            col: dest.col,
        });
    }

    if let Some(entity) = grid.entity_mut(mv.entity_id) {
        entity.row = dest.row;
        entity.col = dest.col;
    }
    Ok(())
}

/// Validate and apply a move, then settle the result
pub fn apply_move(grid: &GridState, mv: Move, max_ticks: usize) -> Result<GridState, MoveError> {
    let mut next = grid.clone();
    shift(&mut next, mv)?;
    Ok(settle(&next, max_ticks).grid)
}

/// Settle the starting grid, then apply each move in order
pub fn replay(grid: &GridState, moves: &[Move], max_ticks: usize) -> Result<GridState, MoveError> {
    let mut current = settle(grid, INITIAL_SETTLE_TICKS).grid;
    for mv in moves {
        current = apply_move(&current, *mv, max_ticks)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Color, EntityKind};
    use crate::physics::MOVE_SETTLE_TICKS;

    #[test]
    fn test_moving_blocker_releases_coin() {
        let mut grid = GridState::new(3, 3);
        grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
        let block = grid.spawn(EntityKind::Obstacle, None, 1, 1).unwrap();
        grid.spawn(EntityKind::FixedBlock, None, 0, 0).unwrap();
        grid.spawn(EntityKind::FixedBlock, None, 0, 2).unwrap();
        grid.spawn(EntityKind::container(1), Some(Color::Red), 2, 1)
            .unwrap();

        let start = settle(&grid, INITIAL_SETTLE_TICKS).grid;
        assert_eq!(start.uncollected_coins(), 1);

        let after = apply_move(&start, Move::new(block, Direction::Left), MOVE_SETTLE_TICKS).unwrap();
        assert_eq!(after.uncollected_coins(), 0);
        assert_eq!(after.entity(block).map(|e| e.col), Some(0));
    }

    #[test]
    fn test_rejects_illegal_moves() {
        let mut grid = GridState::new(2, 2);
        let coin = grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 0).unwrap();
        let block = grid.spawn(EntityKind::Obstacle, None, 1, 0).unwrap();
        let wall = grid.spawn(EntityKind::FixedBlock, None, 1, 1).unwrap();

        assert_eq!(
            apply_move(&grid, Move::new(99, Direction::Up), 10),
            Err(MoveError::UnknownEntity(99))
        );
        assert!(matches!(
            apply_move(&grid, Move::new(coin, Direction::Right), 10),
            Err(MoveError::NotMovable { .. })
        ));
        assert!(matches!(
            apply_move(&grid, Move::new(wall, Direction::Up), 10),
            Err(MoveError::NotMovable { .. })
        ));
        assert_eq!(
            apply_move(&grid, Move::new(block, Direction::Down), 10),
            Err(MoveError::OutOfBounds(block))
        );
        assert_eq!(
            apply_move(&grid, Move::new(block, Direction::Up), 10),
            Err(MoveError::Occupied { row: 0, col: 0 })
        );
    }

    #[test]
    fn test_move_display() {
        assert_eq!(Move::new(4, Direction::Left).to_string(), "#4 LEFT");
    }
}
