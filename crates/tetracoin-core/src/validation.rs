//! Move-free reachability filter.
//!
//! Each coin gets a BFS over cells that treats every coin and movable entity as
//! something the player can clear out of the way. The filter only ever says no
//! when the exact solver would say no too.

use crate::entity::{Color, Entity, EntityId, EntityKind, GateCondition, Side};
use crate::grid::{GridState, Position};
use std::collections::{HashSet, VecDeque};

/// What sits in a cell, as far as the filter cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    Open,
    Coin,
    Movable,
    Deflector(Side),
    Container(Option<Color>),
    /// A gateway that is or may become open
    PassGate,
    Solid,
}

struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    /// Something other than the current coin can rest on an empty cell
    spare_support: bool,
    /// A deflector can be swapped for another support
    spare_swap: bool,
}

impl Board {
    fn new(grid: &GridState) -> Self {
        let mut cells = vec![Cell::Open; grid.cell_count()];
        for e in grid.entities.iter().filter(|e| e.is_live()) {
            if grid.in_bounds(e.row, e.col) {
                cells[grid.index(e.row, e.col)] = classify(e);
            }
        }
        let coins = grid.uncollected_coins();
        let movables = grid.movable_count();
        Self {
            rows: grid.rows,
            cols: grid.cols,
            cells,
            spare_support: movables >= 1 || coins > 1,
            spare_swap: movables >= 2 || coins > 1,
        }
    }

    fn at(&self, p: Position) -> Cell {
        self.cells[p.row * self.cols + p.col]
    }

    fn offset(&self, p: Position, dr: usize, dc: isize) -> Option<Position> {
        let r = p.row + dr;
        let c = p.col.checked_add_signed(dc)?;
        (r < self.rows && c < self.cols).then_some(Position::new(r, c))
    }

    fn traversable(&self, p: Position) -> bool {
        matches!(
            self.at(p),
            Cell::Open | Cell::Coin | Cell::Movable | Cell::Deflector(_)
        )
    }

    /// Sides a coin at `p` may slide toward, given what is below it
    fn slide_sides(&self, below: Cell) -> &'static [Side] {
        match below {
            Cell::Container(_) => &[],
            Cell::Open if !self.spare_support => &[],
            Cell::Deflector(Side::Left) if !self.spare_swap => &[Side::Left],
            Cell::Deflector(Side::Right) if !self.spare_swap => &[Side::Right],
            _ => &Side::BOTH,
        }
    }

    /// Whether a coin of `color` starting at `start` can reach a matching container
    fn coin_reaches(&self, start: Position, color: Option<Color>) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(pos) = queue.pop_front() {
            let Some(below_pos) = self.offset(pos, 1, 0) else {
                continue;
            };
            let below = self.at(below_pos);

            let mut next = Vec::with_capacity(3);
            match below {
                Cell::Container(c) if c.is_some() && c == color => return true,
                Cell::PassGate => {
                    if let Some(beyond) = self.offset(pos, 2, 0) {
                        match self.at(beyond) {
                            Cell::Container(c) if c.is_some() && c == color => return true,
                            _ if self.traversable(beyond) => next.push(beyond),
                            _ => {}
                        }
                    }
                }
                _ if self.traversable(below_pos) => next.push(below_pos),
                _ => {}
            }

            for side in self.slide_sides(below) {
                let side_cell = self.offset(pos, 0, side.dc());
                let diag_cell = self.offset(pos, 1, side.dc());
                if let (Some(s), Some(d)) = (side_cell, diag_cell) {
                    if self.traversable(s) && self.traversable(d) {
                        next.push(d);
                    }
                }
            }

            for p in next {
                if visited.insert(p) {
                    queue.push_back(p);
                }
            }
        }
        false
    }
}

fn classify(e: &Entity) -> Cell {
    match &e.kind {
        EntityKind::Coin => Cell::Coin,
        EntityKind::Container { .. } => Cell::Container(e.color),
        EntityKind::Obstacle | EntityKind::Support => Cell::Movable,
        EntityKind::Deflector { direction } => Cell::Deflector(*direction),
        EntityKind::Gateway { is_open: true, .. }
        | EntityKind::Gateway {
            open_condition: GateCondition::CoinCount(_),
            ..
        } => Cell::PassGate,
        EntityKind::FixedBlock | EntityKind::Gateway { .. } | EntityKind::Trap { .. } => {
            Cell::Solid
        }
    }
}

/// Ids of live coins with no possible route to a matching container
pub fn unreachable_coins(grid: &GridState) -> Vec<EntityId> {
    let board = Board::new(grid);
    grid.coins()
        .filter(|coin| coin.is_live())
        .filter(|coin| {
            grid.containers_for(coin.color).next().is_none()
                || !board.coin_reaches(Position::new(coin.row, coin.col), coin.color)
        })
        .map(|coin| coin.id)
        .collect()
}

/// Cheap necessary condition for solvability
pub fn check_reachability(grid: &GridState) -> bool {
    let board = Board::new(grid);
    grid.coins().filter(|coin| coin.is_live()).all(|coin| {
        grid.containers_for(coin.color).next().is_some()
            && board.coin_reaches(Position::new(coin.row, coin.col), coin.color)
    })
}
