//! Breadth-first search over player moves.

use crate::entity::{Direction, EntityKind};
use crate::grid::GridState;
use crate::moves::{shift, Move};
use crate::physics::{settle, INITIAL_SETTLE_TICKS, MOVE_SETTLE_TICKS};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Configuration for the solver
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Upper bound on distinct states visited before giving up
    pub max_states: usize,
    /// Settle tick cap after each move
    pub settle_ticks: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_states: 50_000,
            settle_ticks: MOVE_SETTLE_TICKS,
        }
    }
}

/// Why the search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// A winning state was reached
    Solved,
    /// Every state within the depth budget was explored
    Exhausted,
    /// The visited-state cap was hit
    StateLimit,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Solved => write!(f, "solved"),
            Termination::Exhausted => write!(f, "search space exhausted"),
            Termination::StateLimit => write!(f, "state limit reached"),
        }
    }
}

/// Outcome of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveResult {
    pub found: bool,
    /// Shortest winning sequence when `found`
    pub moves: Vec<Move>,
    pub states_explored: usize,
    pub termination: Termination,
}

impl SolveResult {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    fn failed(states_explored: usize, termination: Termination) -> Self {
        Self {
            found: false,
            moves: Vec::new(),
            states_explored,
            termination,
        }
    }
}

/// Search node: grid plus the edge that produced it
struct Node {
    grid: GridState,
    parent: Option<usize>,
    via: Option<Move>,
    depth: usize,
}

/// Exact solver for move sequences
pub struct Solver {
    config: SolverConfig,
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver {
    /// Create a new solver with default configuration
    pub fn new() -> Self {
        Self {
            config: SolverConfig::default(),
        }
    }

    /// Create a solver with custom configuration
    pub fn with_config(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find a shortest move sequence that collects every coin
    pub fn solve(&self, grid: &GridState, max_depth: usize) -> SolveResult {
        let start = settle(grid, INITIAL_SETTLE_TICKS).grid;
        if is_won(&start) {
            return SolveResult {
                found: true,
                moves: Vec::new(),
                states_explored: 1,
                termination: Termination::Solved,
            };
        }

        let mut visited = HashSet::new();
        visited.insert(state_key(&start));
        let mut arena = vec![Node {
            grid: start,
            parent: None,
            via: None,
            depth: 0,
        }];
        let mut queue = VecDeque::from([0usize]);

        while let Some(current) = queue.pop_front() {
            if arena[current].depth >= max_depth {
                continue;
            }

            for mv in legal_moves(&arena[current].grid) {
                let mut next = arena[current].grid.clone();
                if shift(&mut next, mv).is_err() {
                    continue;
                }
                let next = settle(&next, self.config.settle_ticks).grid;
                if !visited.insert(state_key(&next)) {
                    continue;
                }

                let won = is_won(&next);
                arena.push(Node {
                    grid: next,
                    parent: Some(current),
                    via: Some(mv),
                    depth: arena[current].depth + 1,
                });
                let idx = arena.len() - 1;

                if won {
                    return SolveResult {
                        found: true,
                        moves: path_to(&arena, idx),
                        states_explored: visited.len(),
                        termination: Termination::Solved,
                    };
                }
                if visited.len() >= self.config.max_states {
                    log::debug!("solver stopped after {} states", visited.len());
                    return SolveResult::failed(visited.len(), Termination::StateLimit);
                }
                queue.push_back(idx);
            }
        }

        SolveResult::failed(visited.len(), Termination::Exhausted)
    }
}

/// Solve with the default configuration
pub fn solve(grid: &GridState, max_depth: usize) -> SolveResult {
    Solver::new().solve(grid, max_depth)
}

fn is_won(grid: &GridState) -> bool {
    grid.uncollected_coins() == 0
}

/// Every move of every live movable entity into an empty neighbour
pub fn legal_moves(grid: &GridState) -> Vec<Move> {
    let occ = grid.occupancy();
    let mut moves = Vec::new();
    for e in grid.movables() {
        for dir in Direction::ALL {
            let (dr, dc) = dir.delta();
            if let Some(dest) = grid.offset(e.row, e.col, dr, dc) {
                if occ[grid.index(dest.row, dest.col)].is_none() {
                    moves.push(Move::new(e.id, dir));
                }
            }
        }
    }
    moves
}

/// Canonical dedup key.
///
/// Entities are kept in a stable order, so walking the list yields the same
/// layout for equal states: movable cells, container fills, coin cells (or a
/// marker once collected) and gateway flags.
fn state_key(grid: &GridState) -> Vec<u32> {
    const COLLECTED: u32 = u32::MAX;
    let mut key = Vec::with_capacity(grid.entities.len());
    for e in &grid.entities {
        let cell = (e.row * grid.cols + e.col) as u32;
        match &e.kind {
            EntityKind::Coin => key.push(if e.is_collected { COLLECTED } else { cell }),
            EntityKind::Container { current_count, .. } => key.push(*current_count),
            EntityKind::Gateway { is_open, .. } => key.push(u32::from(*is_open)),
            kind if kind.is_movable() => key.push(cell),
            _ => {}
        }
    }
    key
}

fn path_to(arena: &[Node], mut idx: usize) -> Vec<Move> {
    let mut moves = Vec::new();
    while let Some(parent) = arena[idx].parent {
        if let Some(mv) = arena[idx].via {
            moves.push(mv);
        }
        idx = parent;
    }
    moves.reverse();
    moves
}
