//! Local search nudging a solvable grid toward a target difficulty.
//!
//! Each iteration draws one applicable strategy by weight, applies it to a
//! copy, and keeps the copy only if the exact solver still finds a solution.

use crate::difficulty::analyze;
use crate::entity::{Color, Entity, EntityKind};
use crate::error::GenerationError;
use crate::grid::{GridState, Position};
use crate::moves::Move;
use crate::rng::GenRng;
use crate::solver::{Solver, SolverConfig};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One structural edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AddContainer,
    RemoveCoin,
    IncreaseCapacity,
    MoveCoinFarther,
    AddObstacle,
    RemoveContainer,
    AddCoin,
    DecreaseCapacity,
    MoveCoinCloser,
    RemoveObstacle,
}

/// Pure strategy body: a modified copy, or `None` if it could not apply
pub type StrategyFn = fn(&GridState, &AdjusterConfig, &mut GenRng) -> Option<GridState>;

impl Strategy {
    pub const HARDENING: [Strategy; 5] = [
        Strategy::AddContainer,
        Strategy::RemoveCoin,
        Strategy::IncreaseCapacity,
        Strategy::MoveCoinFarther,
        Strategy::AddObstacle,
    ];

    pub const SIMPLIFYING: [Strategy; 5] = [
        Strategy::RemoveContainer,
        Strategy::AddCoin,
        Strategy::DecreaseCapacity,
        Strategy::MoveCoinCloser,
        Strategy::RemoveObstacle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::AddContainer => "add_container",
            Strategy::RemoveCoin => "remove_coin",
            Strategy::IncreaseCapacity => "increase_capacity",
            Strategy::MoveCoinFarther => "move_coin_farther",
            Strategy::AddObstacle => "add_obstacle",
            Strategy::RemoveContainer => "remove_container",
            Strategy::AddCoin => "add_coin",
            Strategy::DecreaseCapacity => "decrease_capacity",
            Strategy::MoveCoinCloser => "move_coin_closer",
            Strategy::RemoveObstacle => "remove_obstacle",
        }
    }

    pub fn is_hardening(&self) -> bool {
        Self::HARDENING.contains(self)
    }

    /// Function table entry
    pub fn apply_fn(&self) -> StrategyFn {
        match self {
            Strategy::AddContainer => add_container,
            Strategy::RemoveCoin => remove_coin,
            Strategy::IncreaseCapacity => increase_capacity,
            Strategy::MoveCoinFarther => move_coin_farther,
            Strategy::AddObstacle => add_obstacle,
            Strategy::RemoveContainer => remove_container,
            Strategy::AddCoin => add_coin,
            Strategy::DecreaseCapacity => decrease_capacity,
            Strategy::MoveCoinCloser => move_coin_closer,
            Strategy::RemoveObstacle => remove_obstacle,
        }
    }

    /// Structural precondition
    pub fn applicable(&self, grid: &GridState, config: &AdjusterConfig) -> bool {
        let coins = grid.uncollected_coins();
        let containers = grid.containers().count();
        let has_room = !grid.empty_upper_cells().is_empty();
        match self {
            Strategy::AddContainer => containers < config.max_containers && free_bottom_cell(grid).is_some(),
            Strategy::RemoveCoin => coins > config.min_coins,
            Strategy::IncreaseCapacity => binding_containers(grid).next().is_some(),
            Strategy::MoveCoinFarther | Strategy::MoveCoinCloser => coins > 0 && containers > 0 && has_room,
            Strategy::AddObstacle => {
                config.allow_obstacles && grid.movable_count() < config.max_obstacles && has_room
            }
            Strategy::RemoveContainer => containers > config.min_containers,
            Strategy::AddCoin => coins < config.max_coins && containers > 0 && has_room,
            Strategy::DecreaseCapacity => grid
                .containers()
                .any(|pb| matches!(pb.kind, EntityKind::Container { capacity, .. } if capacity > 1)),
            Strategy::RemoveObstacle => grid.movable_count() > 0,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Configuration for the auto-adjuster
#[derive(Debug, Clone)]
pub struct AdjusterConfig {
    /// Accepted distance between score/100 and the target ratio
    pub tolerance: f64,
    pub min_coins: usize,
    pub max_coins: usize,
    pub min_containers: usize,
    pub max_containers: usize,
    pub allow_obstacles: bool,
    pub max_obstacles: usize,
    /// Depth budget for every solvability check
    pub solver_depth: usize,
    pub solver: SolverConfig,
    pub weights: HashMap<Strategy, f64>,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            min_coins: 3,
            max_coins: 20,
            min_containers: 1,
            max_containers: 5,
            allow_obstacles: true,
            max_obstacles: 10,
            solver_depth: 20,
            solver: SolverConfig::default(),
            weights: default_weights(),
        }
    }
}

impl AdjusterConfig {
    pub fn weight(&self, strategy: Strategy) -> f64 {
        self.weights.get(&strategy).copied().unwrap_or(1.0)
    }

    /// Whether a 0-100 `score` is within tolerance of a 0-1 target
    pub fn within_tolerance(&self, score: f64, target_ratio: f64) -> bool {
        (score / 100.0 - target_ratio).abs() <= self.tolerance + 1e-9
    }
}

fn default_weights() -> HashMap<Strategy, f64> {
    HashMap::from([
        (Strategy::AddObstacle, 1.0),
        (Strategy::MoveCoinFarther, 0.8),
        (Strategy::IncreaseCapacity, 0.5),
        (Strategy::AddContainer, 0.4),
        (Strategy::RemoveCoin, 0.3),
        (Strategy::RemoveObstacle, 1.0),
        (Strategy::MoveCoinCloser, 0.8),
        (Strategy::DecreaseCapacity, 0.5),
        (Strategy::RemoveContainer, 0.4),
        (Strategy::AddCoin, 0.3),
    ])
}

/// Outcome of an adjustment run
#[derive(Debug, Clone)]
pub struct AdjustmentResult {
    /// Always solvable
    pub grid: GridState,
    pub success: bool,
    pub final_score: f64,
    pub iterations: usize,
    pub strategies_applied: Vec<Strategy>,
    /// Initial score followed by the score of every kept candidate
    pub score_history: Vec<f64>,
    /// Shortest solution of `grid`
    pub solution: Vec<Move>,
}

/// Difficulty auto-adjuster
pub struct AutoAdjuster {
    config: AdjusterConfig,
}

impl Default for AutoAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoAdjuster {
    pub fn new() -> Self {
        Self {
            config: AdjusterConfig::default(),
        }
    }

    pub fn with_config(config: AdjusterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AdjusterConfig {
        &self.config
    }

    /// Score and solution, or `None` when the solver finds nothing
    fn evaluate(&self, grid: &GridState) -> Option<(f64, Vec<Move>)> {
        let result = Solver::with_config(self.config.solver.clone()).solve(grid, self.config.solver_depth);
        if !result.found {
            return None;
        }
        let report = analyze(grid, &result.moves);
        Some((report.score, result.moves))
    }

    fn pick(&self, grid: &GridState, harden: bool, rng: &mut GenRng) -> Option<Strategy> {
        let pool = if harden {
            Strategy::HARDENING
        } else {
            Strategy::SIMPLIFYING
        };
        let candidates: Vec<Strategy> = pool
            .into_iter()
            .filter(|s| s.applicable(grid, &self.config))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let weights: Vec<f64> = candidates.iter().map(|s| self.config.weight(*s).max(0.0)).collect();
        match WeightedIndex::new(&weights) {
            Ok(dist) => Some(candidates[dist.sample(rng)]),
            Err(_) => candidates.choose(rng).copied(),
        }
    }

    /// Move `grid` toward `target_ratio` (0..=1) within `max_iterations` edits
    pub fn adjust(
        &self,
        grid: &GridState,
        target_ratio: f64,
        max_iterations: usize,
        rng: &mut GenRng,
    ) -> Result<AdjustmentResult, GenerationError> {
        let (score, solution) = self
            .evaluate(grid)
            .ok_or_else(|| GenerationError::Unsolvable("adjuster input has no solution".into()))?;

        let mut current = grid.clone();
        let mut current_score = score;
        let mut history = vec![score];
        let mut applied = Vec::new();
        let mut best = (current.clone(), score, solution.clone());
        let target_score = target_ratio * 100.0;

        if self.config.within_tolerance(score, target_ratio) {
            return Ok(AdjustmentResult {
                grid: current,
                success: true,
                final_score: score,
                iterations: 0,
                strategies_applied: applied,
                score_history: history,
                solution,
            });
        }

        let mut iterations = 0;
        for iteration in 1..=max_iterations {
            iterations = iteration;
            let harden = current_score < target_score;
            let Some(strategy) = self.pick(&current, harden, rng) else {
                log::debug!("no applicable {} strategy", if harden { "hardening" } else { "simplifying" });
                break;
            };

            let Some(candidate) = (strategy.apply_fn())(&current, &self.config, rng) else {
                continue;
            };
            let Some((score, solution)) = self.evaluate(&candidate) else {
                log::debug!("{} broke solvability, discarded", strategy);
                continue;
            };

            current = candidate;
            current_score = score;
            history.push(score);
            applied.push(strategy);

            if (score - target_score).abs() < (best.1 - target_score).abs() {
                best = (current.clone(), score, solution.clone());
            }
            if self.config.within_tolerance(score, target_ratio) {
                return Ok(AdjustmentResult {
                    grid: current,
                    success: true,
                    final_score: score,
                    iterations,
                    strategies_applied: applied,
                    score_history: history,
                    solution,
                });
            }
        }

        let (grid, final_score, solution) = best;
        let success = self.config.within_tolerance(final_score, target_ratio);
        if !success {
            log::warn!(
                "adjuster stopped after {} iterations at score {:.1} (target {:.1})",
                iterations,
                final_score,
                target_score
            );
        }
        Ok(AdjustmentResult {
            grid,
            success,
            final_score,
            iterations,
            strategies_applied: applied,
            score_history: history,
            solution,
        })
    }
}

/// Adjust with the default configuration
pub fn auto_adjust(
    grid: &GridState,
    target_ratio: f64,
    max_iterations: usize,
    rng: &mut GenRng,
) -> Result<AdjustmentResult, GenerationError> {
    AutoAdjuster::new().adjust(grid, target_ratio, max_iterations, rng)
}

// ---------------------------------------------------------------------------
// Strategy bodies

fn free_bottom_cell(grid: &GridState) -> Option<Position> {
    let bottom = grid.rows.checked_sub(1)?;
    let taken: Vec<usize> = grid.containers().map(|pb| pb.col).collect();
    let containers: Vec<Position> = grid.containers().map(|pb| Position::new(pb.row, pb.col)).collect();
    (0..grid.cols)
        .filter(|c| !taken.contains(c) && grid.is_empty(bottom, *c))
        .map(|c| Position::new(bottom, c))
        .max_by_key(|p| containers.iter().map(|q| p.distance(*q)).min().unwrap_or(0))
}

/// Distance from a coin to the nearest container of its color
fn coin_distance(grid: &GridState, coin: &Entity) -> usize {
    grid.distance_to_container(Position::new(coin.row, coin.col), coin.color)
        .unwrap_or(usize::MAX)
}

fn live_coins(grid: &GridState) -> Vec<&Entity> {
    grid.coins().filter(|c| c.is_live()).collect()
}

fn add_container(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    let pos = free_bottom_cell(grid)?;
    let used: Vec<Color> = grid.containers().filter_map(|pb| pb.color).collect();
    let color = Color::PALETTE
        .iter()
        .copied()
        .find(|c| !used.contains(c))
        .or_else(|| Color::PALETTE.choose(rng).copied())?;
    let mut out = grid.clone();
    out.spawn(EntityKind::container(rng.gen_range(2..=3)), Some(color), pos.row, pos.col)
        .ok()?;
    Some(out)
}

fn remove_coin(grid: &GridState, _: &AdjusterConfig, _: &mut GenRng) -> Option<GridState> {
    let id = live_coins(grid)
        .into_iter()
        .min_by_key(|c| coin_distance(grid, c))?
        .id;
    let mut out = grid.clone();
    out.remove(id)?;
    Some(out)
}

/// Containers without room for every live coin of their color
fn binding_containers(grid: &GridState) -> impl Iterator<Item = &Entity> {
    grid.containers().filter(move |pb| {
        let waiting = grid
            .coins()
            .filter(|c| !c.is_collected && c.color == pb.color)
            .count() as u32;
        pb.free_capacity().is_some_and(|free| free <= waiting)
    })
}

fn change_capacity(grid: &GridState, delta: i32, rng: &mut GenRng) -> Option<GridState> {
    let ids: Vec<_> = if delta > 0 {
        binding_containers(grid).map(|pb| pb.id).collect()
    } else {
        grid.containers()
            .filter(|pb| matches!(pb.kind, EntityKind::Container { capacity, .. } if capacity > 1))
            .map(|pb| pb.id)
            .collect()
    };
    let id = *ids.choose(rng)?;
    let mut out = grid.clone();
    if let Some(EntityKind::Container {
        capacity,
        current_count,
    }) = out.entity_mut(id).map(|e| &mut e.kind)
    {
        *capacity = capacity.saturating_add_signed(delta).max(*current_count).max(1);
    }
    Some(out)
}

fn increase_capacity(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    change_capacity(grid, 1, rng)
}

fn decrease_capacity(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    change_capacity(grid, -1, rng)
}

/// Relocate one coin; `farther` picks the closest coin and the most distant cell
fn relocate_coin(grid: &GridState, farther: bool) -> Option<GridState> {
    let coins = live_coins(grid);
    let coin = if farther {
        coins.into_iter().min_by_key(|c| coin_distance(grid, c))?
    } else {
        coins
            .into_iter()
            .filter(|c| coin_distance(grid, c) != usize::MAX)
            .max_by_key(|c| coin_distance(grid, c))?
    };
    let (id, color) = (coin.id, coin.color);

    let cells = grid.empty_upper_cells();
    let distance = |p: &Position| grid.distance_to_container(*p, color).unwrap_or(0);
    let dest = if farther {
        cells.iter().max_by_key(|p| distance(*p))?
    } else {
        cells.iter().min_by_key(|p| distance(*p))?
    };

    let mut out = grid.clone();
    let entity = out.entity_mut(id)?;
    entity.row = dest.row;
    entity.col = dest.col;
    entity.is_falling = false;
    Some(out)
}

fn move_coin_farther(grid: &GridState, _: &AdjusterConfig, _: &mut GenRng) -> Option<GridState> {
    relocate_coin(grid, true)
}

fn move_coin_closer(grid: &GridState, _: &AdjusterConfig, _: &mut GenRng) -> Option<GridState> {
    relocate_coin(grid, false)
}

fn add_obstacle(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    let pos = *grid.empty_upper_cells().choose(rng)?;
    let mut out = grid.clone();
    out.spawn(EntityKind::Obstacle, None, pos.row, pos.col).ok()?;
    Some(out)
}

fn remove_container(grid: &GridState, _: &AdjusterConfig, _: &mut GenRng) -> Option<GridState> {
    let id = grid
        .containers()
        .min_by_key(|pb| match pb.kind {
            EntityKind::Container { capacity, .. } => capacity,
            _ => u32::MAX,
        })?
        .id;
    let mut out = grid.clone();
    out.remove(id)?;
    Some(out)
}

fn add_coin(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    let pb = grid.containers().collect::<Vec<_>>().choose(rng).copied()?;
    let (pb_id, color, home) = (pb.id, pb.color, Position::new(pb.row, pb.col));
    let dest = grid
        .empty_upper_cells()
        .into_iter()
        .min_by_key(|p| p.distance(home))?;

    let mut out = grid.clone();
    out.spawn(EntityKind::Coin, color, dest.row, dest.col).ok()?;

    // Keep total capacity for the color at least its coin count
    let coins = out.coins().filter(|c| c.color == color).count() as u32;
    let total: u32 = out
        .containers_for(color)
        .map(|pb| match pb.kind {
            EntityKind::Container { capacity, .. } => capacity,
            _ => 0,
        })
        .sum();
    if total < coins {
        if let Some(EntityKind::Container { capacity, .. }) = out.entity_mut(pb_id).map(|e| &mut e.kind) {
            *capacity += coins - total;
        }
    }
    Some(out)
}

fn remove_obstacle(grid: &GridState, _: &AdjusterConfig, rng: &mut GenRng) -> Option<GridState> {
    let id = grid.movables().collect::<Vec<_>>().choose(rng)?.id;
    let mut out = grid.clone();
    out.remove(id)?;
    Some(out)
}
