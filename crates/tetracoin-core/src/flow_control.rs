//! Flow-control obstacle placement with reachability repair.

use crate::difficulty::DifficultyTier;
use crate::entity::{EntityKind, GateCondition, Side, TrapKind};
use crate::grid::{GridState, Position};
use crate::rng::GenRng;
use crate::validation::check_reachability;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Density band and piece budget for one tier
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleSettings {
    pub min_density: f64,
    pub max_density: f64,
    pub max_traps: usize,
    pub allow_gateway: bool,
    /// Chance that the single gateway is placed
    pub gateway_chance: f64,
}

impl ObstacleSettings {
    pub fn for_tier(tier: DifficultyTier) -> Self {
        let (min_density, max_density, max_traps) = match tier {
            DifficultyTier::Easy => (0.03, 0.08, 0),
            DifficultyTier::Medium => (0.08, 0.15, 4),
            DifficultyTier::Hard => (0.15, 0.25, 6),
            DifficultyTier::Expert => (0.20, 0.35, 8),
        };
        Self {
            min_density,
            max_density,
            max_traps,
            allow_gateway: true,
            gateway_chance: 0.3,
        }
    }

    /// Extra deflectors for the denser bands
    fn deflector_bonus(&self) -> usize {
        if self.min_density > 0.1 {
            2
        } else {
            0
        }
    }
}

/// Cells above each container in its column
pub fn flow_cells(grid: &GridState) -> HashSet<Position> {
    grid.containers()
        .flat_map(|pb| (0..pb.row).map(move |r| Position::new(r, pb.col)))
        .collect()
}

/// Places flow-control pieces from a shuffled pool of upper cells
struct ObstacleBuilder<'a> {
    grid: &'a mut GridState,
    candidates: Vec<Position>,
    flow: HashSet<Position>,
    settings: &'a ObstacleSettings,
}

impl ObstacleBuilder<'_> {
    /// One more piece still fits under the band maximum
    fn has_room(&self) -> bool {
        let cells = self.grid.cell_count().max(1) as f64;
        (self.grid.obstacle_count() + 1) as f64 / cells <= self.settings.max_density + 1e-9
    }

    /// Next candidate, preferring flow cells when asked
    fn next_cell(&mut self, prefer_flow: bool) -> Option<Position> {
        if prefer_flow {
            if let Some(i) = self.candidates.iter().rposition(|p| self.flow.contains(p)) {
                return Some(self.candidates.remove(i));
            }
        }
        self.candidates.pop()
    }

    fn put(&mut self, kind: EntityKind, pos: Position) -> bool {
        match self.grid.spawn(kind, None, pos.row, pos.col) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("skipped obstacle: {}", e);
                false
            }
        }
    }

    fn supports(&mut self, rng: &mut GenRng) {
        let count = rng.gen_range(0..=3);
        let bottom = self.grid.rows.saturating_sub(1);
        for _ in 0..count {
            if !self.has_room() {
                break;
            }
            let Some(pos) = self.next_cell(false) else {
                break;
            };
            if pos.row == 0 || pos.row >= bottom {
                continue;
            }
            self.put(EntityKind::Support, pos);
        }
    }

    fn deflectors(&mut self, rng: &mut GenRng) {
        let count = rng.gen_range(0..=2) + self.settings.deflector_bonus();
        let limit = self.grid.rows.saturating_sub(2);
        for _ in 0..count {
            if !self.has_room() {
                break;
            }
            let Some(pos) = self.next_cell(true) else {
                break;
            };
            if pos.row >= limit {
                continue;
            }
            let direction = if rng.gen_bool(0.5) {
                Side::Right
            } else {
                Side::Left
            };
            self.put(EntityKind::Deflector { direction }, pos);
        }
    }

    fn gateway(&mut self, rng: &mut GenRng) {
        if !self.settings.allow_gateway || !self.has_room() {
            return;
        }
        if !rng.gen_bool(self.settings.gateway_chance) {
            return;
        }
        let Some(pos) = self.next_cell(true) else {
            return;
        };
        let open_condition = if rng.gen_bool(0.5) {
            GateCondition::Switch
        } else {
            let coins = self.grid.coin_count().max(1) as u32;
            GateCondition::CoinCount(rng.gen_range(1..=coins.div_ceil(2)))
        };
        self.put(
            EntityKind::Gateway {
                is_open: false,
                open_condition,
            },
            pos,
        );
    }

    fn traps(&mut self, rng: &mut GenRng) {
        for _ in 0..self.settings.max_traps {
            if !self.has_room() {
                break;
            }
            if rng.gen_bool(0.5) {
                continue;
            }
            let Some(pos) = self.next_cell(false) else {
                break;
            };
            let subtype = if rng.gen_bool(0.5) {
                TrapKind::Spikes
            } else {
                TrapKind::Pit
            };
            self.put(EntityKind::Trap { subtype }, pos);
        }
    }
}

/// Remove flow-control pieces in random order until every coin can reach home again
fn repair(grid: &mut GridState, rng: &mut GenRng) {
    let mut pieces: Vec<_> = grid
        .live(EntityKind::is_flow_control)
        .map(|e| e.id)
        .collect();
    pieces.shuffle(rng);

    for id in pieces {
        grid.remove(id);
        log::debug!("repair: removed entity {}", id);
        if check_reachability(grid) {
            return;
        }
    }
}

/// Top density up to the band minimum with colorless fixed blocks
fn backfill(grid: &mut GridState, min_density: f64, rng: &mut GenRng) {
    let target = (grid.cell_count() as f64 * min_density - 1e-9).ceil() as usize;
    let needed = target.saturating_sub(grid.obstacle_count());
    if needed == 0 {
        return;
    }

    let mut empty = grid.empty_upper_cells();
    empty.shuffle(rng);
    let mut added = 0;
    for pos in empty {
        if added == needed {
            break;
        }
        let Ok(id) = grid.spawn(EntityKind::FixedBlock, None, pos.row, pos.col) else {
            continue;
        };
        if check_reachability(grid) {
            added += 1;
        } else {
            grid.remove(id);
        }
    }
}

/// Scatter flow-control obstacles over a copy of `grid`
pub fn add_obstacles(grid: &GridState, tier: DifficultyTier, rng: &mut GenRng) -> GridState {
    let settings = ObstacleSettings::for_tier(tier);
    let mut out = grid.clone();

    let mut candidates = out.empty_upper_cells();
    candidates.shuffle(rng);
    let flow = flow_cells(&out);

    let mut builder = ObstacleBuilder {
        grid: &mut out,
        candidates,
        flow,
        settings: &settings,
    };
    builder.supports(rng);
    builder.deflectors(rng);
    builder.gateway(rng);
    builder.traps(rng);

    if !check_reachability(&out) {
        repair(&mut out, rng);
    }
    if out.obstacle_density() < settings.min_density && check_reachability(&out) {
        backfill(&mut out, settings.min_density, rng);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Color;
    use crate::placer::place;
    use crate::rng::seeded;

    fn base(rows: usize, cols: usize, seed: u64) -> GridState {
        let mut grid = GridState::new(rows, cols);
        grid.spawn(EntityKind::container(5), Some(Color::Red), rows - 1, 1)
            .unwrap();
        grid.spawn(EntityKind::container(5), Some(Color::Blue), rows - 1, cols - 2)
            .unwrap();
        let mut rng = seeded(seed);
        assert!(place(&mut grid, 4, DifficultyTier::Easy, &mut rng));
        grid
    }

    #[test]
    fn test_settings_bands() {
        let easy = ObstacleSettings::for_tier(DifficultyTier::Easy);
        assert_eq!(easy.max_traps, 0);
        let expert = ObstacleSettings::for_tier(DifficultyTier::Expert);
        assert!((expert.max_density - 0.35).abs() < 1e-9);
        assert_eq!(expert.deflector_bonus(), 2);
    }

    #[test]
    fn test_flow_cells_cover_container_columns() {
        let grid = base(5, 4, 1);
        let flow = flow_cells(&grid);
        assert_eq!(flow.len(), 8);
        assert!(flow.contains(&Position::new(0, 1)));
        assert!(!flow.contains(&Position::new(4, 1)));
    }

    #[test]
    fn test_result_stays_reachable_and_input_untouched() {
        for seed in 0..20 {
            let grid = base(10, 8, seed);
            let before = grid.clone();
            let mut rng = seeded(seed);
            let out = add_obstacles(&grid, DifficultyTier::Hard, &mut rng);
            assert_eq!(grid, before);
            assert!(check_reachability(&out), "seed {}", seed);
        }
    }

    #[test]
    fn test_density_within_tier_band() {
        for tier in DifficultyTier::ALL {
            let settings = ObstacleSettings::for_tier(tier);
            for seed in 0..8 {
                let grid = base(10, 8, seed);
                let mut rng = seeded(seed);
                let out = add_obstacles(&grid, tier, &mut rng);
                if !check_reachability(&out) {
                    continue;
                }
                let density = out.obstacle_density();
                assert!(
                    density >= settings.min_density - 1e-9 && density <= settings.max_density + 1e-9,
                    "{} seed {}: density {:.4}",
                    tier,
                    seed,
                    density
                );
            }
        }
    }

    #[test]
    fn test_backfill_rounds_up_to_minimum() {
        // 80 cells at 0.08 needs 7 blocks, not 6
        let grid = base(10, 8, 4);
        let mut out = grid.clone();
        let mut rng = seeded(4);
        backfill(&mut out, 0.08, &mut rng);
        assert_eq!(out.obstacle_count(), 7);
        assert!(out.obstacle_density() >= 0.08);
    }

    #[test]
    fn test_put_on_occupied_cell_is_skipped() {
        let mut grid = base(6, 5, 2);
        let settings = ObstacleSettings::for_tier(DifficultyTier::Hard);
        let taken = grid.containers().next().map(|pb| Position::new(pb.row, pb.col)).unwrap();
        let free = Position::new(0, 0);
        let mut builder = ObstacleBuilder {
            grid: &mut grid,
            candidates: Vec::new(),
            flow: HashSet::new(),
            settings: &settings,
        };
        assert!(!builder.put(EntityKind::Obstacle, taken));
        if builder.grid.is_empty(free.row, free.col) {
            assert!(builder.put(EntityKind::Support, free));
            assert_eq!(builder.grid.obstacle_count(), 1);
        } else {
            assert_eq!(builder.grid.obstacle_count(), 0);
        }
    }

    #[test]
    fn test_never_uses_bottom_row() {
        let grid = base(8, 6, 3);
        let mut rng = seeded(3);
        let out = add_obstacles(&grid, DifficultyTier::Expert, &mut rng);
        assert!(out
            .live(EntityKind::is_obstacle)
            .all(|e| e.row < out.rows - 1 && e.color.is_none()));
    }

    #[test]
    fn test_easy_has_no_traps() {
        for seed in 0..10 {
            let grid = base(8, 6, seed);
            let mut rng = seeded(seed);
            let out = add_obstacles(&grid, DifficultyTier::Easy, &mut rng);
            assert_eq!(
                out.live(|k| matches!(k, EntityKind::Trap { .. })).count(),
                0
            );
        }
    }

    #[test]
    fn test_repair_restores_reachability() {
        let mut grid = GridState::new(4, 3);
        grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
        grid.spawn(EntityKind::Trap { subtype: TrapKind::Pit }, None, 1, 1)
            .unwrap();
        grid.spawn(EntityKind::Trap { subtype: TrapKind::Spikes }, None, 1, 0)
            .unwrap();
        grid.spawn(EntityKind::Trap { subtype: TrapKind::Spikes }, None, 1, 2)
            .unwrap();
        grid.spawn(EntityKind::container(1), Some(Color::Red), 3, 1)
            .unwrap();
        assert!(!check_reachability(&grid));

        let mut rng = seeded(11);
        repair(&mut grid, &mut rng);
        assert!(check_reachability(&grid));
    }
}
