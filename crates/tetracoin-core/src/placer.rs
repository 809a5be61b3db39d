//! Tier-driven coin placement.

use crate::difficulty::DifficultyTier;
use crate::entity::{Color, EntityKind};
use crate::grid::{GridState, Position};
use crate::rng::GenRng;
use rand::seq::SliceRandom;

/// Which columns a coin may try, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reach {
    adjacent: bool,
    anywhere: bool,
}

impl Reach {
    fn for_tier(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => Reach {
                adjacent: false,
                anywhere: false,
            },
            DifficultyTier::Medium => Reach {
                adjacent: true,
                anywhere: false,
            },
            DifficultyTier::Hard | DifficultyTier::Expert => Reach {
                adjacent: true,
                anywhere: true,
            },
        }
    }
}

/// Split `num_coins` evenly over the containers, raising capacity where needed.
/// Returns one color per coin, shuffled.
fn assign_colors(grid: &mut GridState, num_coins: usize, rng: &mut GenRng) -> Vec<Color> {
    let count = grid.containers().count();
    let per = num_coins / count;
    let remainder = num_coins % count;

    let mut colors = Vec::with_capacity(num_coins);
    let containers = grid.entities.iter_mut().filter(|e| e.kind.is_container());
    for (i, pb) in containers.enumerate() {
        let share = per + usize::from(i < remainder);
        if let EntityKind::Container { capacity, .. } = &mut pb.kind {
            *capacity = (*capacity).max(share as u32);
        }
        if let Some(color) = pb.color {
            colors.extend(std::iter::repeat(color).take(share));
        }
    }
    colors.shuffle(rng);
    colors
}

/// Empty non-bottom cells grouped by column, each column shuffled
fn free_spots(grid: &GridState, rng: &mut GenRng) -> Vec<Vec<Position>> {
    let mut spots = vec![Vec::new(); grid.cols];
    for p in grid.empty_upper_cells() {
        spots[p.col].push(p);
    }
    for column in spots.iter_mut() {
        column.shuffle(rng);
    }
    spots
}

fn take_spot(spots: &mut [Vec<Position>], col: usize) -> Option<Position> {
    spots.get_mut(col).and_then(|c| c.pop())
}

/// Place `num_coins` coins for containers already on the grid.
///
/// Returns false when some coin found no legal cell; the grid is then partially
/// filled and should be thrown away.
pub fn place(grid: &mut GridState, num_coins: usize, tier: DifficultyTier, rng: &mut GenRng) -> bool {
    if grid.containers().next().is_none() {
        return false;
    }
    let reach = Reach::for_tier(tier);
    let colors = assign_colors(grid, num_coins, rng);
    let mut spots = free_spots(grid, rng);

    for color in colors {
        let mut targets: Vec<usize> = grid
            .containers_for(Some(color))
            .map(|pb| pb.col)
            .collect();
        targets.shuffle(rng);

        let mut cell = targets.iter().find_map(|&col| take_spot(&mut spots, col));

        if cell.is_none() && reach.adjacent {
            cell = targets.iter().find_map(|&col| {
                let mut neighbors: Vec<usize> = [col.checked_sub(1), Some(col + 1)]
                    .into_iter()
                    .flatten()
                    .filter(|&c| c < grid.cols)
                    .collect();
                neighbors.shuffle(rng);
                neighbors.into_iter().find_map(|c| take_spot(&mut spots, c))
            });
        }

        if cell.is_none() && reach.anywhere {
            let mut cols: Vec<usize> = (0..grid.cols).collect();
            cols.shuffle(rng);
            cell = cols.into_iter().find_map(|c| take_spot(&mut spots, c));
        }

        let Some(pos) = cell else {
            log::debug!("no cell left for a {} coin under {} placement", color, tier);
            return false;
        };
        if grid
            .spawn(EntityKind::Coin, Some(color), pos.row, pos.col)
            .is_err()
        {
            return false;
        }
    }
    true
}
