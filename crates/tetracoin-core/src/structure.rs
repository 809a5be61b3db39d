//! Static layout checks run on every finished level.

use crate::entity::{Color, EntityId, EntityKind};
use crate::grid::GridState;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Densities above this make a level unreadable
pub const MAX_OBSTACLE_DENSITY: f64 = 0.4;

/// A single finding of the structural check
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructureIssue {
    #[error("entity {id} at ({row}, {col}) is outside the grid")]
    OutOfBounds { id: EntityId, row: usize, col: usize },
    #[error("entities {first} and {second} share cell ({row}, {col})")]
    Overlap {
        first: EntityId,
        second: EntityId,
        row: usize,
        col: usize,
    },
    #[error("container {0} is not on the bottom row")]
    ContainerOffFloor(EntityId),
    #[error("column {0} holds more than one container")]
    StackedContainers(usize),
    #[error("container {0} holds more coins than its capacity")]
    Overfilled(EntityId),
    #[error("{0} coins have no container")]
    Homeless(Color),
    #[error("{color} needs room for {coins} coins but containers hold {capacity}")]
    CapacityShortfall { color: Color, coins: u32, capacity: u32 },
    #[error("obstacle density {0:.2} exceeds the limit")]
    TooDense(f64),
    #[error("level has no coins")]
    NoCoins,
    #[error("every coin drops straight into its container")]
    Trivial,
}

/// Errors make a level invalid; warnings only flag weak layouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureReport {
    pub errors: Vec<StructureIssue>,
    pub warnings: Vec<StructureIssue>,
}

impl StructureReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whether a coin sits in a matching container's column with nothing solid in between
fn clear_drop(grid: &GridState, row: usize, col: usize, color: Option<Color>) -> bool {
    grid.containers_for(color).filter(|pb| pb.col == col && pb.row > row).any(|pb| {
        (row + 1..pb.row).all(|r| {
            grid.entity_at(r, col)
                .map_or(true, |e| e.kind.is_coin())
        })
    })
}

pub fn check_structure(grid: &GridState) -> StructureReport {
    let mut report = StructureReport::default();
    let bottom = grid.rows.saturating_sub(1);

    let mut cells: HashMap<(usize, usize), EntityId> = HashMap::new();
    for e in grid.entities.iter().filter(|e| e.is_live()) {
        if !grid.in_bounds(e.row, e.col) {
            report.errors.push(StructureIssue::OutOfBounds {
                id: e.id,
                row: e.row,
                col: e.col,
            });
            continue;
        }
        if let Some(&first) = cells.get(&(e.row, e.col)) {
            report.errors.push(StructureIssue::Overlap {
                first,
                second: e.id,
                row: e.row,
                col: e.col,
            });
        } else {
            cells.insert((e.row, e.col), e.id);
        }
    }

    let mut per_column: BTreeMap<usize, usize> = BTreeMap::new();
    let mut capacity: BTreeMap<Color, u32> = BTreeMap::new();
    for pb in grid.containers() {
        if pb.row != bottom {
            report.errors.push(StructureIssue::ContainerOffFloor(pb.id));
        }
        *per_column.entry(pb.col).or_default() += 1;
        if let EntityKind::Container {
            capacity: cap,
            current_count,
        } = pb.kind
        {
            if current_count > cap {
                report.errors.push(StructureIssue::Overfilled(pb.id));
            }
            if let Some(color) = pb.color {
                *capacity.entry(color).or_default() += cap;
            }
        }
    }
    for (col, count) in per_column {
        if count > 1 {
            report.errors.push(StructureIssue::StackedContainers(col));
        }
    }

    let mut coins: BTreeMap<Color, u32> = BTreeMap::new();
    for coin in grid.coins() {
        if let Some(color) = coin.color {
            *coins.entry(color).or_default() += 1;
        }
    }
    for (color, count) in coins {
        match capacity.get(&color) {
            None => report.errors.push(StructureIssue::Homeless(color)),
            Some(&cap) if cap < count => report.errors.push(StructureIssue::CapacityShortfall {
                color,
                coins: count,
                capacity: cap,
            }),
            Some(_) => {}
        }
    }

    let density = grid.obstacle_density();
    if density > MAX_OBSTACLE_DENSITY {
        report.errors.push(StructureIssue::TooDense(density));
    }

    let live: Vec<_> = grid.coins().filter(|c| c.is_live()).collect();
    if grid.coin_count() == 0 {
        report.warnings.push(StructureIssue::NoCoins);
    } else if !live.is_empty() && live.iter().all(|c| clear_drop(grid, c.row, c.col, c.color)) {
        report.warnings.push(StructureIssue::Trivial);
    }

    report
}
