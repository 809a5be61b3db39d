//! Gravity, sand-slide and absorption rules.
//!
//! One call to [`settle_step`] advances every loose coin by at most one step;
//! [`settle`] repeats it until nothing changes. Both operate on copies, so the
//! caller's grid is never touched.

use crate::entity::{Color, EntityId, EntityKind, GateCondition, Side};
use crate::grid::GridState;

/// Tick cap used when settling after a single move
pub const MOVE_SETTLE_TICKS: usize = 100;
/// Tick cap used when settling a freshly built grid
pub const INITIAL_SETTLE_TICKS: usize = 1000;

/// Something observable that happened during a physics step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// A coin was absorbed
    Collect { color: Color, container: EntityId },
    /// A container reached capacity
    ContainerFull { container: EntityId },
    /// A coin-count gateway opened
    GatewayOpen { gateway: EntityId },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Collect { color, .. } => write!(f, "COLLECT_{}", color),
            Event::ContainerFull { container } => write!(f, "CONTAINER_FULL_{}", container),
            Event::GatewayOpen { gateway } => write!(f, "GATEWAY_OPEN_{}", gateway),
        }
    }
}

/// Result of settling a grid to a fixed point
#[derive(Debug, Clone)]
pub struct Settled {
    pub grid: GridState,
    pub events: Vec<Event>,
    /// Steps that changed something
    pub ticks: usize,
    /// False when the tick cap was hit before a fixed point
    pub stable: bool,
}

/// Advance the simulation by one tick
pub fn settle_step(grid: &GridState) -> (GridState, Vec<Event>) {
    let mut next = grid.clone();
    let mut events = Vec::new();
    step_in_place(&mut next, &mut events);
    (next, events)
}

/// Step until the grid stops changing, at most `max_ticks` times
pub fn settle(grid: &GridState, max_ticks: usize) -> Settled {
    let mut working = grid.clone();
    let mut events = Vec::new();
    for tick in 0..max_ticks {
        if !step_in_place(&mut working, &mut events) {
            return Settled {
                grid: working,
                events,
                ticks: tick,
                stable: true,
            };
        }
    }
    log::warn!("settle hit the {} tick cap before a fixed point", max_ticks);
    Settled {
        grid: working,
        events,
        ticks: max_ticks,
        stable: false,
    }
}

/// Outcome of inspecting the cell below a coin
enum Fall {
    Stop,
    MoveTo(usize, usize),
    Absorb(usize),
}

/// One tick on a working grid. Returns whether anything changed.
pub(crate) fn step_in_place(grid: &mut GridState, events: &mut Vec<Event>) -> bool {
    let mut occ = grid.occupancy();

    let mut order: Vec<usize> = grid
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind.is_coin() && e.is_live())
        .map(|(i, _)| i)
        .collect();
    // Bottom-up, so a column of coins falls together
    order.sort_by(|&a, &b| grid.entities[b].row.cmp(&grid.entities[a].row));

    let mut changed = false;
    for i in order {
        let (row, col, color) = {
            let coin = &grid.entities[i];
            (coin.row, coin.col, coin.color)
        };

        match resolve_fall(grid, &occ, row, col, color) {
            Fall::Stop => grid.entities[i].is_falling = false,
            Fall::MoveTo(r, c) => {
                occ[grid.index(row, col)] = None;
                occ[grid.index(r, c)] = Some(i);
                let coin = &mut grid.entities[i];
                coin.row = r;
                coin.col = c;
                coin.is_falling = true;
                changed = true;
            }
            Fall::Absorb(j) => {
                occ[grid.index(row, col)] = None;
                absorb(grid, i, j, events);
                changed = true;
            }
        }
    }

    open_gateways(grid, events) || changed
}

fn resolve_fall(
    grid: &GridState,
    occ: &[Option<usize>],
    row: usize,
    col: usize,
    color: Option<Color>,
) -> Fall {
    let Some(below) = grid.offset(row, col, 1, 0) else {
        return Fall::Stop;
    };
    let Some(j) = occ[grid.index(below.row, below.col)] else {
        return Fall::MoveTo(below.row, below.col);
    };

    let blocker = &grid.entities[j];
    match &blocker.kind {
        EntityKind::Container { .. } => {
            if blocker.accepts(color) {
                Fall::Absorb(j)
            } else {
                Fall::Stop
            }
        }
        EntityKind::Gateway { is_open: true, .. } => {
            let Some(beyond) = grid.offset(below.row, below.col, 1, 0) else {
                return Fall::Stop;
            };
            match occ[grid.index(beyond.row, beyond.col)] {
                None => Fall::MoveTo(beyond.row, beyond.col),
                Some(k) if grid.entities[k].accepts(color) => Fall::Absorb(k),
                Some(_) => Fall::Stop,
            }
        }
        EntityKind::Deflector { direction } => slide(grid, occ, row, col, &[*direction]),
        _ => slide(grid, occ, row, col, &Side::BOTH),
    }
}

fn slide(grid: &GridState, occ: &[Option<usize>], row: usize, col: usize, sides: &[Side]) -> Fall {
    for side in sides {
        let side_cell = grid.offset(row, col, 0, side.dc());
        let diag_cell = grid.offset(row, col, 1, side.dc());
        if let (Some(s), Some(d)) = (side_cell, diag_cell) {
            if occ[grid.index(s.row, s.col)].is_none() && occ[grid.index(d.row, d.col)].is_none() {
                return Fall::MoveTo(d.row, d.col);
            }
        }
    }
    Fall::Stop
}

fn absorb(grid: &mut GridState, coin: usize, container: usize, events: &mut Vec<Event>) {
    let color = grid.entities[coin].color;
    {
        let c = &mut grid.entities[coin];
        c.is_collected = true;
        c.is_falling = false;
    }

    let pb = &mut grid.entities[container];
    if let EntityKind::Container {
        capacity,
        current_count,
    } = &mut pb.kind
    {
        *current_count += 1;
        if let Some(color) = color {
            events.push(Event::Collect {
                color,
                container: pb.id,
            });
        }
        if *current_count >= *capacity {
            events.push(Event::ContainerFull { container: pb.id });
        }
    }
}

fn open_gateways(grid: &mut GridState, events: &mut Vec<Event>) -> bool {
    let collected = grid.collected_total();
    let mut opened = false;
    for e in grid.entities.iter_mut() {
        if let EntityKind::Gateway {
            is_open,
            open_condition: GateCondition::CoinCount(needed),
        } = &mut e.kind
        {
            if !*is_open && collected >= *needed {
                *is_open = true;
                events.push(Event::GatewayOpen { gateway: e.id });
                opened = true;
            }
        }
    }
    opened
}
