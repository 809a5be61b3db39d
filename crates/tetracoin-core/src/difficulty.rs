use crate::grid::GridState;
use crate::moves::Move;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Coarse difficulty bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 4] = [
        DifficultyTier::Easy,
        DifficultyTier::Medium,
        DifficultyTier::Hard,
        DifficultyTier::Expert,
    ];

    /// Tier for a 0-100 composite score
    pub fn from_score(score: f64) -> Self {
        if score < 25.0 {
            DifficultyTier::Easy
        } else if score < 50.0 {
            DifficultyTier::Medium
        } else if score < 75.0 {
            DifficultyTier::Hard
        } else {
            DifficultyTier::Expert
        }
    }

    /// Tier for a numeric 1-10 level
    pub fn from_level(level: u32) -> Self {
        match level {
            0..=3 => DifficultyTier::Easy,
            4..=6 => DifficultyTier::Medium,
            7..=8 => DifficultyTier::Hard,
            _ => DifficultyTier::Expert,
        }
    }

    /// Representative numeric level
    pub fn level(&self) -> u32 {
        match self {
            DifficultyTier::Easy => 2,
            DifficultyTier::Medium => 5,
            DifficultyTier::Hard => 8,
            DifficultyTier::Expert => 10,
        }
    }

    /// Solver depth budget used during generation
    pub fn solver_depth(&self) -> usize {
        8 + self.level() as usize * 2
    }
}

impl std::fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DifficultyTier::Easy => write!(f, "Easy"),
            DifficultyTier::Medium => write!(f, "Medium"),
            DifficultyTier::Hard => write!(f, "Hard"),
            DifficultyTier::Expert => write!(f, "Expert"),
        }
    }
}

impl std::str::FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "medium" => Ok(DifficultyTier::Medium),
            "hard" => Ok(DifficultyTier::Hard),
            "expert" => Ok(DifficultyTier::Expert),
            other => Err(format!("unknown difficulty tier: {}", other)),
        }
    }
}

const WEIGHT_COLLECTION: f64 = 0.25;
const WEIGHT_ROUTING: f64 = 0.30;
const WEIGHT_MOVES: f64 = 0.25;
const WEIGHT_DECEPTION: f64 = 0.20;

const CAP_COLLECTION: f64 = 20.0;
const CAP_ROUTING: f64 = 50.0;
const CAP_MOVES: f64 = 25.0;
const CAP_DECEPTION: f64 = 10.0;

/// Movable count times solution length is divided by this
const ROUTING_DIVISOR: usize = 4;

/// Raw, unscaled signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyMetrics {
    /// Coins that must be collected
    pub collection: usize,
    /// Decision-complexity proxy
    pub routing: usize,
    /// Solution length
    pub moves: usize,
    /// Movable entities the solution never touches
    pub deception: usize,
}

/// Per-metric contribution on a 0-100 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub collection: f64,
    pub routing: f64,
    pub moves: f64,
    pub deception: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyReport {
    pub metrics: DifficultyMetrics,
    /// Weighted composite, 0-100
    pub score: f64,
    pub tier: DifficultyTier,
    pub breakdown: Breakdown,
}

impl DifficultyReport {
    /// Multi-line human-readable breakdown
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let b = &self.breakdown;
        format!(
            "Difficulty: {}  (score = {:.1}/100)\n\
             ---------------------------------------\n\
             Collection : {:3}  ->  {:6.2}\n\
             Routing    : {:3}  ->  {:6.2}\n\
             Moves      : {:3}  ->  {:6.2}\n\
             Deception  : {:3}  ->  {:6.2}",
            self.tier,
            self.score,
            m.collection,
            b.collection,
            m.routing,
            b.routing,
            m.moves,
            b.moves,
            m.deception,
            b.deception
        )
    }
}

/// Measure a grid and the solution that solves it
pub fn measure(grid: &GridState, solution: &[Move]) -> DifficultyMetrics {
    let movables: Vec<_> = grid.movables().map(|e| e.id).collect();
    let moved: HashSet<_> = solution.iter().map(|m| m.entity_id).collect();

    DifficultyMetrics {
        collection: grid.coin_count(),
        routing: movables.len() * solution.len() / ROUTING_DIVISOR,
        moves: solution.len(),
        deception: movables.iter().filter(|id| !moved.contains(id)).count(),
    }
}

fn scaled(value: usize, cap: f64) -> f64 {
    (value as f64 / cap).min(1.0) * 100.0
}

/// Score a grid and its solution
pub fn analyze(grid: &GridState, solution: &[Move]) -> DifficultyReport {
    let metrics = measure(grid, solution);
    let breakdown = Breakdown {
        collection: scaled(metrics.collection, CAP_COLLECTION),
        routing: scaled(metrics.routing, CAP_ROUTING),
        moves: scaled(metrics.moves, CAP_MOVES),
        deception: scaled(metrics.deception, CAP_DECEPTION),
    };
    let score = breakdown.collection * WEIGHT_COLLECTION
        + breakdown.routing * WEIGHT_ROUTING
        + breakdown.moves * WEIGHT_MOVES
        + breakdown.deception * WEIGHT_DECEPTION;

    DifficultyReport {
        metrics,
        score,
        tier: DifficultyTier::from_score(score),
        breakdown,
    }
}
