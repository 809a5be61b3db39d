//! Core Tetracoin engine
//!
//! Coins fall under gravity into colored piggy-bank containers. This crate
//! models the grid and its physics, solves levels with a breadth-first
//! search over player moves, rates their difficulty, and generates new
//! solvable levels from a seed.

pub mod adjuster;
pub mod campaign;
pub mod difficulty;
pub mod entity;
pub mod error;
pub mod flow_control;
pub mod generator;
pub mod grid;
pub mod level;
pub mod moves;
pub mod physics;
pub mod placer;
pub mod rng;
pub mod solver;
pub mod structure;
pub mod validation;

pub use adjuster::{AdjusterConfig, AdjustmentResult, AutoAdjuster, Strategy};
pub use campaign::{generate_campaign, CampaignConfig, CampaignLevel};
pub use difficulty::{analyze, DifficultyReport, DifficultyTier};
pub use entity::{Color, Direction, Entity, EntityId, EntityKind, GateCondition, Side, TrapKind};
pub use error::GenerationError;
pub use generator::{generate, generate_batch, GenerationStats, Generator, GeneratorConfig};
pub use grid::{GridState, Position};
pub use level::Level;
pub use moves::{apply_move, replay, Move, MoveError};
pub use physics::{settle, Event};
pub use solver::{solve, SolveResult, Solver, SolverConfig, Termination};
pub use structure::{check_structure, StructureReport};
pub use validation::{check_reachability, unreachable_coins};
