//! Basic example of using the Tetracoin engine

use tetracoin_core::{analyze, replay, DifficultyTier, Generator, Solver};
use tetracoin_core::physics::MOVE_SETTLE_TICKS;

fn main() {
    // Generate a level
    println!("Generating a Medium level...\n");
    let mut generator = Generator::with_seed(7);
    let level = match generator.generate(DifficultyTier::Medium) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Generation failed: {}", e);
            return;
        }
    };

    println!("Generated level:");
    println!("{}", level);

    let grid = level.to_grid();
    println!("Coins: {}", grid.coin_count());
    println!("Obstacles: {}", grid.obstacle_count());
    println!("Attempts: {}\n", level.metadata.generation_attempts);

    // Solve it again from scratch
    println!("Solving...\n");
    let result = Solver::new().solve(&grid, DifficultyTier::Medium.solver_depth());
    if !result.found {
        println!("No solution found ({})", result.termination);
        return;
    }
    for mv in &result.moves {
        println!("  {}", mv);
    }

    match replay(&grid, &result.moves, MOVE_SETTLE_TICKS) {
        Ok(end) => println!("\nAfter replay:\n{}", end),
        Err(e) => println!("Replay failed: {}", e),
    }

    // Rate the difficulty
    println!("{}", analyze(&grid, &result.moves).summary());
}
