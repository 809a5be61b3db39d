use tetracoin_core::moves::apply_move;
use tetracoin_core::physics::{settle_step, INITIAL_SETTLE_TICKS, MOVE_SETTLE_TICKS};
use tetracoin_core::rng::seeded;
use tetracoin_core::solver::legal_moves;
use tetracoin_core::{
    analyze, check_reachability, generate, replay, settle, solve, AdjusterConfig, AutoAdjuster,
    Color, EntityKind, GeneratorConfig, GridState, Level, Side,
};

fn small_config() -> GeneratorConfig {
    GeneratorConfig {
        rows: 6,
        cols: 5,
        num_coins: 3,
        num_containers: 2,
        ..GeneratorConfig::easy()
    }
}

/// Coin held up by an obstacle with walls on both shoulders
fn plugged() -> GridState {
    let mut grid = GridState::new(3, 3);
    grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
    grid.spawn(EntityKind::Obstacle, None, 1, 1).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 0, 0).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 0, 2).unwrap();
    grid.spawn(EntityKind::container(1), Some(Color::Red), 2, 1)
        .unwrap();
    grid
}

/// Two obstacles stacked under a walled coin
fn double_plug() -> GridState {
    let mut grid = GridState::new(4, 3);
    grid.spawn(EntityKind::FixedBlock, None, 0, 0).unwrap();
    grid.spawn(EntityKind::Coin, Some(Color::Blue), 0, 1).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 0, 2).unwrap();
    grid.spawn(EntityKind::Obstacle, None, 1, 1).unwrap();
    grid.spawn(EntityKind::Obstacle, None, 2, 1).unwrap();
    grid.spawn(EntityKind::container(1), Some(Color::Blue), 3, 1)
        .unwrap();
    grid
}

/// Coin with no container of its color
fn homeless() -> GridState {
    let mut grid = GridState::new(4, 3);
    grid.spawn(EntityKind::Coin, Some(Color::Blue), 0, 0).unwrap();
    grid.spawn(EntityKind::Obstacle, None, 2, 1).unwrap();
    grid.spawn(EntityKind::container(2), Some(Color::Red), 3, 1)
        .unwrap();
    grid
}

/// Coin resting on a fixed block with both diagonals walled off
fn boxed() -> GridState {
    let mut grid = GridState::new(3, 3);
    grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 1, 0).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 1, 1).unwrap();
    grid.spawn(EntityKind::FixedBlock, None, 1, 2).unwrap();
    grid.spawn(EntityKind::container(1), Some(Color::Red), 2, 1)
        .unwrap();
    grid
}

/// Exhaustive search over every move sequence up to `depth`
fn brute_force(grid: &GridState, depth: usize) -> bool {
    if grid.uncollected_coins() == 0 {
        return true;
    }
    if depth == 0 {
        return false;
    }
    legal_moves(grid).into_iter().any(|mv| {
        apply_move(grid, mv, MOVE_SETTLE_TICKS)
            .map(|next| brute_force(&next, depth - 1))
            .unwrap_or(false)
    })
}

#[test]
fn test_settle_is_deterministic() {
    for seed in [1, 2, 3] {
        let grid = generate(&small_config(), seed).unwrap().to_grid();
        let a = settle(&grid, INITIAL_SETTLE_TICKS);
        let b = settle(&grid, INITIAL_SETTLE_TICKS);
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.events, b.events);
        assert_eq!(a.ticks, b.ticks);
    }
}

#[test]
fn test_solutions_replay_to_a_win() {
    for seed in 10..14 {
        let level = generate(&small_config(), seed).unwrap();
        let grid = level.to_grid();
        let result = solve(&grid, 12);
        assert!(result.found, "seed {}", seed);
        let end = replay(&grid, &result.moves, MOVE_SETTLE_TICKS).unwrap();
        assert_eq!(end.uncollected_coins(), 0, "seed {}", seed);
    }

    for grid in [plugged(), double_plug()] {
        let result = solve(&grid, 6);
        assert!(result.found);
        let end = replay(&grid, &result.moves, MOVE_SETTLE_TICKS).unwrap();
        assert_eq!(end.uncollected_coins(), 0);
    }
}

#[test]
fn test_solver_matches_brute_force() {
    for grid in [plugged(), double_plug(), homeless(), boxed()] {
        let start = settle(&grid, INITIAL_SETTLE_TICKS).grid;
        let shortest = (0..=3).find(|&d| brute_force(&start, d));
        for depth in 0..=3 {
            let result = solve(&grid, depth);
            assert_eq!(result.found, brute_force(&start, depth), "depth {}", depth);
            if result.found {
                assert_eq!(Some(result.move_count()), shortest);
            }
        }
    }
}

#[test]
fn test_reachability_rejection_means_unsolvable() {
    for grid in [homeless(), boxed()] {
        assert!(!check_reachability(&grid));
        assert!(!solve(&grid, 8).found);
    }
    assert!(check_reachability(&plugged()));
    assert!(check_reachability(&double_plug()));
}

#[test]
fn test_routing_grows_with_obstacle_density() {
    let base = plugged();
    let solution = solve(&base, 5).moves;
    assert!(!solution.is_empty());

    let mut grid = GridState::new(6, 3);
    for e in &base.entities {
        grid.spawn(e.kind.clone(), e.color, e.row, e.col).unwrap();
    }
    let mut last = analyze(&grid, &solution).metrics.routing;
    let mut density = grid.obstacle_density();
    for (row, col) in [(4, 0), (4, 1), (4, 2), (5, 0), (5, 1), (5, 2)] {
        grid.spawn(EntityKind::Obstacle, None, row, col).unwrap();
        assert!(grid.obstacle_density() > density);
        density = grid.obstacle_density();
        let routing = analyze(&grid, &solution).metrics.routing;
        assert!(routing >= last);
        last = routing;
    }
}

#[test]
fn test_adjusted_generated_levels_stay_solvable() {
    let adjuster = AutoAdjuster::with_config(AdjusterConfig {
        solver_depth: 12,
        ..AdjusterConfig::default()
    });
    for (seed, target) in [(21, 0.7), (22, 0.05), (23, 0.4)] {
        let grid = generate(&small_config(), seed).unwrap().to_grid();
        let mut rng = seeded(seed);
        let result = adjuster.adjust(&grid, target, 5, &mut rng).unwrap();
        let end = replay(&result.grid, &result.solution, MOVE_SETTLE_TICKS).unwrap();
        assert_eq!(end.uncollected_coins(), 0, "seed {}", seed);
        assert!(solve(&result.grid, 12).found, "seed {}", seed);
    }
}

#[test]
fn test_single_step_collects_coin() {
    let mut grid = GridState::new(3, 3);
    grid.spawn(EntityKind::Coin, Some(Color::Yellow), 1, 1).unwrap();
    grid.spawn(EntityKind::container(1), Some(Color::Yellow), 2, 1)
        .unwrap();
    let (next, events) = settle_step(&grid);
    assert_eq!(next.uncollected_coins(), 0);
    assert_eq!(events[0].to_string(), "COLLECT_YELLOW");
}

#[test]
fn test_deflector_forces_right() {
    let mut grid = GridState::new(3, 3);
    let coin = grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 1).unwrap();
    grid.spawn(
        EntityKind::Deflector {
            direction: Side::Right,
        },
        None,
        1,
        1,
    )
    .unwrap();

    let (next, _) = settle_step(&grid);
    let moved = next.entity(coin).unwrap();
    assert_eq!((moved.row, moved.col), (1, 2));

    let settled = settle(&grid, 10);
    assert_eq!(settled.grid.entity(coin).unwrap().col, 2);
}

#[test]
fn test_boxed_coin_never_moves() {
    let grid = boxed();
    let settled = settle(&grid, INITIAL_SETTLE_TICKS);
    assert!(settled.stable);
    assert_eq!(settled.ticks, 0);
    assert_eq!(settled.grid, grid);
    assert!(!check_reachability(&grid));
}

#[test]
fn test_same_seed_generates_same_level() {
    let config = small_config();
    let first = generate(&config, 2024).unwrap();
    for _ in 0..9 {
        assert_eq!(generate(&config, 2024).unwrap(), first);
    }
}

#[test]
fn test_target_at_current_score_converges_untouched() {
    let grid = double_plug();
    let solution = solve(&grid, 10).moves;
    let score = analyze(&grid, &solution).score;
    let mut rng = seeded(77);
    let result = AutoAdjuster::new().adjust(&grid, score / 100.0, 10, &mut rng).unwrap();
    assert!(result.success);
    assert!(result.strategies_applied.is_empty());
    assert_eq!(result.final_score, score);
}

#[test]
fn test_generated_level_json_reloads() {
    let level = generate(&small_config(), 5).unwrap();
    let text = serde_json::to_string(&level).unwrap();
    let back: Level = serde_json::from_str(&text).unwrap();
    assert_eq!(back, level);
    assert!(check_reachability(&back.to_grid()));
}
