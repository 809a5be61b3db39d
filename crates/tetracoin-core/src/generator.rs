use crate::adjuster::{AdjusterConfig, AutoAdjuster};
use crate::difficulty::{analyze, DifficultyReport, DifficultyTier};
use crate::entity::{Color, EntityKind};
use crate::error::GenerationError;
use crate::flow_control::add_obstacles;
use crate::grid::GridState;
use crate::level::{Dimensions, Level, LevelMetadata};
use crate::moves::Move;
use crate::placer::place;
use crate::rng::{entropy_seed, seeded, GenRng};
use crate::solver::{Solver, SolverConfig};
use crate::structure::check_structure;
use crate::validation::unreachable_coins;
use rand::seq::SliceRandom;
use rayon::prelude::*;

/// Configuration for level generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub rows: usize,
    pub cols: usize,
    pub num_coins: usize,
    pub num_containers: usize,
    /// Starting capacity of every container
    pub container_capacity: u32,
    /// Drives coin placement, obstacle density and the solver budget
    pub tier: DifficultyTier,
    /// Maximum attempts before giving up
    pub max_attempts: usize,
    /// Desired 0-100 score; runs the auto-adjuster when set
    pub target_score: Option<f64>,
    pub max_adjust_iterations: usize,
    /// Keep a best-effort adjusted grid that missed the target
    pub accept_unconverged: bool,
    pub solver: SolverConfig,
    pub adjuster: AdjusterConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::medium()
    }
}

impl GeneratorConfig {
    fn preset(tier: DifficultyTier, rows: usize, cols: usize, coins: usize, containers: usize) -> Self {
        Self {
            rows,
            cols,
            num_coins: coins,
            num_containers: containers,
            container_capacity: 5,
            tier,
            max_attempts: 50,
            target_score: None,
            max_adjust_iterations: 20,
            accept_unconverged: true,
            solver: SolverConfig::default(),
            adjuster: AdjusterConfig::default(),
        }
    }

    pub fn easy() -> Self {
        Self::preset(DifficultyTier::Easy, 8, 6, 3, 2)
    }

    pub fn medium() -> Self {
        Self::preset(DifficultyTier::Medium, 10, 8, 5, 2)
    }

    pub fn hard() -> Self {
        Self::preset(DifficultyTier::Hard, 12, 10, 8, 3)
    }

    pub fn expert() -> Self {
        Self::preset(DifficultyTier::Expert, 15, 12, 12, 3)
    }

    pub fn for_tier(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::Easy => Self::easy(),
            DifficultyTier::Medium => Self::medium(),
            DifficultyTier::Hard => Self::hard(),
            DifficultyTier::Expert => Self::expert(),
        }
    }

    /// Reject configurations no attempt could satisfy
    pub fn validate(&self) -> Result<(), GenerationError> {
        let invalid = |msg: String| Err(GenerationError::InvalidConfig(msg));
        if self.rows < 2 || self.cols == 0 {
            return invalid(format!("grid {}x{} is too small", self.rows, self.cols));
        }
        if self.num_containers == 0 || self.num_containers > self.cols {
            return invalid(format!(
                "{} containers do not fit {} columns",
                self.num_containers, self.cols
            ));
        }
        if self.num_coins == 0 {
            return invalid("at least one coin is required".into());
        }
        if self.num_coins > (self.rows - 1) * self.cols {
            return invalid(format!("{} coins do not fit the grid", self.num_coins));
        }
        if self.max_attempts == 0 {
            return invalid("max_attempts must be positive".into());
        }
        if let Some(target) = self.target_score {
            if !(0.0..=100.0).contains(&target) {
                return invalid(format!("target score {} is outside 0-100", target));
            }
        }
        Ok(())
    }
}

/// Aggregate counters over many generation requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub requests: usize,
    pub successful: usize,
    pub total_attempts: usize,
    pub structural_failures: usize,
    pub unsolvable_attempts: usize,
    pub unconverged_attempts: usize,
    pub adjusted_levels: usize,
}

impl GenerationStats {
    pub fn success_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.successful as f64 / self.requests as f64
    }

    pub fn merge(&mut self, other: &GenerationStats) {
        self.requests += other.requests;
        self.successful += other.successful;
        self.total_attempts += other.total_attempts;
        self.structural_failures += other.structural_failures;
        self.unsolvable_attempts += other.unsolvable_attempts;
        self.unconverged_attempts += other.unconverged_attempts;
        self.adjusted_levels += other.adjusted_levels;
    }

    fn record_failure(&mut self, err: &GenerationError) {
        match err {
            GenerationError::Structural(_) => self.structural_failures += 1,
            GenerationError::Unsolvable(_) => self.unsolvable_attempts += 1,
            GenerationError::AdjustmentNonConvergence { .. } => self.unconverged_attempts += 1,
            _ => {}
        }
    }
}

/// A candidate that survived every check
struct Candidate {
    grid: GridState,
    solution: Vec<Move>,
    report: DifficultyReport,
    converged: Option<bool>,
}

/// Containers on the bottom row in distinct shuffled columns, cycling the palette
fn place_containers(grid: &mut GridState, config: &GeneratorConfig, rng: &mut GenRng) -> Result<(), GenerationError> {
    let bottom = grid.rows - 1;
    let mut columns: Vec<usize> = (0..grid.cols).collect();
    columns.shuffle(rng);
    for (i, &col) in columns.iter().take(config.num_containers).enumerate() {
        let color = Color::PALETTE[i % Color::PALETTE.len()];
        grid.spawn(EntityKind::container(config.container_capacity), Some(color), bottom, col)
            .map_err(|e| GenerationError::Structural(e.to_string()))?;
    }
    Ok(())
}

fn attempt(config: &GeneratorConfig, rng: &mut GenRng) -> Result<Candidate, GenerationError> {
    let tier = config.tier;
    let mut grid = GridState::new(config.rows, config.cols);
    place_containers(&mut grid, config, rng)?;

    if !place(&mut grid, config.num_coins, tier, rng) {
        return Err(GenerationError::Structural("coin placement failed".into()));
    }

    let mut grid = add_obstacles(&grid, tier, rng);
    let stranded = unreachable_coins(&grid);
    if !stranded.is_empty() {
        return Err(GenerationError::Unsolvable(format!(
            "coins {:?} cannot reach a container",
            stranded
        )));
    }

    let depth = tier.solver_depth();
    let result = Solver::with_config(config.solver.clone()).solve(&grid, depth);
    if !result.found {
        return Err(GenerationError::Unsolvable(format!(
            "no solution within {} moves ({})",
            depth, result.termination
        )));
    }
    let mut solution = result.moves;
    let mut report = analyze(&grid, &solution);
    let mut converged = None;

    if let Some(target) = config.target_score {
        let adjuster_config = AdjusterConfig {
            solver_depth: depth,
            solver: config.solver.clone(),
            ..config.adjuster.clone()
        };
        if !adjuster_config.within_tolerance(report.score, target / 100.0) {
            let adjusted = AutoAdjuster::with_config(adjuster_config).adjust(
                &grid,
                target / 100.0,
                config.max_adjust_iterations,
                rng,
            )?;
            if !adjusted.success && !config.accept_unconverged {
                return Err(GenerationError::AdjustmentNonConvergence {
                    best_score: adjusted.final_score,
                    target_score: target,
                });
            }
            log::debug!(
                "adjusted {:.1} -> {:.1} via {:?}",
                report.score,
                adjusted.final_score,
                adjusted.strategies_applied
            );
            grid = adjusted.grid;
            solution = adjusted.solution;
            report = analyze(&grid, &solution);
            converged = Some(adjusted.success);
        } else {
            converged = Some(true);
        }
    }

    let structure = check_structure(&grid);
    if let Some(issue) = structure.errors.first() {
        return Err(GenerationError::Structural(issue.to_string()));
    }

    Ok(Candidate {
        grid,
        solution,
        report,
        converged,
    })
}

/// Generate one level, recording what happened into `stats`
pub fn generate_with_stats(
    config: &GeneratorConfig,
    seed: u64,
    stats: &mut GenerationStats,
) -> Result<Level, GenerationError> {
    config.validate()?;
    stats.requests += 1;
    let mut rng = seeded(seed);
    let mut last = None;

    for attempt_no in 1..=config.max_attempts {
        stats.total_attempts += 1;
        match attempt(config, &mut rng) {
            Ok(candidate) => {
                stats.successful += 1;
                if candidate.converged.is_some() {
                    stats.adjusted_levels += 1;
                }
                let level = build_level(candidate, seed, attempt_no);
                log::info!(
                    "generated {} ({}, score {:.1}) after {} attempt(s)",
                    level.id,
                    level.metadata.difficulty_tier,
                    level.metadata.difficulty_score,
                    attempt_no
                );
                return Ok(level);
            }
            Err(err) => {
                log::debug!("attempt {}/{} failed: {}", attempt_no, config.max_attempts, err);
                stats.record_failure(&err);
                last = Some(err);
            }
        }
    }

    let last = last.unwrap_or_else(|| GenerationError::Structural("no attempt was made".into()));
    Err(GenerationError::Exhausted {
        attempts: config.max_attempts,
        last: Box::new(last),
    })
}

/// Generate one level from an explicit seed
pub fn generate(config: &GeneratorConfig, seed: u64) -> Result<Level, GenerationError> {
    generate_with_stats(config, seed, &mut GenerationStats::default())
}

/// Generate `count` levels in parallel with seeds `seed_start + i`, in index order
pub fn generate_batch(
    config: &GeneratorConfig,
    count: usize,
    seed_start: u64,
) -> (Vec<Result<Level, GenerationError>>, GenerationStats) {
    let runs: Vec<_> = (0..count as u64)
        .into_par_iter()
        .map(|i| {
            let mut stats = GenerationStats::default();
            let result = generate_with_stats(config, seed_start.wrapping_add(i), &mut stats);
            (result, stats)
        })
        .collect();

    let mut total = GenerationStats::default();
    let results = runs
        .into_iter()
        .map(|(result, stats)| {
            total.merge(&stats);
            result
        })
        .collect();
    log::info!(
        "batch of {} finished: {} succeeded, {} attempts",
        count,
        total.successful,
        total.total_attempts
    );
    (results, total)
}

fn build_level(candidate: Candidate, seed: u64, attempts: usize) -> Level {
    let Candidate {
        grid,
        solution,
        report,
        converged,
    } = candidate;
    Level {
        id: format!("tc-{:016x}", seed),
        grid: Dimensions {
            rows: grid.rows,
            cols: grid.cols,
        },
        metadata: LevelMetadata {
            difficulty_score: report.score,
            difficulty_tier: report.tier,
            solution_length: solution.len(),
            generation_attempts: attempts,
            seed,
            num_coins: grid.coin_count(),
            num_obstacles: grid.obstacle_count(),
            adjustment_converged: converged,
        },
        entities: grid.entities,
        solution,
    }
}

/// Level generator holding a config, a seed sequence and running stats
pub struct Generator {
    config: GeneratorConfig,
    next_seed: u64,
    stats: GenerationStats,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Create a new generator with default configuration and an entropy seed
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    /// Create a generator with custom configuration
    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            next_seed: entropy_seed(),
            stats: GenerationStats::default(),
        }
    }

    /// Create a generator with a specific seed for reproducibility
    pub fn with_seed(seed: u64) -> Self {
        Self {
            config: GeneratorConfig::default(),
            next_seed: seed,
            stats: GenerationStats::default(),
        }
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.next_seed = seed;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }

    fn take_seed(&mut self) -> u64 {
        let seed = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(1);
        seed
    }

    /// Generate a level with the current configuration
    pub fn generate_with_config(&mut self) -> Result<Level, GenerationError> {
        let seed = self.take_seed();
        generate_with_stats(&self.config, seed, &mut self.stats)
    }

    /// Switch to a tier preset and generate
    pub fn generate(&mut self, tier: DifficultyTier) -> Result<Level, GenerationError> {
        self.config = GeneratorConfig::for_tier(tier);
        self.generate_with_config()
    }

    /// Generate `count` levels in parallel from the next seeds in sequence
    pub fn generate_batch(&mut self, count: usize) -> Vec<Result<Level, GenerationError>> {
        let seed_start = self.next_seed;
        self.next_seed = self.next_seed.wrapping_add(count as u64);
        let (results, stats) = generate_batch(&self.config, count, seed_start);
        self.stats.merge(&stats);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::replay;
    use crate::physics::MOVE_SETTLE_TICKS;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            rows: 6,
            cols: 5,
            num_coins: 3,
            num_containers: 2,
            ..GeneratorConfig::easy()
        }
    }

    #[test]
    fn test_generate_easy() {
        let level = generate(&small(), 42).unwrap();
        assert_eq!(level.grid, Dimensions { rows: 6, cols: 5 });
        assert_eq!(level.metadata.num_coins, 3);
        assert_eq!(level.metadata.seed, 42);
        assert_eq!(level.metadata.solution_length, level.solution.len());

        let end = replay(&level.to_grid(), &level.solution, MOVE_SETTLE_TICKS).unwrap();
        assert_eq!(end.uncollected_coins(), 0);
        assert!(check_structure(&level.to_grid()).is_valid());
    }

    #[test]
    fn test_containers_on_bottom_row() {
        let level = generate(&small(), 7).unwrap();
        let grid = level.to_grid();
        let cols: Vec<_> = grid.containers().map(|pb| (pb.row, pb.col)).collect();
        assert_eq!(cols.len(), 2);
        assert!(cols.iter().all(|&(r, _)| r == 5));
        assert_ne!(cols[0].1, cols[1].1);
    }

    #[test]
    fn test_same_seed_same_level() {
        let a = generate(&small(), 1234).unwrap();
        let b = generate(&small(), 1234).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_config() {
        let config = GeneratorConfig {
            num_containers: 9,
            ..small()
        };
        assert!(matches!(
            generate(&config, 0),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_exhaustion_reports_attempts() {
        // Five coins cannot fit one Easy column of five rows.
        let config = GeneratorConfig {
            rows: 5,
            cols: 3,
            num_coins: 5,
            num_containers: 1,
            max_attempts: 3,
            ..GeneratorConfig::easy()
        };
        match generate(&config, 9) {
            Err(GenerationError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, GenerationError::Structural(_)));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn test_unconverged_adjustment_is_rejected_when_strict() {
        let config = GeneratorConfig {
            target_score: Some(95.0),
            accept_unconverged: false,
            max_attempts: 3,
            max_adjust_iterations: 3,
            ..small()
        };
        let mut stats = GenerationStats::default();
        match generate_with_stats(&config, 31, &mut stats) {
            Err(GenerationError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }

        // Every attempt that reached the adjuster counts as unconverged.
        let analyzed = stats.total_attempts - stats.structural_failures - stats.unsolvable_attempts;
        assert_eq!(stats.total_attempts, 3);
        assert!(analyzed > 0);
        assert_eq!(stats.unconverged_attempts, analyzed);
        assert_eq!(stats.successful, 0);
        assert_eq!(stats.adjusted_levels, 0);
    }

    #[test]
    fn test_unconverged_adjustment_is_kept_by_default() {
        let config = GeneratorConfig {
            target_score: Some(95.0),
            max_adjust_iterations: 3,
            ..small()
        };
        let mut stats = GenerationStats::default();
        let level = generate_with_stats(&config, 31, &mut stats).unwrap();
        assert_eq!(level.metadata.adjustment_converged, Some(false));
        assert_eq!(stats.unconverged_attempts, 0);
        assert_eq!(stats.adjusted_levels, 1);
    }

    #[test]
    fn test_batch_is_ordered_and_seeded() {
        let (results, stats) = generate_batch(&small(), 4, 100);
        assert_eq!(results.len(), 4);
        assert_eq!(stats.requests, 4);
        for (i, result) in results.iter().enumerate() {
            let level = result.as_ref().unwrap();
            assert_eq!(level.metadata.seed, 100 + i as u64);
            assert_eq!(level, &generate(&small(), 100 + i as u64).unwrap());
        }
    }

    #[test]
    fn test_generator_advances_seed_and_stats() {
        let mut generator = Generator::with_config(small()).seed(5);
        let first = generator.generate_with_config().unwrap();
        let second = generator.generate_with_config().unwrap();
        assert_eq!(first.metadata.seed, 5);
        assert_eq!(second.metadata.seed, 6);
        assert_eq!(generator.stats().successful, 2);
        assert!(generator.stats().total_attempts >= 2);
    }

    #[test]
    fn test_presets() {
        let expert = GeneratorConfig::expert();
        assert_eq!((expert.rows, expert.cols), (15, 12));
        assert_eq!(expert.num_coins, 12);
        assert!(GeneratorConfig::hard().validate().is_ok());
    }
}
