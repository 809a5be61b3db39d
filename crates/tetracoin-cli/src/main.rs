use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tetracoin_core::rng::entropy_seed;
use tetracoin_core::{
    analyze, generate, generate_batch, generate_campaign, unreachable_coins, CampaignConfig,
    DifficultyTier, GeneratorConfig, Level, Solver, SolverConfig,
};

#[derive(Debug, Parser)]
#[command(name = "tetracoin")]
#[command(about = "Generate and solve Tetracoin puzzle levels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate a single level
    Generate {
        #[arg(long, default_value = "medium")]
        tier: DifficultyTier,
        /// Numeric 1-10 difficulty level, overrides --tier
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
        level: Option<u32>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        rows: Option<usize>,
        #[arg(long)]
        cols: Option<usize>,
        #[arg(long)]
        coins: Option<usize>,
        #[arg(long)]
        containers: Option<usize>,
        /// Desired difficulty score, 0-100
        #[arg(long)]
        target_score: Option<f64>,
        #[arg(long)]
        max_attempts: Option<usize>,
        /// Write the level here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the grid and difficulty breakdown to stderr
        #[arg(long, default_value_t = false)]
        show: bool,
    },
    /// Generate many levels in parallel
    Batch {
        #[arg(long)]
        count: usize,
        #[arg(long)]
        seed_start: Option<u64>,
        #[arg(long, default_value = "medium")]
        tier: DifficultyTier,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Generate a campaign with a rising difficulty curve
    Campaign {
        #[arg(long, default_value_t = 20)]
        levels: usize,
        #[arg(long, default_value_t = 3)]
        tutorials: usize,
        #[arg(long, default_value_t = 5)]
        boss_interval: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Reload a level file and solve it
    Solve {
        file: PathBuf,
        /// Defaults to the level's tier budget
        #[arg(long)]
        max_depth: Option<usize>,
        #[arg(long, default_value_t = 50_000)]
        max_states: usize,
    },
}

/// One line of the campaign index file
#[derive(Debug, Serialize)]
struct CampaignEntry {
    index: usize,
    world: usize,
    is_boss: bool,
    file: String,
    difficulty_score: f64,
    difficulty_tier: DifficultyTier,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            tier,
            level,
            seed,
            rows,
            cols,
            coins,
            containers,
            target_score,
            max_attempts,
            out,
            show,
        } => {
            let tier = level.map(DifficultyTier::from_level).unwrap_or(tier);
            let mut config = GeneratorConfig::for_tier(tier);
            config.rows = rows.unwrap_or(config.rows);
            config.cols = cols.unwrap_or(config.cols);
            config.num_coins = coins.unwrap_or(config.num_coins);
            config.num_containers = containers.unwrap_or(config.num_containers);
            config.max_attempts = max_attempts.unwrap_or(config.max_attempts);
            config.target_score = target_score;
            cmd_generate(&config, seed.unwrap_or_else(entropy_seed), out.as_deref(), show)
        }
        Commands::Batch {
            count,
            seed_start,
            tier,
            out_dir,
        } => cmd_batch(
            &GeneratorConfig::for_tier(tier),
            count,
            seed_start.unwrap_or_else(entropy_seed),
            &out_dir.unwrap_or_else(default_out_dir),
        ),
        Commands::Campaign {
            levels,
            tutorials,
            boss_interval,
            seed,
            out_dir,
        } => cmd_campaign(
            &CampaignConfig {
                levels,
                tutorial_levels: tutorials,
                boss_interval,
                seed,
            },
            &out_dir.unwrap_or_else(default_out_dir),
        ),
        Commands::Solve {
            file,
            max_depth,
            max_states,
        } => cmd_solve(&file, max_depth, max_states),
    }
}

/// Levels land under the platform data dir unless told otherwise
fn default_out_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tetracoin")
        .join("levels")
}

fn write_level(path: &Path, level: &Level) -> Result<()> {
    let json = serde_json::to_string_pretty(level)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn cmd_generate(config: &GeneratorConfig, seed: u64, out: Option<&Path>, show: bool) -> Result<()> {
    let level = generate(config, seed).with_context(|| format!("generating level with seed {}", seed))?;

    if show {
        eprintln!("{}", level);
        eprintln!("{}", analyze(&level.to_grid(), &level.solution).summary());
    }

    match out {
        Some(path) => {
            write_level(path, &level)?;
            log::info!("wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&level)?),
    }
    Ok(())
}

fn cmd_batch(config: &GeneratorConfig, count: usize, seed_start: u64, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let (results, stats) = generate_batch(config, count, seed_start);
    let mut written = 0;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(level) => {
                write_level(&out_dir.join(format!("{}.json", level.id)), level)?;
                written += 1;
            }
            Err(e) => log::warn!("seed {} failed: {}", seed_start.wrapping_add(i as u64), e),
        }
    }

    println!(
        "{}/{} levels written to {} ({} attempts, {:.0}% success)",
        written,
        count,
        out_dir.display(),
        stats.total_attempts,
        stats.success_rate() * 100.0
    );
    if written == 0 && count > 0 {
        bail!("no level could be generated");
    }
    Ok(())
}

fn cmd_campaign(config: &CampaignConfig, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let campaign = generate_campaign(config).context("generating campaign")?;
    let mut index = Vec::with_capacity(campaign.len());
    for entry in &campaign {
        let file = format!("{}.json", entry.level.id);
        write_level(&out_dir.join(&file), &entry.level)?;
        index.push(CampaignEntry {
            index: entry.index,
            world: entry.world,
            is_boss: entry.is_boss,
            file,
            difficulty_score: entry.level.metadata.difficulty_score,
            difficulty_tier: entry.level.metadata.difficulty_tier,
        });
    }

    let index_path = out_dir.join("campaign.json");
    fs::write(&index_path, serde_json::to_string_pretty(&index)?)
        .with_context(|| format!("writing {}", index_path.display()))?;
    println!("{} campaign levels written to {}", campaign.len(), out_dir.display());
    Ok(())
}

fn cmd_solve(file: &Path, max_depth: Option<usize>, max_states: usize) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let level: Level =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", file.display()))?;

    let grid = level.to_grid();
    let depth = max_depth.unwrap_or_else(|| level.metadata.difficulty_tier.solver_depth());
    let solver = Solver::with_config(SolverConfig {
        max_states,
        ..SolverConfig::default()
    });
    let result = solver.solve(&grid, depth);

    if !result.found {
        let stranded = unreachable_coins(&grid);
        if !stranded.is_empty() {
            log::warn!("coins {:?} have no route to a matching container", stranded);
        }
        bail!(
            "{} has no solution within {} moves ({}, {} states explored)",
            level.id,
            depth,
            result.termination,
            result.states_explored
        );
    }

    println!("{}", level);
    println!("Solved in {} moves ({} states explored)", result.move_count(), result.states_explored);
    for (i, mv) in result.moves.iter().enumerate() {
        println!("{:3}. {}", i + 1, mv);
    }
    println!("{}", analyze(&grid, &result.moves).summary());
    Ok(())
}
