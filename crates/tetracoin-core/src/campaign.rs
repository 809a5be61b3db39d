//! Multi-level campaigns with a rising difficulty curve.

use crate::difficulty::DifficultyTier;
use crate::error::GenerationError;
use crate::generator::{generate, GeneratorConfig};
use crate::level::Level;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const START_SCORE: f64 = 15.0;
const END_SCORE: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    /// Levels after the tutorials
    pub levels: usize,
    pub tutorial_levels: usize,
    /// Every n-th level is a boss; 0 disables bosses
    pub boss_interval: usize,
    pub seed: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            levels: 20,
            tutorial_levels: 3,
            boss_interval: 5,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignLevel {
    /// 1-based position in the campaign, tutorials included
    pub index: usize,
    /// 0 for tutorials
    pub world: usize,
    pub is_boss: bool,
    pub target_score: Option<f64>,
    pub level: Level,
}

fn tier_for_target(target: f64) -> DifficultyTier {
    if target < 30.0 {
        DifficultyTier::Easy
    } else if target < 60.0 {
        DifficultyTier::Medium
    } else if target < 85.0 {
        DifficultyTier::Hard
    } else {
        DifficultyTier::Expert
    }
}

/// Generation plan for one slot of the campaign
#[derive(Debug, Clone)]
struct Slot {
    index: usize,
    world: usize,
    is_boss: bool,
    target_score: Option<f64>,
    config: GeneratorConfig,
}

fn tutorial_slot(i: usize) -> Slot {
    Slot {
        index: i + 1,
        world: 0,
        is_boss: false,
        target_score: None,
        config: GeneratorConfig {
            rows: 5,
            cols: 6,
            num_coins: 2 + i,
            num_containers: 1,
            ..GeneratorConfig::easy()
        },
    }
}

fn main_slot(config: &CampaignConfig, n: usize) -> Slot {
    let progress = if config.levels > 1 {
        (n - 1) as f64 / (config.levels - 1) as f64
    } else {
        0.0
    };
    let mut target = START_SCORE + (END_SCORE - START_SCORE) * progress;
    let is_boss = config.boss_interval > 0 && n % config.boss_interval == 0;
    if is_boss {
        target = (target * 1.2 + 10.0).min(100.0);
    }

    let mut level_config = GeneratorConfig::for_tier(tier_for_target(target));
    if is_boss {
        level_config.rows += 2;
        level_config.num_coins += 3;
    }
    level_config.target_score = Some(target);

    let world = match config.boss_interval {
        0 => 1,
        interval => (n - 1) / interval + 1,
    };
    Slot {
        index: config.tutorial_levels + n,
        world,
        is_boss,
        target_score: Some(target),
        config: level_config,
    }
}

fn plan(config: &CampaignConfig) -> Vec<Slot> {
    (0..config.tutorial_levels)
        .map(tutorial_slot)
        .chain((1..=config.levels).map(|n| main_slot(config, n)))
        .collect()
}

/// Generate every campaign level in parallel; level `i` uses seed `seed + i`
pub fn generate_campaign(config: &CampaignConfig) -> Result<Vec<CampaignLevel>, GenerationError> {
    let slots = plan(config);
    log::info!(
        "generating campaign of {} levels ({} tutorials)",
        slots.len(),
        config.tutorial_levels
    );

    slots
        .into_par_iter()
        .map(|slot| {
            let seed = config.seed.wrapping_add(slot.index as u64);
            let mut level = generate(&slot.config, seed)?;
            level.id = format!("campaign-{:03}", slot.index);
            Ok(CampaignLevel {
                index: slot.index,
                world: slot.world,
                is_boss: slot.is_boss,
                target_score: slot.target_score,
                level,
            })
        })
        .collect()
}
