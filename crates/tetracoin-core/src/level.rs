use crate::difficulty::DifficultyTier;
use crate::entity::Entity;
use crate::grid::GridState;
use crate::moves::Move;
use serde::{Deserialize, Serialize};

/// Grid dimensions as stored in a level file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelMetadata {
    pub difficulty_score: f64,
    pub difficulty_tier: DifficultyTier,
    pub solution_length: usize,
    pub generation_attempts: usize,
    pub seed: u64,
    pub num_coins: usize,
    pub num_obstacles: usize,
    /// Set only when the auto-adjuster ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjustment_converged: Option<bool>,
}

/// A finished, solvable level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    pub grid: Dimensions,
    pub entities: Vec<Entity>,
    pub metadata: LevelMetadata,
    /// Shortest known solution, usable as a hint
    #[serde(default)]
    pub solution: Vec<Move>,
}

impl Level {
    /// Rebuild the playable grid
    pub fn to_grid(&self) -> GridState {
        GridState {
            rows: self.grid.rows,
            cols: self.grid.cols,
            entities: self.entities.clone(),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}  {}x{}  {} (score {:.1}, {} moves)",
            self.id,
            self.grid.rows,
            self.grid.cols,
            self.metadata.difficulty_tier,
            self.metadata.difficulty_score,
            self.metadata.solution_length
        )?;
        write!(f, "{}", self.to_grid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Color, Direction, EntityKind};

    fn sample() -> Level {
        let mut grid = GridState::new(3, 2);
        grid.spawn(EntityKind::Coin, Some(Color::Red), 0, 0).unwrap();
        grid.spawn(EntityKind::Obstacle, None, 1, 0).unwrap();
        grid.spawn(EntityKind::container(1), Some(Color::Red), 2, 0)
            .unwrap();
        Level {
            id: "sample".into(),
            grid: Dimensions { rows: 3, cols: 2 },
            entities: grid.entities,
            metadata: LevelMetadata {
                difficulty_score: 6.0,
                difficulty_tier: DifficultyTier::Easy,
                solution_length: 1,
                generation_attempts: 1,
                seed: 42,
                num_coins: 1,
                num_obstacles: 1,
                adjustment_converged: None,
            },
            solution: vec![Move::new(1, Direction::Right)],
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["grid"]["rows"], 3);
        assert_eq!(json["entities"][0]["kind"], "COIN");
        assert_eq!(json["entities"][0]["color"], "RED");
        assert_eq!(json["entities"][2]["capacity"], 1);
        assert_eq!(json["metadata"]["difficulty_tier"], "EASY");
        assert!(json["metadata"].get("adjustment_converged").is_none());
        assert_eq!(json["solution"][0]["direction"], "RIGHT");
    }

    #[test]
    fn test_reload() {
        let level = sample();
        let text = serde_json::to_string_pretty(&level).unwrap();
        let back: Level = serde_json::from_str(&text).unwrap();
        assert_eq!(back, level);
        assert_eq!(back.to_grid().coin_count(), 1);
    }
}
