use thiserror::Error;

/// Failures of the generation pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// A placement step could not satisfy its constraints
    #[error("structural failure: {0}")]
    Structural(String),

    /// Reachability or the exact solver rejected the grid
    #[error("unsolvable candidate: {0}")]
    Unsolvable(String),

    /// The adjuster ran out of budget outside tolerance
    #[error("difficulty adjustment did not converge (best score {best_score:.1}, target {target_score:.1})")]
    AdjustmentNonConvergence { best_score: f64, target_score: f64 },

    /// No attempt produced a valid level
    #[error("generation exhausted after {attempts} attempts (last failure: {last})")]
    Exhausted { attempts: usize, last: Box<GenerationError> },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
