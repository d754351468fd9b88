use serde::{Deserialize, Serialize};

/// Policy cutoffs applied when a program does not declare its own threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Minimum rule-set score (0-100) for an eligible verdict.
    pub default_threshold: u8,
    /// Minimum satisfied share (0.0-1.0) for the knowledge-graph model.
    pub graph_threshold: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_threshold: 50,
            graph_threshold: 0.8,
        }
    }
}
