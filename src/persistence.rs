//! State persistence: save and restore the stage's expression to/from JSON.
//!
//! The persisted record carries exactly one field, the expression text.
//! Restoring installs the text and runs the full re-bind/recompute path; a
//! missing field restores as the empty string, which fails validation until
//! the user supplies text.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::ExpressionStage;
use crate::eval::Evaluator;
use crate::source::SampleSource;
use crate::vars::PipelineRoot;

/// Serializable mirror of the stage's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionStateSerde {
    #[serde(default)]
    pub exp: String,
}

impl ExpressionStateSerde {
    /// Capture the persisted fields from a stage.
    pub fn from_stage<E: Evaluator>(stage: &ExpressionStage<E>) -> Self {
        Self {
            exp: stage.expression().to_string(),
        }
    }

    /// Apply the stored state to a stage: installs the expression and
    /// recomputes over the current input. Validation or evaluation failures
    /// are recovered by the stage and reported through its events.
    pub fn apply_to<E: Evaluator>(
        self,
        stage: &mut ExpressionStage<E>,
        source: &dyn SampleSource,
        root: &dyn PipelineRoot,
    ) {
        stage.apply_expression(&self.exp, source, root);
    }
}

// ---------- Public API ----------

/// Serialize the stage state as JSON.
pub fn state_to_json(state: &ExpressionStateSerde) -> Result<String, String> {
    serde_json::to_string_pretty(state).map_err(|e| e.to_string())
}

/// Deserialize stage state from JSON.
pub fn state_from_json(json: &str) -> Result<ExpressionStateSerde, String> {
    serde_json::from_str(json).map_err(|e| e.to_string())
}

/// Save the stage state to a JSON file at the given path.
pub fn save_state_to_path(state: &ExpressionStateSerde, path: &Path) -> Result<(), String> {
    let txt = state_to_json(state)?;
    std::fs::write(path, txt).map_err(|e| e.to_string())
}

/// Load the stage state from a JSON file at the given path.
pub fn load_state_from_path(path: &Path) -> Result<ExpressionStateSerde, String> {
    let txt = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    state_from_json(&txt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_expression_text() {
        let state = ExpressionStateSerde {
            exp: "z - 50".to_string(),
        };
        let json = state_to_json(&state).unwrap();
        assert_eq!(state_from_json(&json).unwrap(), state);
    }

    #[test]
    fn missing_field_defaults_to_empty_text() {
        let state = state_from_json("{}").unwrap();
        assert_eq!(state.exp, "");
    }
}
