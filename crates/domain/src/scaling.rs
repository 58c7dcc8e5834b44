use serde::{Deserialize, Serialize};

use crate::ids::EngineId;

/// A scaling intent produced by the instance scaler.
///
/// Pure output: nothing is started or stopped by producing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ScaleDecision {
    /// Start another instance serving `zone`.
    ScaleUp { zone: String },
    /// Retire the instance of `zone` running on `engine_id`.
    ScaleDown { zone: String, engine_id: EngineId },
}

impl ScaleDecision {
    pub fn zone(&self) -> &str {
        match self {
            ScaleDecision::ScaleUp { zone } | ScaleDecision::ScaleDown { zone, .. } => zone,
        }
    }
}
