use thiserror::Error;

use crate::goal::{GoalId, GoalState, GoalType, Transition};

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Goal not found: {0}")]
    GoalNotFound(GoalId),

    #[error("Invalid transition {transition:?} from {state:?} on goal {goal}")]
    InvalidTransition {
        goal: GoalId,
        state: GoalState,
        transition: Transition,
    },

    #[error("Malformed parameters for {goal_type:?} goal {goal}: {reason}")]
    MalformedParams {
        goal: GoalId,
        goal_type: GoalType,
        reason: String,
    },

    #[error("Unknown unit definition: {0}")]
    UnknownUnitDef(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AiError>;
