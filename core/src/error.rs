use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Only use numbers for the participant ID (got '{input}')")]
    InvalidParticipantId { input: String },

    #[error("Unknown task '{name}' (expected crcp, bart or psap)")]
    UnknownTask { name: String },

    #[error("Unknown condition '{label}' (expected A, B or C)")]
    UnknownCondition { label: String },

    #[error("The psap task needs a condition (A, B or C)")]
    MissingCondition,

    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid transition: cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },

    #[error("Trial {trial_id} has no terminal outcome yet")]
    TrialNotFinished { trial_id: u32 },

    #[error("Trial {trial_id} was already settled")]
    AlreadySettled { trial_id: u32 },

    #[error("Input source closed")]
    InputClosed,
}

pub type TaskResult<T> = Result<T, TaskError>;
