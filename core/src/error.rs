use thiserror::Error;

/// Contract violations. Bad business input never lands here: rates are
/// clamped, unknown keys fall back to neutral values, and an empty plan
/// projects to zero.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid period count: must be at least 1, got {0}")]
    InvalidPeriodCount(usize),

    #[error("Revenue series too short: expected {expected} periods, got {actual}")]
    SeriesTooShort { expected: usize, actual: usize },

    #[error("Cost schedule too short: expected {expected} periods, got {actual}")]
    CostScheduleTooShort { expected: usize, actual: usize },

    #[error("Invalid knowledge base: {0}")]
    InvalidKnowledgeBase(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
