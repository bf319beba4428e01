use thiserror::Error;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing reference data '{dataset}': no {prefix}*.csv in {dir}")]
    MissingReference {
        dataset: String,
        prefix: String,
        dir: String,
    },
    #[error("reference data '{dataset}' has no rows")]
    EmptyReference { dataset: String },
    #[error("{file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },
    #[error("{file} line {line}: invalid {column} '{value}': {reason}")]
    InvalidField {
        file: String,
        line: u64,
        column: String,
        value: String,
        reason: String,
    },
    #[error("'{0}' not found in reference catalog")]
    NotFound(String),
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Core(#[from] rxsynth_core::Error),
    #[error(transparent)]
    Plan(#[from] rxsynth_plan::PlanError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
