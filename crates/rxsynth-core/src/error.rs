use thiserror::Error;

/// Core error type shared across rxsynth crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A row schema violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    /// A row does not match the schema it is written under.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// A value cannot be represented in the requested form.
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Unknown dataset name.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),
}

/// Convenience alias for results returned by rxsynth crates.
pub type Result<T> = std::result::Result<T, Error>;
