//! Error types for LakshyaNav

use thiserror::Error;

use crate::perception::PerceptionError;

/// Result type alias
pub type Result<T> = std::result::Result<T, LakshyaError>;

/// LakshyaNav error type
#[derive(Debug, Error)]
pub enum LakshyaError {
    /// A required car-state field was absent from the observation.
    /// Fatal to the cycle: no command is produced.
    #[error("malformed observation: missing field `{0}`")]
    MalformedObservation(&'static str),

    /// The object-detection dependency failed for this cycle. Distinct
    /// from an empty detection list, which is a normal search branch.
    #[error("perception unavailable: {0}")]
    PerceptionUnavailable(#[from] PerceptionError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Command serialization error
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<toml::de::Error> for LakshyaError {
    fn from(e: toml::de::Error) -> Self {
        LakshyaError::Config(e.to_string())
    }
}
