//! Error types for the correlnet library

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Correlation method name is not one of the built-ins
    #[error("Unsupported correlation method: {0}")]
    UnsupportedMethod(String),

    /// Multiple-testing procedure name is not recognised
    #[error("Unsupported multiple-testing correction: {0}")]
    UnsupportedCorrection(String),

    /// Embedding variant name is not recognised
    #[error("Invalid embedding method: {0}")]
    InvalidEmbeddingMethod(String),

    /// Two sequences that must be aligned have different lengths
    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Pairwise results do not pivot into a complete square matrix
    #[error("Malformed correlation matrix: {0}")]
    MalformedCorrelationMatrix(String),

    /// Significance threshold outside [0, 1]
    #[error("Invalid significance threshold {0}, expected a value in [0, 1]")]
    InvalidThreshold(f64),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Not enough data for the requested computation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Cell could not be parsed as a number
    #[error("Failed to parse data: {0}")]
    Parse(String),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration file could not be decoded
    #[error("Config format error: {0}")]
    ConfigFormat(#[from] toml::de::Error),

    /// Configuration could not be encoded
    #[error("Config encode error: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error comes from an unrecognised configuration value
    /// rather than from the data itself.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMethod(_)
                | Error::UnsupportedCorrection(_)
                | Error::InvalidEmbeddingMethod(_)
                | Error::InvalidThreshold(_)
                | Error::InvalidConfig(_)
        )
    }
}
