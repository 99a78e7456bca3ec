//! Error types for floor-planning and performance estimation

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the estimator
pub type Result<T> = std::result::Result<T, NeuroSimError>;

/// Errors that stop a simulation run
#[derive(Debug, Error)]
pub enum NeuroSimError {
    /// Network, weight or input file cannot be opened
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted
        path: PathBuf,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// A numeric field could not be parsed
    #[error("malformed value {value:?} in {path} at line {line}, column {column}")]
    MalformedInput {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    /// The network description is not usable
    #[error("invalid network description: {reason}")]
    InvalidNetwork { reason: String },

    /// A matrix does not match the geometry it is used with
    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: String,
        expected: String,
        found: String,
    },

    /// The chip hierarchy cannot be built with the given sub-array size
    #[error("configuration infeasible: {reason}")]
    ConfigurationInfeasible { reason: String },

    /// No weight/input files were given for a layer
    #[error("missing weight/input data for layer {layer}")]
    MissingLayerData { layer: usize },

    /// Settings could not be loaded
    #[error("settings error: {0}")]
    Config(#[from] config::ConfigError),
}

impl NeuroSimError {
    pub fn infeasible(reason: impl Into<String>) -> Self {
        Self::ConfigurationInfeasible {
            reason: reason.into(),
        }
    }

    pub fn invalid_network(reason: impl Into<String>) -> Self {
        Self::InvalidNetwork {
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch(
        what: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}
