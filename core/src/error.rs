use thiserror::Error;

use crate::types::EntityId;

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Validation error for '{entity}': {reason}")]
    Validation { entity: EntityId, reason: String },

    #[error("Configuration error: stage '{stage}' missing from benchmark table '{table}'")]
    Configuration { stage: String, table: &'static str },

    #[error("Invalid benchmark tables: {reason}")]
    InvalidBenchmarks { reason: String },

    #[error("Invalid score weights: {reason}")]
    InvalidWeights { reason: String },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Model error: {reason}")]
    Model { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScopeError {
    pub fn validation(entity: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            entity: entity.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model { reason: reason.into() }
    }
}

pub type ScopeResult<T> = Result<T, ScopeError>;
