//! Error types for squad rules

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid rules configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Unknown chip type: {0}")]
    UnknownChip(String),
}
