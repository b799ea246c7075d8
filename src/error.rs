//! Error types for site ingestion and ranking

use thiserror::Error;

/// Errors that can occur while building site collections or ranking them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Record {record}: missing field `{field}`")]
    MissingField { record: usize, field: &'static str },
    #[error("Record {record}: invalid {field} `{value}` ({reason})")]
    InvalidCoordinate {
        record: usize,
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("Empty collection: {0}")]
    EmptyCollection(String),
    #[error("Neighbor count must be at least 1, got {0}")]
    InvalidNeighborCount(usize),
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// A specialized Result type for site operations
pub type Result<T> = std::result::Result<T, Error>;
