//! Error types for contract violations in the core.
//!
//! Expected domain outcomes (no path, an isolated node, a skipped bad point)
//! are values, not errors. Only misuse of the API ends up here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoadmeshError {
    #[error("Node {0} is not present in the graph")]
    UnknownNode(String),
    #[error("Invalid segment data: {0}")]
    InvalidSegmentData(String),
    #[error("Invalid network rules: {0}")]
    InvalidRules(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoadmeshError>;
