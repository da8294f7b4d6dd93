//! FILENAME: explorer-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Member {unique_name} at depth {depth} has no parent in the tree")]
    MalformedPosition { unique_name: String, depth: usize },

    #[error("Unrecognized sort strategy: {0}")]
    UnrecognizedSortStrategy(String),

    #[error("Hierarchy index {index} out of range ({available} available)")]
    MissingHierarchy { index: usize, available: usize },

    #[error("Hierarchy {hierarchy} declares no levels")]
    MissingLevels { hierarchy: String },

    #[error("Invalid JSON: {0}")]
    Config(#[from] serde_json::Error),
}
