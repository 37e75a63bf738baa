//! Topology construction errors.

use thiserror::Error;

/// Inconsistencies detected while building a topology.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Duplicate processor: {0}")]
    DuplicateProcessor(String),

    #[error("Duplicate stream: {0}")]
    DuplicateStream(String),

    #[error("Stream {stream} references unknown processor {processor}")]
    UnknownProcessor { stream: String, processor: String },

    #[error("Task {task} of processor {processor} is already assigned to {owner}")]
    DuplicateTask {
        task: u32,
        processor: String,
        owner: String,
    },

    #[error("Inconsistent registration: {0}")]
    InconsistentRegistration(String),
}

pub type TopologyResult<T> = std::result::Result<T, TopologyError>;
