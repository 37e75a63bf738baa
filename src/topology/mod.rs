//! Pipeline topology
//!
//! - [`id`]: `ProcessorId`/`StreamId` index newtypes
//! - [`graph`]: the immutable processor/stream graph and its builders
//! - [`walker`]: cycle-tolerant depth-first traversal with a visitor

pub mod error;
pub mod graph;
pub mod id;
pub mod walker;

pub use error::{TopologyError, TopologyResult};
pub use graph::{
    PipelineTopology, Processor, ProcessorDescription, Stream, StreamDescription,
    TopologyBuilder, TopologyDescription,
};
pub use id::{ProcessorId, StreamId};
pub use walker::{TopologyVisitor, TopologyWalker};
