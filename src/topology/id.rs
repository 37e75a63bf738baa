//! Identity types for the topology graph.
//!
//! Processors and streams are stored in vectors in declaration order;
//! their ids are the positions.

/// Index into `PipelineTopology::processors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ProcessorId(pub u32);

impl ProcessorId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into `PipelineTopology::streams`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u32);

impl StreamId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
