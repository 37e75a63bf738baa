//! Test data builders for topologies and component keys

use flowmon_rs::topology::{PipelineTopology, TopologyBuilder};
use flowmon_rs::ComponentKey;

/// Builder for linear and branching test topologies
pub struct TopologyFixture {
    builder: TopologyBuilder,
    next_task: u32,
    streams: usize,
}

impl TopologyFixture {
    pub fn new() -> Self {
        Self {
            builder: TopologyBuilder::new(),
            next_task: 1,
            streams: 0,
        }
    }

    /// Add a processor with `parallelism` freshly numbered tasks
    pub fn processor(mut self, name: &str, parallelism: u32) -> Self {
        let tasks: Vec<u32> = (self.next_task..self.next_task + parallelism).collect();
        self.next_task += parallelism;
        self.builder
            .add_processor(name, parallelism, &tasks)
            .expect("valid processor");
        self
    }

    pub fn stream(mut self, origin: &str, target: &str) -> Self {
        self.streams += 1;
        let name = format!("{}-{}-{}", origin, target, self.streams);
        self.builder
            .add_stream(name, origin, target)
            .expect("valid stream");
        self
    }

    pub fn feedback(mut self, origin: &str, target: &str) -> Self {
        self.streams += 1;
        let name = format!("{}-{}-{}", origin, target, self.streams);
        self.builder
            .add_feedback_stream(name, origin, target)
            .expect("valid stream");
        self
    }

    pub fn build(self) -> PipelineTopology {
        self.builder.build().expect("valid topology")
    }
}

/// `src -> proc -> sink`
pub fn linear_topology() -> PipelineTopology {
    TopologyFixture::new()
        .processor("src", 1)
        .processor("proc", 2)
        .processor("sink", 1)
        .stream("src", "proc")
        .stream("proc", "sink")
        .build()
}

/// Component key of `task` on worker `host:6700`
pub fn worker_key(host: &str, task: u32) -> ComponentKey {
    ComponentKey::new(host, 6700, task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_topology() {
        let topology = linear_topology();
        assert_eq!(topology.len(), 3);
        assert_eq!(topology.walk_order(), vec!["src", "proc", "sink"]);
    }
}
