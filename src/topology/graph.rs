//! Processor/stream graph of one pipeline.
//!
//! A [`PipelineTopology`] is built once from deployment metadata, either
//! programmatically through [`TopologyBuilder`] or from a serialized
//! [`TopologyDescription`], and is immutable afterwards. Parts share it
//! through an `Arc`.

use super::error::{TopologyError, TopologyResult};
use super::id::{ProcessorId, StreamId};
use super::walker::{TopologyVisitor, TopologyWalker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A processing node of the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processor {
    pub id: ProcessorId,
    pub name: String,
    /// Declared parallelism degree
    pub parallelism: u32,
    /// Logical task ids executing this processor
    pub tasks: Vec<u32>,
    pub inputs: Vec<StreamId>,
    pub outputs: Vec<StreamId>,
}

impl Processor {
    #[inline]
    pub fn is_source(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// A directed data edge between two processors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub id: StreamId,
    pub name: String,
    pub origin: ProcessorId,
    pub target: ProcessorId,
    /// Declared as feeding results back upstream
    pub feedback: bool,
}

/// Immutable, possibly cyclic graph of processors and streams
#[derive(Debug, Clone, Default)]
pub struct PipelineTopology {
    processors: Vec<Processor>,
    streams: Vec<Stream>,
    processor_index: HashMap<String, ProcessorId>,
    stream_index: HashMap<String, StreamId>,
    task_index: HashMap<u32, ProcessorId>,
    sources: Vec<ProcessorId>,
    sinks: Vec<ProcessorId>,
}

impl PipelineTopology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    #[inline]
    pub fn processor(&self, id: ProcessorId) -> Option<&Processor> {
        self.processors.get(id.index())
    }

    #[inline]
    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.streams.get(id.index())
    }

    pub fn processor_by_name(&self, name: &str) -> Option<&Processor> {
        self.processor_index
            .get(name)
            .and_then(|&id| self.processor(id))
    }

    pub fn stream_by_name(&self, name: &str) -> Option<&Stream> {
        self.stream_index.get(name).and_then(|&id| self.stream(id))
    }

    /// Processor executing the logical task `task_id`
    pub fn processor_for_task(&self, task_id: u32) -> Option<&Processor> {
        self.task_index
            .get(&task_id)
            .and_then(|&id| self.processor(id))
    }

    /// Processors without inputs
    pub fn sources(&self) -> &[ProcessorId] {
        &self.sources
    }

    /// Processors without outputs that are not reached solely via feedback
    pub fn sinks(&self) -> &[ProcessorId] {
        &self.sinks
    }

    pub fn is_source(&self, id: ProcessorId) -> bool {
        self.processor(id).is_some_and(Processor::is_source)
    }

    pub fn is_sink(&self, id: ProcessorId) -> bool {
        self.sinks.contains(&id)
    }

    /// Depth-first walk from every source
    pub fn walk<V: TopologyVisitor>(&self, visitor: &mut V) {
        TopologyWalker::new(self).walk(visitor);
    }

    /// Processor names in walk order
    pub fn walk_order(&self) -> Vec<&str> {
        struct Collect<'a> {
            topology: &'a PipelineTopology,
            names: Vec<&'a str>,
        }
        impl TopologyVisitor for Collect<'_> {
            fn enter(&mut self, processor: &Processor, _is_end: bool, is_loop: bool) -> bool {
                if !is_loop {
                    if let Some(p) = self.topology.processor(processor.id) {
                        self.names.push(p.name.as_str());
                    }
                }
                true
            }
        }
        let mut collect = Collect {
            topology: self,
            names: Vec::with_capacity(self.processors.len()),
        };
        self.walk(&mut collect);
        collect.names
    }

    fn classify(&mut self) {
        self.sources = self
            .processors
            .iter()
            .filter(|p| p.is_source())
            .map(|p| p.id)
            .collect();

        let streams = &self.streams;
        self.sinks = self
            .processors
            .iter()
            .filter(|p| {
                let only_feedback = !p.inputs.is_empty()
                    && p.inputs
                        .iter()
                        .all(|s| streams.get(s.index()).is_some_and(|s| s.feedback));
                p.outputs.is_empty() && !only_feedback
            })
            .map(|p| p.id)
            .collect();
    }
}

/// Incremental construction of a [`PipelineTopology`] with fail-fast validation
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    topology: PipelineTopology,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor executing the given logical tasks
    pub fn add_processor(
        &mut self,
        name: impl Into<String>,
        parallelism: u32,
        tasks: &[u32],
    ) -> TopologyResult<ProcessorId> {
        let name = name.into();
        if self.topology.processor_index.contains_key(&name) {
            return Err(TopologyError::DuplicateProcessor(name));
        }

        let id = ProcessorId(self.topology.processors.len() as u32);
        for &task in tasks {
            if let Some(&owner) = self.topology.task_index.get(&task) {
                let owner = self
                    .topology
                    .processor(owner)
                    .map(|p| p.name.clone())
                    .unwrap_or_default();
                return Err(TopologyError::DuplicateTask {
                    task,
                    processor: name,
                    owner,
                });
            }
        }
        for &task in tasks {
            self.topology.task_index.insert(task, id);
        }

        self.topology.processor_index.insert(name.clone(), id);
        self.topology.processors.push(Processor {
            id,
            name,
            parallelism,
            tasks: tasks.to_vec(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        });
        Ok(id)
    }

    /// Add a stream between two previously added processors
    pub fn add_stream(
        &mut self,
        name: impl Into<String>,
        origin: &str,
        target: &str,
    ) -> TopologyResult<StreamId> {
        self.insert_stream(name.into(), origin, target, false)
    }

    /// Add a stream feeding results back upstream
    pub fn add_feedback_stream(
        &mut self,
        name: impl Into<String>,
        origin: &str,
        target: &str,
    ) -> TopologyResult<StreamId> {
        self.insert_stream(name.into(), origin, target, true)
    }

    fn insert_stream(
        &mut self,
        name: String,
        origin: &str,
        target: &str,
        feedback: bool,
    ) -> TopologyResult<StreamId> {
        if self.topology.stream_index.contains_key(&name) {
            return Err(TopologyError::DuplicateStream(name));
        }
        let lookup = |processor: &str| {
            self.topology
                .processor_index
                .get(processor)
                .copied()
                .ok_or_else(|| TopologyError::UnknownProcessor {
                    stream: name.clone(),
                    processor: processor.to_string(),
                })
        };
        let origin = lookup(origin)?;
        let target = lookup(target)?;

        let id = StreamId(self.topology.streams.len() as u32);
        self.topology.processors[origin.index()].outputs.push(id);
        self.topology.processors[target.index()].inputs.push(id);
        self.topology.stream_index.insert(name.clone(), id);
        self.topology.streams.push(Stream {
            id,
            name,
            origin,
            target,
            feedback,
        });
        Ok(id)
    }

    pub fn build(mut self) -> TopologyResult<PipelineTopology> {
        self.topology.classify();
        Ok(self.topology)
    }
}

/// Serialized deployment metadata of one processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorDescription {
    pub name: String,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
    #[serde(default)]
    pub tasks: Vec<u32>,
    /// Names of the streams this processor consumes
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Names of the streams this processor emits
    #[serde(default)]
    pub outputs: Vec<String>,
}

fn default_parallelism() -> u32 {
    1
}

/// Serialized deployment metadata of one stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescription {
    pub name: String,
    pub origin: String,
    pub target: String,
    #[serde(default)]
    pub feedback: bool,
}

/// Serialized deployment metadata of a whole topology.
///
/// Processors declare their inputs and outputs by stream name, streams
/// declare their endpoints by processor name; [`TopologyDescription::build`]
/// checks that both registrations agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyDescription {
    pub processors: Vec<ProcessorDescription>,
    #[serde(default)]
    pub streams: Vec<StreamDescription>,
}

impl TopologyDescription {
    pub fn build(&self) -> TopologyResult<PipelineTopology> {
        let mut builder = TopologyBuilder::new();
        for p in &self.processors {
            builder.add_processor(p.name.clone(), p.parallelism, &p.tasks)?;
        }
        for s in &self.streams {
            if s.feedback {
                builder.add_feedback_stream(s.name.clone(), &s.origin, &s.target)?;
            } else {
                builder.add_stream(s.name.clone(), &s.origin, &s.target)?;
            }
        }

        // stream endpoints must be mirrored in the processors' declarations
        for s in &self.streams {
            self.check_declared(&s.origin, &s.name, true)?;
            self.check_declared(&s.target, &s.name, false)?;
        }
        for p in &self.processors {
            for input in &p.inputs {
                self.check_endpoint(&p.name, input, false)?;
            }
            for output in &p.outputs {
                self.check_endpoint(&p.name, output, true)?;
            }
        }

        builder.build()
    }

    fn check_declared(&self, processor: &str, stream: &str, output: bool) -> TopologyResult<()> {
        let declared = self
            .processors
            .iter()
            .find(|p| p.name == processor)
            .is_some_and(|p| {
                let list = if output { &p.outputs } else { &p.inputs };
                list.iter().any(|s| s == stream)
            });
        if declared {
            Ok(())
        } else {
            Err(TopologyError::InconsistentRegistration(format!(
                "stream {} is not declared as {} of {}",
                stream,
                if output { "output" } else { "input" },
                processor
            )))
        }
    }

    fn check_endpoint(&self, processor: &str, stream: &str, output: bool) -> TopologyResult<()> {
        let matches = self.streams.iter().any(|s| {
            s.name == stream && if output { s.origin == processor } else { s.target == processor }
        });
        if matches {
            Ok(())
        } else {
            Err(TopologyError::InconsistentRegistration(format!(
                "{} declares {} {} which does not {} it",
                processor,
                if output { "output" } else { "input" },
                stream,
                if output { "originate at" } else { "target" }
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> PipelineTopology {
        let mut b = TopologyBuilder::new();
        b.add_processor("src", 1, &[1]).unwrap();
        b.add_processor("map", 2, &[2, 3]).unwrap();
        b.add_processor("sink", 1, &[4]).unwrap();
        b.add_stream("s1", "src", "map").unwrap();
        b.add_stream("s2", "map", "sink").unwrap();
        b.build().unwrap()
    }

    #[test]
    fn test_sources_and_sinks() {
        let t = linear();
        assert_eq!(t.len(), 3);
        assert_eq!(t.sources(), &[ProcessorId(0)]);
        assert_eq!(t.sinks(), &[ProcessorId(2)]);
        assert!(t.is_source(ProcessorId(0)));
        assert!(!t.is_sink(ProcessorId(1)));
    }

    #[test]
    fn test_bidirectional_registration() {
        let t = linear();
        let map = t.processor_by_name("map").unwrap();
        let s1 = t.stream_by_name("s1").unwrap();
        assert_eq!(map.inputs, vec![s1.id]);
        assert_eq!(s1.target, map.id);
        assert_eq!(t.processor(s1.origin).unwrap().outputs, vec![s1.id]);
    }

    #[test]
    fn test_task_lookup() {
        let t = linear();
        assert_eq!(t.processor_for_task(3).unwrap().name, "map");
        assert!(t.processor_for_task(99).is_none());
    }

    #[test]
    fn test_duplicate_processor_fails() {
        let mut b = TopologyBuilder::new();
        b.add_processor("a", 1, &[]).unwrap();
        assert_eq!(
            b.add_processor("a", 1, &[]),
            Err(TopologyError::DuplicateProcessor("a".into()))
        );
    }

    #[test]
    fn test_duplicate_task_fails() {
        let mut b = TopologyBuilder::new();
        b.add_processor("a", 1, &[7]).unwrap();
        assert!(matches!(
            b.add_processor("b", 1, &[7]),
            Err(TopologyError::DuplicateTask { task: 7, .. })
        ));
    }

    #[test]
    fn test_stream_errors() {
        let mut b = TopologyBuilder::new();
        b.add_processor("a", 1, &[]).unwrap();
        b.add_processor("b", 1, &[]).unwrap();
        b.add_stream("ab", "a", "b").unwrap();

        assert_eq!(
            b.add_stream("ab", "b", "a"),
            Err(TopologyError::DuplicateStream("ab".into()))
        );
        assert!(matches!(
            b.add_stream("ax", "a", "x"),
            Err(TopologyError::UnknownProcessor { .. })
        ));
    }

    #[test]
    fn test_feedback_only_node_is_not_a_sink() {
        let mut b = TopologyBuilder::new();
        b.add_processor("src", 1, &[]).unwrap();
        b.add_processor("work", 1, &[]).unwrap();
        b.add_processor("out", 1, &[]).unwrap();
        b.add_processor("monitor", 1, &[]).unwrap();
        b.add_stream("s1", "src", "work").unwrap();
        b.add_stream("s2", "work", "out").unwrap();
        b.add_feedback_stream("fb", "work", "monitor").unwrap();
        let t = b.build().unwrap();

        let names: Vec<_> = t
            .sinks()
            .iter()
            .map(|&id| t.processor(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["out"]);
    }

    #[test]
    fn test_description_build() {
        let json = r#"{
            "processors": [
                {"name": "src", "tasks": [1], "outputs": ["s"]},
                {"name": "sink", "parallelism": 2, "tasks": [2, 3], "inputs": ["s"]}
            ],
            "streams": [{"name": "s", "origin": "src", "target": "sink"}]
        }"#;
        let desc: TopologyDescription = serde_json::from_str(json).unwrap();
        let t = desc.build().unwrap();
        assert_eq!(t.processor_by_name("sink").unwrap().parallelism, 2);
        assert_eq!(t.walk_order(), vec!["src", "sink"]);
    }

    #[test]
    fn test_description_inconsistent_registration() {
        let mut desc = TopologyDescription {
            processors: vec![
                ProcessorDescription {
                    name: "a".into(),
                    parallelism: 1,
                    tasks: vec![],
                    inputs: vec![],
                    outputs: vec!["s".into()],
                },
                ProcessorDescription {
                    name: "b".into(),
                    parallelism: 1,
                    tasks: vec![],
                    inputs: vec![],
                    outputs: vec![],
                },
            ],
            streams: vec![StreamDescription {
                name: "s".into(),
                origin: "a".into(),
                target: "b".into(),
                feedback: false,
            }],
        };
        assert!(matches!(
            desc.build(),
            Err(TopologyError::InconsistentRegistration(_))
        ));

        desc.processors[1].inputs.push("s".into());
        desc.processors[1].outputs.push("ghost".into());
        assert!(matches!(
            desc.build(),
            Err(TopologyError::InconsistentRegistration(_))
        ));

        desc.processors[1].outputs.clear();
        assert!(desc.build().is_ok());
    }
}
