//! Cycle-tolerant depth-first traversal.
//!
//! The walker starts at every source (and afterwards at any processor not
//! reached yet, so pure cycles are covered too). It keeps two separate
//! marks per processor:
//!
//! - `on_stack`: the processor is on the current DFS path,
//! - `visited`: the processor has been entered before.
//!
//! A stream whose target is on the current path is a loop edge: the visitor
//! gets an `enter`/`exit` pair with `is_loop = true` and the walker does not
//! descend. Every processor gets exactly one `enter`/`exit` pair with
//! `is_loop = false`; streams may be visited more than once.

use super::graph::{PipelineTopology, Processor, Stream};
use super::id::ProcessorId;

/// Callbacks of a [`TopologyWalker`]
pub trait TopologyVisitor {
    /// A processor is entered. Returning `false` skips its outputs.
    fn enter(&mut self, processor: &Processor, is_end: bool, is_loop: bool) -> bool;

    /// A stream is about to be followed. Returning `false` skips it.
    fn visit(&mut self, _stream: &Stream) -> bool {
        true
    }

    fn exit(&mut self, _processor: &Processor, _is_end: bool, _is_loop: bool) {}
}

struct Frame {
    processor: ProcessorId,
    next_output: usize,
}

/// Depth-first walker over one topology
pub struct TopologyWalker<'a> {
    topology: &'a PipelineTopology,
    on_stack: Vec<bool>,
    visited: Vec<bool>,
    stack: Vec<Frame>,
}

impl<'a> TopologyWalker<'a> {
    pub fn new(topology: &'a PipelineTopology) -> Self {
        let n = topology.len();
        Self {
            topology,
            on_stack: vec![false; n],
            visited: vec![false; n],
            stack: Vec::with_capacity(n),
        }
    }

    /// Walk the whole topology. The walker can be reused afterwards.
    pub fn walk<V: TopologyVisitor + ?Sized>(&mut self, visitor: &mut V) {
        self.visited.iter_mut().for_each(|v| *v = false);
        self.on_stack.iter_mut().for_each(|v| *v = false);
        self.stack.clear();

        let topology = self.topology;
        let starts = topology
            .sources()
            .iter()
            .copied()
            .chain(topology.processors().iter().map(|p| p.id));

        for start in starts {
            if !self.visited[start.index()] {
                self.walk_from(start, visitor);
            }
        }
    }

    fn walk_from<V: TopologyVisitor + ?Sized>(&mut self, start: ProcessorId, visitor: &mut V) {
        let topology = self.topology;
        self.push(start, visitor);

        while let Some(frame) = self.stack.last_mut() {
            let Some(processor) = topology.processor(frame.processor) else {
                self.stack.pop();
                continue;
            };

            let Some(&stream_id) = processor.outputs.get(frame.next_output) else {
                // all outputs done
                self.stack.pop();
                self.on_stack[processor.id.index()] = false;
                visitor.exit(processor, topology.is_sink(processor.id), false);
                continue;
            };
            frame.next_output += 1;

            let Some(stream) = topology.stream(stream_id) else {
                continue;
            };
            if !visitor.visit(stream) {
                continue;
            }

            let target = stream.target;
            if self.on_stack[target.index()] {
                if let Some(t) = topology.processor(target) {
                    let is_end = topology.is_sink(target);
                    visitor.enter(t, is_end, true);
                    visitor.exit(t, is_end, true);
                }
            } else if !self.visited[target.index()] {
                self.push(target, visitor);
            }
        }
    }

    fn push<V: TopologyVisitor + ?Sized>(&mut self, id: ProcessorId, visitor: &mut V) {
        let topology = self.topology;
        let Some(processor) = topology.processor(id) else {
            return;
        };
        let is_end = topology.is_sink(id);
        self.visited[id.index()] = true;
        self.on_stack[id.index()] = true;

        if visitor.enter(processor, is_end, false) {
            self.stack.push(Frame {
                processor: id,
                next_output: 0,
            });
        } else {
            self.on_stack[id.index()] = false;
            visitor.exit(processor, is_end, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::TopologyBuilder;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Recorder {
        enters: HashMap<String, usize>,
        exits: HashMap<String, usize>,
        loops: Vec<String>,
        visits: usize,
        order: Vec<String>,
    }

    impl TopologyVisitor for Recorder {
        fn enter(&mut self, processor: &Processor, _is_end: bool, is_loop: bool) -> bool {
            if is_loop {
                self.loops.push(processor.name.clone());
            } else {
                *self.enters.entry(processor.name.clone()).or_default() += 1;
                self.order.push(processor.name.clone());
            }
            true
        }

        fn visit(&mut self, _stream: &Stream) -> bool {
            self.visits += 1;
            true
        }

        fn exit(&mut self, processor: &Processor, _is_end: bool, is_loop: bool) {
            if !is_loop {
                *self.exits.entry(processor.name.clone()).or_default() += 1;
            }
        }
    }

    fn build(processors: &[&str], streams: &[(&str, &str)]) -> PipelineTopology {
        let mut b = TopologyBuilder::new();
        for p in processors {
            b.add_processor(*p, 1, &[]).unwrap();
        }
        for (i, (from, to)) in streams.iter().enumerate() {
            b.add_stream(format!("s{}", i), from, to).unwrap();
        }
        b.build().unwrap()
    }

    #[test]
    fn test_diamond_enters_each_once() {
        let t = build(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let mut rec = Recorder::default();
        t.walk(&mut rec);

        for name in ["a", "b", "c", "d"] {
            assert_eq!(rec.enters[name], 1);
            assert_eq!(rec.exits[name], 1);
        }
        assert_eq!(rec.visits, 4);
        assert!(rec.loops.is_empty());
        assert_eq!(rec.order, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_feedback_loop_is_reported_not_descended() {
        let t = build(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "b")]);
        let mut rec = Recorder::default();
        t.walk(&mut rec);

        assert_eq!(rec.enters.len(), 3);
        assert!(rec.enters.values().all(|&n| n == 1));
        assert_eq!(rec.loops, vec!["b"]);
    }

    #[test]
    fn test_pure_cycle_without_source() {
        let t = build(&["a", "b"], &[("a", "b"), ("b", "a")]);
        assert!(t.sources().is_empty());

        let mut rec = Recorder::default();
        t.walk(&mut rec);
        assert_eq!(rec.enters["a"], 1);
        assert_eq!(rec.enters["b"], 1);
        assert_eq!(rec.loops, vec!["a"]);
    }

    #[test]
    fn test_enter_false_skips_outputs() {
        struct Stop;
        impl TopologyVisitor for Stop {
            fn enter(&mut self, processor: &Processor, _: bool, _: bool) -> bool {
                processor.name != "b"
            }
            fn visit(&mut self, stream: &Stream) -> bool {
                assert_ne!(stream.name, "s1");
                true
            }
        }
        let t = build(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        TopologyWalker::new(&t).walk(&mut Stop);
    }

    #[test]
    fn test_end_flag_marks_sinks() {
        struct Ends(Vec<String>);
        impl TopologyVisitor for Ends {
            fn enter(&mut self, processor: &Processor, is_end: bool, _: bool) -> bool {
                if is_end {
                    self.0.push(processor.name.clone());
                }
                true
            }
        }
        let t = build(&["a", "b", "c"], &[("a", "b"), ("a", "c")]);
        let mut ends = Ends(Vec::new());
        t.walk(&mut ends);
        assert_eq!(ends.0, vec!["b", "c"]);
    }
}
