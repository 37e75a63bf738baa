//! Algorithm variants of a pipeline element.

use super::node::PipelineNodeSystemPart;
use super::part::SystemPart;
use crate::config::PartType;
use crate::observation::ObservationFactory;
use crate::topology::PipelineTopology;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

/// One implementation variant of a pipeline element.
///
/// Receives the values mirrored from the element while it is active. An
/// algorithm realized as a sub-topology additionally owns its own sub-nodes,
/// whose values the statistics pass folds into this part.
#[derive(Debug)]
pub struct AlgorithmSystemPart {
    part: SystemPart,
    sub_nodes: RwLock<BTreeMap<String, Arc<PipelineNodeSystemPart>>>,
    sub_topology: RwLock<Option<Arc<PipelineTopology>>>,
}

/// Alias matching the name used by deployment tooling
pub type NodeImplementationSystemPart = AlgorithmSystemPart;

impl AlgorithmSystemPart {
    pub fn new(name: impl Into<String>, factory: Arc<ObservationFactory>) -> Self {
        Self {
            part: SystemPart::new(name, PartType::Algorithm, factory),
            sub_nodes: RwLock::new(BTreeMap::new()),
            sub_topology: RwLock::new(None),
        }
    }

    pub fn part(&self) -> &SystemPart {
        &self.part
    }

    /// Get or lazily create a sub-node
    pub fn obtain_sub_node(&self, name: &str) -> Arc<PipelineNodeSystemPart> {
        if let Some(node) = self.sub_nodes.read().get(name) {
            return node.clone();
        }
        self.sub_nodes
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating sub-node {:?} of algorithm {:?}", name, self.part.name());
                Arc::new(PipelineNodeSystemPart::new(name, self.part.factory().clone()))
            })
            .clone()
    }

    pub fn sub_node(&self, name: &str) -> Option<Arc<PipelineNodeSystemPart>> {
        self.sub_nodes.read().get(name).cloned()
    }

    /// Sub-nodes sorted by name
    pub fn sub_nodes(&self) -> Vec<Arc<PipelineNodeSystemPart>> {
        self.sub_nodes.read().values().cloned().collect()
    }

    pub fn has_sub_nodes(&self) -> bool {
        !self.sub_nodes.read().is_empty()
    }

    pub fn sub_topology(&self) -> Option<Arc<PipelineTopology>> {
        self.sub_topology.read().clone()
    }

    /// Attach the sub-topology and create a sub-node per processor
    pub fn set_sub_topology(&self, topology: Arc<PipelineTopology>) {
        for processor in topology.processors() {
            self.obtain_sub_node(&processor.name);
        }
        *self.sub_topology.write() = Some(topology);
    }

    pub fn replicate(&self) -> AlgorithmSystemPart {
        let sub_nodes = self
            .sub_nodes
            .read()
            .iter()
            .map(|(name, node)| (name.clone(), Arc::new(node.replicate())))
            .collect();
        Self {
            part: self.part.replicate(),
            sub_nodes: RwLock::new(sub_nodes),
            sub_topology: RwLock::new(self.sub_topology()),
        }
    }
}

impl Deref for AlgorithmSystemPart {
    type Target = SystemPart;

    fn deref(&self) -> &SystemPart {
        &self.part
    }
}
