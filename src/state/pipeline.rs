//! One live pipeline: its elements, algorithms, topology and lifecycle.

use super::algorithm::AlgorithmSystemPart;
use super::node::{ExecutorCounts, PipelineNodeSystemPart};
use super::part::SystemPart;
use crate::config::PartType;
use crate::keys::ComponentKey;
use crate::observables::Observable;
use crate::observation::ObservationFactory;
use crate::topology::PipelineTopology;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Lifecycle status of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineLifecycleStatus {
    #[default]
    Unknown,
    Checking,
    Checked,
    CheckFailed,
    Starting,
    Created,
    Initialized,
    Started,
    Stopping,
    Stopped,
    Disposed,
}

impl PipelineLifecycleStatus {
    /// Whether observations for a pipeline in this status are applied
    pub fn accepts_observations(self) -> bool {
        !matches!(
            self,
            PipelineLifecycleStatus::Stopping
                | PipelineLifecycleStatus::Stopped
                | PipelineLifecycleStatus::Disposed
                | PipelineLifecycleStatus::CheckFailed
        )
    }

    /// Whether reaching this status removes the pipeline
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineLifecycleStatus::Stopped | PipelineLifecycleStatus::Disposed
        )
    }
}

impl fmt::Display for PipelineLifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Container of all parts of one pipeline.
///
/// Node and algorithm maps are locked only to look up or insert an `Arc`;
/// values are written through the per-part locks.
#[derive(Debug)]
pub struct PipelineSystemPart {
    part: SystemPart,
    status: RwLock<PipelineLifecycleStatus>,
    nodes: RwLock<BTreeMap<String, Arc<PipelineNodeSystemPart>>>,
    algorithms: RwLock<BTreeMap<String, Arc<AlgorithmSystemPart>>>,
    topology: RwLock<Option<Arc<PipelineTopology>>>,
}

impl PipelineSystemPart {
    pub fn new(name: impl Into<String>, factory: Arc<ObservationFactory>) -> Self {
        Self {
            part: SystemPart::new(name, PartType::Pipeline, factory),
            status: RwLock::new(PipelineLifecycleStatus::Unknown),
            nodes: RwLock::new(BTreeMap::new()),
            algorithms: RwLock::new(BTreeMap::new()),
            topology: RwLock::new(None),
        }
    }

    pub fn part(&self) -> &SystemPart {
        &self.part
    }

    pub fn status(&self) -> PipelineLifecycleStatus {
        *self.status.read()
    }

    /// Change the status, returning the previous one
    pub fn set_status(&self, status: PipelineLifecycleStatus) -> PipelineLifecycleStatus {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            tracing::info!(
                "Pipeline {:?} status {} -> {}",
                self.part.name(),
                previous,
                status
            );
        }
        previous
    }

    pub fn accepts_observations(&self) -> bool {
        self.status().accepts_observations()
    }

    pub fn topology(&self) -> Option<Arc<PipelineTopology>> {
        self.topology.read().clone()
    }

    /// Attach the topology and create a node per processor
    pub fn set_topology(&self, topology: Arc<PipelineTopology>) {
        for processor in topology.processors() {
            self.obtain_node(&processor.name);
        }
        *self.topology.write() = Some(topology);
    }

    /// Get or lazily create a node
    pub fn obtain_node(&self, name: &str) -> Arc<PipelineNodeSystemPart> {
        if let Some(node) = self.nodes.read().get(name) {
            return node.clone();
        }
        self.nodes
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!("Creating node {:?} of pipeline {:?}", name, self.part.name());
                Arc::new(PipelineNodeSystemPart::new(name, self.part.factory().clone()))
            })
            .clone()
    }

    pub fn node(&self, name: &str) -> Option<Arc<PipelineNodeSystemPart>> {
        self.nodes.read().get(name).cloned()
    }

    /// Nodes sorted by name
    pub fn nodes(&self) -> Vec<Arc<PipelineNodeSystemPart>> {
        self.nodes.read().values().cloned().collect()
    }

    /// Get or lazily create an algorithm
    pub fn obtain_algorithm(&self, name: &str) -> Arc<AlgorithmSystemPart> {
        if let Some(alg) = self.algorithms.read().get(name) {
            return alg.clone();
        }
        self.algorithms
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(
                    "Creating algorithm {:?} of pipeline {:?}",
                    name,
                    self.part.name()
                );
                Arc::new(AlgorithmSystemPart::new(name, self.part.factory().clone()))
            })
            .clone()
    }

    pub fn algorithm(&self, name: &str) -> Option<Arc<AlgorithmSystemPart>> {
        self.algorithms.read().get(name).cloned()
    }

    /// Algorithms sorted by name
    pub fn algorithms(&self) -> Vec<Arc<AlgorithmSystemPart>> {
        self.algorithms.read().values().cloned().collect()
    }

    /// Active algorithm of a node, resolved against this pipeline
    pub fn current_algorithm_of(&self, node: &PipelineNodeSystemPart) -> Option<Arc<AlgorithmSystemPart>> {
        node.current_algorithm()
            .map(|name| self.obtain_algorithm(&name))
    }

    /// Active algorithm name per node
    pub fn current_algorithms(&self) -> BTreeMap<String, String> {
        self.nodes
            .read()
            .iter()
            .filter_map(|(name, node)| node.current_algorithm().map(|alg| (name.clone(), alg)))
            .collect()
    }

    /// Switch the active algorithm of a node. Later values of the node are
    /// mirrored into the new algorithm only.
    pub fn change_algorithm(&self, node: &str, algorithm: &str) -> Option<String> {
        let node_part = self.obtain_node(node);
        self.obtain_algorithm(algorithm);
        let previous = node_part.set_current_algorithm(Some(algorithm.to_string()));
        if previous.as_deref() != Some(algorithm) {
            tracing::debug!(
                "Pipeline {:?} node {:?} algorithm {:?} -> {:?}",
                self.part.name(),
                node,
                previous,
                algorithm
            );
        }
        previous
    }

    /// Record a value on a node and mirror it into the node's active algorithm
    pub fn set_node_value(
        &self,
        node: &str,
        observable: Observable,
        value: f64,
        key: Option<&ComponentKey>,
    ) -> bool {
        let node_part = self.obtain_node(node);
        let algorithm = self.current_algorithm_of(&node_part);
        let (applied, _) =
            node_part.set_mirrored_value(observable, value, key, algorithm.as_deref().map(|a| a.part()));
        applied
    }

    /// Forget the contributor of a node's task in the node and its active
    /// algorithm
    pub fn unregister_task(&self, node: &str, task_id: u32) -> Option<ExecutorCounts> {
        let node_part = self.node(node)?;
        let algorithm = self.current_algorithm_of(&node_part);
        node_part.unregister_mirrored(task_id, algorithm.as_deref().map(|a| a.part()))
    }

    /// Record several values of one node at once
    pub fn set_node_values<'a, I>(&self, node: &str, values: I, key: Option<&ComponentKey>) -> usize
    where
        I: IntoIterator<Item = (&'a Observable, &'a f64)>,
    {
        let mut applied = 0;
        for (&obs, &value) in values {
            if self.set_node_value(node, obs, value, key) {
                applied += 1;
            }
        }
        applied
    }

    /// Structurally independent copy; the topology is shared
    pub fn replicate(&self) -> PipelineSystemPart {
        let nodes = self
            .nodes
            .read()
            .iter()
            .map(|(name, node)| (name.clone(), Arc::new(node.replicate())))
            .collect();
        let algorithms = self
            .algorithms
            .read()
            .iter()
            .map(|(name, alg)| (name.clone(), Arc::new(alg.replicate())))
            .collect();
        Self {
            part: self.part.replicate(),
            status: RwLock::new(self.status()),
            nodes: RwLock::new(nodes),
            algorithms: RwLock::new(algorithms),
            topology: RwLock::new(self.topology()),
        }
    }
}

impl Deref for PipelineSystemPart {
    type Target = SystemPart;

    fn deref(&self) -> &SystemPart {
        &self.part
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> PipelineSystemPart {
        PipelineSystemPart::new("pip", Arc::new(ObservationFactory::default()))
    }

    #[test]
    fn test_status_gates_observations() {
        use PipelineLifecycleStatus::*;
        for status in [Unknown, Checking, Checked, Starting, Created, Initialized, Started] {
            assert!(status.accepts_observations(), "{}", status);
        }
        for status in [Stopping, Stopped, Disposed, CheckFailed] {
            assert!(!status.accepts_observations(), "{}", status);
        }
        assert!(Stopped.is_terminal());
        assert!(!Stopping.is_terminal());
    }

    #[test]
    fn test_mirror_into_active_algorithm() {
        let p = pipeline();
        p.change_algorithm("proc", "alg1");
        p.set_node_value("proc", Observable::Latency, 20.0, None);

        let node = p.node("proc").unwrap();
        let alg = p.algorithm("alg1").unwrap();
        assert_eq!(node.observed_value(Observable::Latency), 20.0);
        assert_eq!(alg.observed_value(Observable::Latency), 20.0);
    }

    #[test]
    fn test_algorithm_switch_isolates_updates() {
        let p = pipeline();
        p.change_algorithm("proc", "alg1");
        p.set_node_value("proc", Observable::Latency, 20.0, None);
        assert_eq!(p.change_algorithm("proc", "alg2").as_deref(), Some("alg1"));
        p.set_node_value("proc", Observable::Latency, 30.0, None);

        assert_eq!(
            p.algorithm("alg1").unwrap().observed_value(Observable::Latency),
            20.0
        );
        assert_eq!(
            p.algorithm("alg2").unwrap().observed_value(Observable::Latency),
            30.0
        );
        assert_eq!(p.current_algorithms()["proc"], "alg2");
    }

    #[test]
    fn test_executor_counts_are_mirrored() {
        let p = pipeline();
        p.change_algorithm("proc", "alg1");
        let key = ComponentKey::new("h1", 6700, 4);
        p.set_node_value("proc", Observable::Items, 1.0, Some(&key));

        let alg = p.algorithm("alg1").unwrap();
        assert_eq!(alg.observed_value(Observable::Tasks), 1.0);
        assert_eq!(alg.observed_value(Observable::Hosts), 1.0);
    }

    #[test]
    fn test_moved_task_counted_once_in_node_and_algorithm() {
        let p = pipeline();
        p.change_algorithm("proc", "alg1");
        for (host, task) in [("h1", 1), ("h1", 2), ("h2", 3)] {
            p.set_node_value("proc", Observable::Items, 1.0, Some(&ComponentKey::new(host, 6700, task)));
        }
        p.set_node_value("proc", Observable::Items, 1.0, Some(&ComponentKey::new("h1", 6700, 3)));

        let node = p.node("proc").unwrap();
        let alg = p.algorithm("alg1").unwrap();
        for part in [node.part(), alg.part()] {
            assert_eq!(part.observed_value(Observable::Tasks), 3.0);
            assert_eq!(part.observed_value(Observable::Hosts), 1.0);
            assert_eq!(part.observed_value(Observable::Items), 3.0);
        }

        let counts = p.unregister_task("proc", 3).unwrap();
        assert_eq!(counts.tasks, 2);
        assert_eq!(alg.observed_value(Observable::Items), 2.0);
        assert_eq!(alg.observed_value(Observable::Tasks), 2.0);
        assert!(p.unregister_task("missing", 1).is_none());
    }

    #[test]
    fn test_replicate_rebuilds_algorithm_lookup() {
        let p = pipeline();
        p.change_algorithm("proc", "alg1");
        let copy = p.replicate();
        copy.set_node_value("proc", Observable::Latency, 5.0, None);

        assert_eq!(
            copy.algorithm("alg1").unwrap().observed_value(Observable::Latency),
            5.0
        );
        assert!(!p.algorithm("alg1").unwrap().has_value(Observable::Latency));
    }

    #[test]
    fn test_set_node_values() {
        let p = pipeline();
        let values: BTreeMap<Observable, f64> = [
            (Observable::Latency, 1.0),
            (Observable::Items, 2.0),
            (Observable::AvailableMemory, 3.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(p.set_node_values("proc", &values, None), 2);
    }
}
