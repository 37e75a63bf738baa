use super::aggregator::ObservationAggregator;
use crate::config::PartType;
use crate::observables::Observable;
use crate::observation::ObservationFactory;
use crate::state::{
    AggregateValue, AlgorithmSystemPart, PipelineNodeSystemPart, PipelineSystemPart, SystemPart,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Computes subtree aggregates of pipelines and algorithms.
///
/// The node set of a pipeline is taken from its topology in walk order (all
/// nodes when it has none). For each node the active algorithm stands in
/// for the node on every observable the algorithm holds an aggregate for.
/// Active algorithms realized as sub-topologies are aggregated first.
#[derive(Debug, Clone)]
pub struct StatisticsWalker {
    aggregators: Vec<ObservationAggregator>,
}

impl StatisticsWalker {
    pub fn new(aggregators: Vec<ObservationAggregator>) -> Self {
        Self { aggregators }
    }

    /// Aggregators for every observable a pipeline or algorithm supports
    pub fn for_pipelines(factory: &ObservationFactory) -> Self {
        let observables: BTreeSet<Observable> = [PartType::Pipeline, PartType::Algorithm]
            .into_iter()
            .flat_map(|part| factory.capabilities().observables_for(part))
            .collect();
        Self::new(
            observables
                .into_iter()
                .map(|obs| ObservationAggregator::new(obs, factory.policy(obs)))
                .collect(),
        )
    }

    pub fn aggregators(&self) -> &[ObservationAggregator] {
        &self.aggregators
    }

    fn clear(&mut self) {
        for agg in &mut self.aggregators {
            agg.clear();
        }
    }

    fn results(&self) -> Vec<(Observable, AggregateValue)> {
        self.aggregators
            .iter()
            .filter_map(|agg| agg.result().map(|r| (agg.observable(), r)))
            .collect()
    }

    fn fold(&mut self, part: &SystemPart) {
        for agg in &mut self.aggregators {
            agg.push_part(part);
        }
    }

    fn pipeline_nodes(pipeline: &PipelineSystemPart) -> Vec<Arc<PipelineNodeSystemPart>> {
        match pipeline.topology() {
            Some(topology) => topology
                .walk_order()
                .into_iter()
                .filter_map(|name| pipeline.node(name))
                .collect(),
            None => pipeline.nodes(),
        }
    }

    fn algorithm_nodes(algorithm: &AlgorithmSystemPart) -> Vec<Arc<PipelineNodeSystemPart>> {
        match algorithm.sub_topology() {
            Some(topology) => topology
                .walk_order()
                .into_iter()
                .filter_map(|name| algorithm.sub_node(name))
                .collect(),
            None => algorithm.sub_nodes(),
        }
    }

    /// Aggregate a pipeline and store the result on it.
    ///
    /// Returns the number of aggregates stored.
    pub fn aggregate_pipeline(&mut self, pipeline: &PipelineSystemPart) -> usize {
        let nodes = Self::pipeline_nodes(pipeline);
        let active: Vec<Option<Arc<AlgorithmSystemPart>>> = nodes
            .iter()
            .map(|node| node.current_algorithm().and_then(|name| pipeline.algorithm(&name)))
            .collect();

        for algorithm in active.iter().flatten() {
            if algorithm.has_sub_nodes() {
                self.aggregate_algorithm(algorithm);
            }
        }

        self.clear();
        for (node, algorithm) in nodes.iter().zip(&active) {
            for agg in &mut self.aggregators {
                let obs = agg.observable();
                match algorithm {
                    Some(alg) if alg.aggregate(obs).is_some() => agg.push_part(alg),
                    _ => agg.push_part(node),
                };
            }
        }

        let stored = pipeline.replace_aggregates(self.results());
        tracing::trace!(
            "Aggregated pipeline {:?}: {} nodes, {} values",
            pipeline.name(),
            nodes.len(),
            stored
        );
        stored
    }

    /// Aggregate the sub-nodes of an algorithm and store the result on it
    pub fn aggregate_algorithm(&mut self, algorithm: &AlgorithmSystemPart) -> usize {
        let nodes = Self::algorithm_nodes(algorithm);
        self.clear();
        for node in &nodes {
            self.fold(node);
        }
        algorithm.replace_aggregates(self.results())
    }

    /// Aggregate a single node; nothing is stored
    pub fn aggregate_node(&mut self, node: &PipelineNodeSystemPart) -> Vec<(Observable, AggregateValue)> {
        self.clear();
        self.fold(node);
        self.results()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observables::AggregationPolicy;
    use crate::topology::TopologyBuilder;

    fn pipeline() -> PipelineSystemPart {
        PipelineSystemPart::new("pip", Arc::new(ObservationFactory::default()))
    }

    fn walker(pipeline: &PipelineSystemPart) -> StatisticsWalker {
        StatisticsWalker::for_pipelines(pipeline.factory())
    }

    #[test]
    fn test_sum_and_path_average_without_topology() {
        let p = pipeline();
        p.set_node_value("a", Observable::Items, 10.0, None);
        p.set_node_value("b", Observable::Items, 5.0, None);
        p.set_node_value("a", Observable::Latency, 10.0, None);
        p.set_node_value("b", Observable::Latency, 30.0, None);

        walker(&p).aggregate_pipeline(&p);

        assert_eq!(p.observed_value(Observable::Items), 15.0);
        assert_eq!(p.observed_value(Observable::Latency), 20.0);
        assert_eq!(p.aggregate(Observable::Latency).unwrap().contributors, 2);
    }

    #[test]
    fn test_topology_restricts_node_set() {
        let p = pipeline();
        let mut b = TopologyBuilder::new();
        b.add_processor("src", 1, &[]).unwrap();
        b.add_processor("sink", 1, &[]).unwrap();
        b.add_stream("s", "src", "sink").unwrap();
        p.set_topology(Arc::new(b.build().unwrap()));

        p.set_node_value("src", Observable::Items, 1.0, None);
        p.set_node_value("sink", Observable::Items, 2.0, None);
        p.set_node_value("stray", Observable::Items, 100.0, None);

        walker(&p).aggregate_pipeline(&p);
        assert_eq!(p.observed_value(Observable::Items), 3.0);
    }

    #[test]
    fn test_active_algorithm_sub_nodes_replace_node_value() {
        let p = pipeline();
        p.change_algorithm("proc", "distributed");
        p.set_node_value("proc", Observable::Capacity, 0.9, None);
        p.set_node_value("src", Observable::Capacity, 0.1, None);

        let alg = p.algorithm("distributed").unwrap();
        alg.obtain_sub_node("inner1")
            .set_value(Observable::Capacity, 0.2, None);
        alg.obtain_sub_node("inner2")
            .set_value(Observable::Capacity, 0.4, None);

        walker(&p).aggregate_pipeline(&p);

        let alg_capacity = alg.observed_value(Observable::Capacity);
        assert!((alg_capacity - 0.3).abs() < 1e-9);
        let pipeline_capacity = p.observed_value(Observable::Capacity);
        assert!((pipeline_capacity - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_standby_algorithm_does_not_corrupt_extremes() {
        let p = pipeline();
        p.set_node_value("a", Observable::Items, 4.0, None);
        p.set_node_value("b", Observable::Items, 6.0, None);
        // idle element whose active algorithm never reported
        p.change_algorithm("standby", "idle");
        p.algorithm("idle").unwrap().obtain_sub_node("inner");

        let mut walker = StatisticsWalker::new(vec![
            ObservationAggregator::new(Observable::Items, AggregationPolicy::MIN),
        ]);
        walker.aggregate_pipeline(&p);
        assert_eq!(p.observed_value(Observable::Items), 4.0);
    }

    #[test]
    fn test_aggregate_node_stores_nothing() {
        let p = pipeline();
        p.set_node_value("a", Observable::Items, 4.0, None);
        let node = p.node("a").unwrap();
        let results = walker(&p).aggregate_node(&node);
        assert!(results
            .iter()
            .any(|(obs, r)| *obs == Observable::Items && r.value == 4.0));
        assert!(!node.has_aggregates());
    }

    #[test]
    fn test_repeated_passes_drop_stale_results() {
        let p = pipeline();
        p.set_node_value("a", Observable::Items, 4.0, None);
        let mut walker = walker(&p);
        walker.aggregate_pipeline(&p);
        assert!(p.aggregate(Observable::Items).is_some());

        p.node("a").unwrap().clear(Observable::Items);
        walker.aggregate_pipeline(&p);
        assert!(p.aggregate(Observable::Items).is_none());
    }
}
