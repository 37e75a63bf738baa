//! Root container and event dispatch.

use super::frozen::{FrozenAlgorithm, FrozenPipeline, FrozenSystemState};
use super::pipeline::PipelineSystemPart;
use super::platform::PlatformSystemPart;
use crate::aggregation::StatisticsWalker;
use crate::clock::SharedClock;
use crate::config::MonitoringConfig;
use crate::events::{MonitoringEvent, ResourceKind};
use crate::keys::{ComponentKey, ObservationKey};
use crate::observables::Observable;
use crate::observation::ObservationFactory;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The whole monitored system.
///
/// All methods take `&self`; share it through an `Arc` between ingestion
/// threads, the aggregation timer and snapshot consumers. `Clone` produces a
/// structurally independent deep copy that shares only the immutable
/// topologies and the observation factory.
#[derive(Debug)]
pub struct SystemState {
    factory: Arc<ObservationFactory>,
    platform: PlatformSystemPart,
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new(Arc::new(ObservationFactory::default()))
    }
}

impl Clone for SystemState {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            platform: self.platform.replicate(),
        }
    }
}

impl SystemState {
    pub fn new(factory: Arc<ObservationFactory>) -> Self {
        Self {
            platform: PlatformSystemPart::new(factory.clone()),
            factory,
        }
    }

    pub fn with_config(config: &MonitoringConfig, clock: SharedClock) -> Self {
        Self::new(Arc::new(ObservationFactory::new(config, clock)))
    }

    pub fn factory(&self) -> &Arc<ObservationFactory> {
        &self.factory
    }

    pub fn platform(&self) -> &PlatformSystemPart {
        &self.platform
    }

    /// Get or lazily create a pipeline
    pub fn obtain_pipeline(&self, name: &str) -> Arc<PipelineSystemPart> {
        self.platform.obtain_pipeline(name)
    }

    pub fn pipeline(&self, name: &str) -> Option<Arc<PipelineSystemPart>> {
        self.platform.pipeline(name)
    }

    pub fn remove_pipeline(&self, name: &str) -> Option<Arc<PipelineSystemPart>> {
        self.platform.remove_pipeline(name)
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        self.platform.pipeline_names()
    }

    /// Record a platform-wide value, attributed to `source` if given
    pub fn set_platform_value(&self, observable: Observable, value: f64, source: Option<&str>) -> bool {
        let key = source.map(ObservationKey::source);
        self.platform.set_value(observable, value, key.as_ref())
    }

    pub fn set_resource_value(&self, kind: ResourceKind, name: &str, observable: Observable, value: f64) -> bool {
        self.platform
            .obtain_resource(kind, name)
            .set_value(observable, value, None)
    }

    /// Pipeline accepting observations, created if missing
    fn accepting_pipeline(&self, name: &str) -> Option<Arc<PipelineSystemPart>> {
        let pipeline = self.obtain_pipeline(name);
        if pipeline.accepts_observations() {
            Some(pipeline)
        } else {
            tracing::debug!(
                "Ignoring observation for pipeline {:?} in status {}",
                name,
                pipeline.status()
            );
            None
        }
    }

    fn set_pipeline_value(
        &self,
        pipeline: &PipelineSystemPart,
        element: Option<&str>,
        key: Option<&ComponentKey>,
        observable: Observable,
        value: f64,
    ) -> bool {
        match element {
            Some(element) => pipeline.set_node_value(element, observable, value, key),
            None => {
                let key = key.cloned().map(ObservationKey::Component);
                pipeline.set_value(observable, value, key.as_ref())
            }
        }
    }

    /// Apply one event. Never fails: missing structure is created, events for
    /// unsupported combinations or non-accepting pipelines are dropped.
    /// Returns whether the state changed.
    pub fn apply(&self, event: &MonitoringEvent) -> bool {
        match event {
            MonitoringEvent::Observation {
                pipeline,
                element,
                key,
                observable,
                value,
            } => match self.accepting_pipeline(pipeline) {
                Some(p) => {
                    self.set_pipeline_value(&p, element.as_deref(), key.as_ref(), *observable, *value)
                }
                None => false,
            },
            MonitoringEvent::Observations {
                pipeline,
                element,
                key,
                values,
            } => match self.accepting_pipeline(pipeline) {
                Some(p) => {
                    let mut applied = false;
                    for (&obs, &value) in values {
                        applied |= self.set_pipeline_value(&p, element.as_deref(), key.as_ref(), obs, value);
                    }
                    applied
                }
                None => false,
            },
            MonitoringEvent::AlgorithmChanged {
                pipeline,
                element,
                algorithm,
            } => {
                self.obtain_pipeline(pipeline)
                    .change_algorithm(element, algorithm);
                true
            }
            MonitoringEvent::PlatformObservation {
                observable,
                value,
                source,
            } => self.set_platform_value(*observable, *value, source.as_deref()),
            MonitoringEvent::ResourceObservation {
                kind,
                name,
                observable,
                value,
            } => self.set_resource_value(*kind, name, *observable, *value),
            MonitoringEvent::PipelineLifecycle { pipeline, status } => {
                if status.is_terminal() {
                    if let Some(p) = self.pipeline(pipeline) {
                        p.set_status(*status);
                    }
                    self.remove_pipeline(pipeline);
                } else {
                    self.obtain_pipeline(pipeline).set_status(*status);
                }
                true
            }
            MonitoringEvent::PipelineTopology { pipeline, topology } => match topology.build() {
                Ok(topology) => {
                    self.obtain_pipeline(pipeline)
                        .set_topology(Arc::new(topology));
                    true
                }
                Err(e) => {
                    tracing::warn!("Ignoring topology of pipeline {:?}: {}", pipeline, e);
                    false
                }
            },
        }
    }

    /// Run one statistics pass over every live pipeline
    pub fn aggregate_all(&self) {
        let mut walker = StatisticsWalker::for_pipelines(&self.factory);
        for pipeline in self.platform.pipelines() {
            walker.aggregate_pipeline(&pipeline);
        }
    }

    /// Immutable snapshot of the current values.
    ///
    /// Walks part by part without a global lock; concurrent writers may be
    /// partially reflected.
    pub fn freeze(&self) -> FrozenSystemState {
        let resources = |kind: ResourceKind| {
            self.platform
                .resources(kind)
                .into_iter()
                .map(|part| (part.name().to_string(), part.snapshot_values()))
                .collect::<BTreeMap<_, _>>()
        };

        let pipelines = self
            .platform
            .pipelines()
            .into_iter()
            .map(|p| (p.name().to_string(), freeze_pipeline(&p)))
            .collect();

        FrozenSystemState {
            timestamp: chrono::Utc::now(),
            platform: self.platform.snapshot_values(),
            machines: resources(ResourceKind::Machine),
            hardware: resources(ResourceKind::HardwareNode),
            clusters: resources(ResourceKind::Cluster),
            clouds: resources(ResourceKind::Cloud),
            pipelines,
        }
    }
}

fn freeze_pipeline(pipeline: &PipelineSystemPart) -> FrozenPipeline {
    let nodes = pipeline
        .nodes()
        .into_iter()
        .map(|n| (n.name().to_string(), n.snapshot_values()))
        .collect();
    let algorithms = pipeline
        .algorithms()
        .into_iter()
        .map(|a| {
            let sub_nodes = a
                .sub_nodes()
                .into_iter()
                .map(|n| (n.name().to_string(), n.snapshot_values()))
                .collect();
            (
                a.name().to_string(),
                FrozenAlgorithm {
                    values: a.snapshot_values(),
                    sub_nodes,
                },
            )
        })
        .collect();

    FrozenPipeline {
        status: pipeline.status(),
        values: pipeline.snapshot_values(),
        nodes,
        algorithms,
        current_algorithms: pipeline.current_algorithms(),
    }
}
