//! Translation of deployment identifiers to logical names.

use crate::events::MonitoringEvent;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps names used by the deployment layer to the logical pipeline and
/// element names of the model. `None` means the name is already logical.
pub trait NameResolver: Send + Sync {
    fn resolve_pipeline(&self, deployed: &str) -> Option<String>;

    fn resolve_element(&self, pipeline: &str, deployed: &str) -> Option<String>;
}

/// Resolver that leaves every name untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityResolver;

impl NameResolver for IdentityResolver {
    fn resolve_pipeline(&self, _deployed: &str) -> Option<String> {
        None
    }

    fn resolve_element(&self, _pipeline: &str, _deployed: &str) -> Option<String> {
        None
    }
}

/// Explicitly populated name mapping.
///
/// Element mappings are scoped by the logical pipeline name.
#[derive(Debug, Default)]
pub struct NameMappingRegistry {
    pipelines: RwLock<HashMap<String, String>>,
    elements: RwLock<HashMap<(String, String), String>>,
}

impl NameMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_pipeline(&self, deployed: impl Into<String>, logical: impl Into<String>) {
        self.pipelines.write().insert(deployed.into(), logical.into());
    }

    pub fn register_element(
        &self,
        pipeline: impl Into<String>,
        deployed: impl Into<String>,
        logical: impl Into<String>,
    ) {
        self.elements
            .write()
            .insert((pipeline.into(), deployed.into()), logical.into());
    }

    /// Forget every mapping of a logical pipeline
    pub fn unregister_pipeline(&self, pipeline: &str) {
        self.pipelines.write().retain(|_, logical| logical != pipeline);
        self.elements.write().retain(|(p, _), _| p != pipeline);
    }

    pub fn clear(&self) {
        self.pipelines.write().clear();
        self.elements.write().clear();
    }

    pub fn len(&self) -> usize {
        self.pipelines.read().len() + self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NameResolver for NameMappingRegistry {
    fn resolve_pipeline(&self, deployed: &str) -> Option<String> {
        self.pipelines.read().get(deployed).cloned()
    }

    fn resolve_element(&self, pipeline: &str, deployed: &str) -> Option<String> {
        self.elements
            .read()
            .get(&(pipeline.to_string(), deployed.to_string()))
            .cloned()
    }
}

/// Rewrite the pipeline and element names of an event in place
pub fn resolve_event(resolver: &dyn NameResolver, event: &mut MonitoringEvent) {
    let (pipeline, element) = match event {
        MonitoringEvent::Observation {
            pipeline, element, ..
        }
        | MonitoringEvent::Observations {
            pipeline, element, ..
        } => (pipeline, element.as_mut()),
        MonitoringEvent::AlgorithmChanged {
            pipeline, element, ..
        } => (pipeline, Some(element)),
        MonitoringEvent::PipelineLifecycle { pipeline, .. }
        | MonitoringEvent::PipelineTopology { pipeline, .. } => (pipeline, None),
        MonitoringEvent::PlatformObservation { .. }
        | MonitoringEvent::ResourceObservation { .. } => return,
    };

    if let Some(logical) = resolver.resolve_pipeline(pipeline) {
        *pipeline = logical;
    }
    if let Some(element) = element {
        if let Some(logical) = resolver.resolve_element(pipeline, element) {
            *element = logical;
        }
    }
}
