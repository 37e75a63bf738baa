//! Root of the monitoring hierarchy.

use super::part::SystemPart;
use super::pipeline::PipelineSystemPart;
use crate::config::PartType;
use crate::events::ResourceKind;
use crate::observation::ObservationFactory;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

type PartMap<T> = RwLock<BTreeMap<String, Arc<T>>>;

fn obtain<T>(map: &PartMap<T>, name: &str, create: impl FnOnce() -> T) -> Arc<T> {
    if let Some(part) = map.read().get(name) {
        return part.clone();
    }
    map.write()
        .entry(name.to_string())
        .or_insert_with(|| Arc::new(create()))
        .clone()
}

fn replicate_resources(map: &PartMap<SystemPart>) -> BTreeMap<String, Arc<SystemPart>> {
    map.read()
        .iter()
        .map(|(name, part)| (name.clone(), Arc::new(part.replicate())))
        .collect()
}

/// Platform part holding resources and one part per live pipeline
#[derive(Debug)]
pub struct PlatformSystemPart {
    part: SystemPart,
    machines: PartMap<SystemPart>,
    hardware: PartMap<SystemPart>,
    clusters: PartMap<SystemPart>,
    clouds: PartMap<SystemPart>,
    pipelines: PartMap<PipelineSystemPart>,
}

impl PlatformSystemPart {
    pub fn new(factory: Arc<ObservationFactory>) -> Self {
        Self {
            part: SystemPart::new("platform", PartType::Platform, factory),
            machines: RwLock::new(BTreeMap::new()),
            hardware: RwLock::new(BTreeMap::new()),
            clusters: RwLock::new(BTreeMap::new()),
            clouds: RwLock::new(BTreeMap::new()),
            pipelines: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn part(&self) -> &SystemPart {
        &self.part
    }

    fn resource_map(&self, kind: ResourceKind) -> &PartMap<SystemPart> {
        match kind {
            ResourceKind::Machine => &self.machines,
            ResourceKind::HardwareNode => &self.hardware,
            ResourceKind::Cluster => &self.clusters,
            ResourceKind::Cloud => &self.clouds,
        }
    }

    /// Get or lazily create a resource part
    pub fn obtain_resource(&self, kind: ResourceKind, name: &str) -> Arc<SystemPart> {
        obtain(self.resource_map(kind), name, || {
            tracing::debug!("Creating {} {:?}", kind.part_type(), name);
            SystemPart::new(name, kind.part_type(), self.part.factory().clone())
        })
    }

    pub fn resource(&self, kind: ResourceKind, name: &str) -> Option<Arc<SystemPart>> {
        self.resource_map(kind).read().get(name).cloned()
    }

    /// Resource parts of one kind, sorted by name
    pub fn resources(&self, kind: ResourceKind) -> Vec<Arc<SystemPart>> {
        self.resource_map(kind).read().values().cloned().collect()
    }

    pub fn remove_resource(&self, kind: ResourceKind, name: &str) -> Option<Arc<SystemPart>> {
        self.resource_map(kind).write().remove(name)
    }

    /// Get or lazily create a pipeline
    pub fn obtain_pipeline(&self, name: &str) -> Arc<PipelineSystemPart> {
        obtain(&self.pipelines, name, || {
            tracing::debug!("Creating pipeline {:?}", name);
            PipelineSystemPart::new(name, self.part.factory().clone())
        })
    }

    pub fn pipeline(&self, name: &str) -> Option<Arc<PipelineSystemPart>> {
        self.pipelines.read().get(name).cloned()
    }

    /// Remove a pipeline. Holders of the returned `Arc` may keep reading it.
    pub fn remove_pipeline(&self, name: &str) -> Option<Arc<PipelineSystemPart>> {
        let removed = self.pipelines.write().remove(name);
        if removed.is_some() {
            tracing::info!("Removed pipeline {:?}", name);
        }
        removed
    }

    /// Live pipelines, sorted by name
    pub fn pipelines(&self) -> Vec<Arc<PipelineSystemPart>> {
        self.pipelines.read().values().cloned().collect()
    }

    pub fn pipeline_names(&self) -> Vec<String> {
        self.pipelines.read().keys().cloned().collect()
    }

    pub fn replicate(&self) -> PlatformSystemPart {
        let pipelines = self
            .pipelines
            .read()
            .iter()
            .map(|(name, p)| (name.clone(), Arc::new(p.replicate())))
            .collect();
        Self {
            part: self.part.replicate(),
            machines: RwLock::new(replicate_resources(&self.machines)),
            hardware: RwLock::new(replicate_resources(&self.hardware)),
            clusters: RwLock::new(replicate_resources(&self.clusters)),
            clouds: RwLock::new(replicate_resources(&self.clouds)),
            pipelines: RwLock::new(pipelines),
        }
    }
}

impl Deref for PlatformSystemPart {
    type Target = SystemPart;

    fn deref(&self) -> &SystemPart {
        &self.part
    }
}
