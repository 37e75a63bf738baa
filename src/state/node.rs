//! Logical pipeline elements and their executor accounting.

use super::part::SystemPart;
use crate::config::PartType;
use crate::keys::{ComponentKey, ExecutorKey, ObservationKey, TaskKey};
use crate::observables::Observable;
use crate::observation::ObservationFactory;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

/// Distinct executors, tasks and hosts of one logical element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutorCounts {
    pub executors: usize,
    pub tasks: usize,
    pub hosts: usize,
}

impl ExecutorCounts {
    /// (observable, value) pairs written to the part
    pub fn observations(self) -> [(Observable, f64); 3] {
        [
            (Observable::Executors, self.executors as f64),
            (Observable::Tasks, self.tasks as f64),
            (Observable::Hosts, self.hosts as f64),
        ]
    }
}

/// Reference-counted registry of the contributors of one element.
///
/// A task id is assigned to exactly one [`ComponentKey`]. Registering the
/// same task id with a different key retires the previous assignment before
/// counting the new one.
#[derive(Debug, Clone, Default)]
pub struct ExecutorRegistry {
    assignments: HashMap<u32, ComponentKey>,
    executors: HashMap<ExecutorKey, usize>,
    tasks: HashMap<TaskKey, usize>,
    hosts: HashMap<String, usize>,
}

fn retain<K: std::hash::Hash + Eq>(map: &mut HashMap<K, usize>, key: K) {
    *map.entry(key).or_default() += 1;
}

fn release<K: std::hash::Hash + Eq>(map: &mut HashMap<K, usize>, key: &K) {
    if let Some(count) = map.get_mut(key) {
        *count -= 1;
        if *count == 0 {
            map.remove(key);
        }
    }
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a contributor.
    ///
    /// Returns `None` if the key already holds its task id, otherwise the
    /// key that previously held it, if any.
    pub fn register(&mut self, key: &ComponentKey) -> Option<Option<ComponentKey>> {
        if self.assignments.get(&key.task_id) == Some(key) {
            return None;
        }
        let retired = self.assignments.remove(&key.task_id);
        if let Some(previous) = &retired {
            self.retire(previous);
        }
        retain(&mut self.executors, key.executor());
        retain(&mut self.tasks, key.task());
        retain(&mut self.hosts, key.host.clone());
        self.assignments.insert(key.task_id, key.clone());
        Some(retired)
    }

    /// Forget the contributor assigned to `task_id`
    pub fn unregister(&mut self, task_id: u32) -> Option<ComponentKey> {
        let previous = self.assignments.remove(&task_id)?;
        self.retire(&previous);
        Some(previous)
    }

    fn retire(&mut self, key: &ComponentKey) {
        release(&mut self.executors, &key.executor());
        release(&mut self.tasks, &key.task());
        release(&mut self.hosts, &key.host);
    }

    pub fn assignment(&self, task_id: u32) -> Option<&ComponentKey> {
        self.assignments.get(&task_id)
    }

    pub fn counts(&self) -> ExecutorCounts {
        ExecutorCounts {
            executors: self.executors.len(),
            tasks: self.tasks.len(),
            hosts: self.hosts.len(),
        }
    }
}

/// One logical element of a pipeline.
///
/// The active algorithm is kept by name only; the owning pipeline resolves
/// it against its own algorithm collection.
#[derive(Debug)]
pub struct PipelineNodeSystemPart {
    part: SystemPart,
    current_algorithm: RwLock<Option<String>>,
    registry: Mutex<ExecutorRegistry>,
}

impl PipelineNodeSystemPart {
    pub fn new(name: impl Into<String>, factory: Arc<ObservationFactory>) -> Self {
        Self {
            part: SystemPart::new(name, PartType::PipelineNode, factory),
            current_algorithm: RwLock::new(None),
            registry: Mutex::new(ExecutorRegistry::new()),
        }
    }

    pub fn part(&self) -> &SystemPart {
        &self.part
    }

    pub fn current_algorithm(&self) -> Option<String> {
        self.current_algorithm.read().clone()
    }

    /// Switch the active algorithm, returning the previous one
    pub fn set_current_algorithm(&self, algorithm: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.current_algorithm.write(), algorithm)
    }

    /// Account a contributor and refresh EXECUTORS / TASKS / HOSTS.
    ///
    /// Returns the new counts if they were rewritten.
    pub fn register_component(&self, key: &ComponentKey) -> Option<ExecutorCounts> {
        self.register_mirrored(key, None)
    }

    /// Register `key` and rewrite the counts on this part and on `mirror`.
    ///
    /// The registry lock is held until every count is written, so concurrent
    /// registrations land in the order they were counted. Values of a key
    /// that lost its task id are dropped from both parts.
    fn register_mirrored(&self, key: &ComponentKey, mirror: Option<&SystemPart>) -> Option<ExecutorCounts> {
        let mut registry = self.registry.lock();
        let retired = registry.register(key)?;
        let counts = registry.counts();

        for part in std::iter::once(&self.part).chain(mirror) {
            if let Some(previous) = &retired {
                part.remove_contributor(&ObservationKey::Component(previous.clone()));
            }
            for (obs, value) in counts.observations() {
                part.set_value(obs, value, None);
            }
        }
        if let Some(previous) = retired {
            tracing::debug!(
                "Task {} of {:?} moved from {} to {}",
                key.task_id,
                self.part.name(),
                previous,
                key
            );
        }
        Some(counts)
    }

    /// Forget the contributor of a task, e.g. after rescheduling
    pub fn unregister_task(&self, task_id: u32) -> Option<ExecutorCounts> {
        self.unregister_mirrored(task_id, None)
    }

    pub(crate) fn unregister_mirrored(&self, task_id: u32, mirror: Option<&SystemPart>) -> Option<ExecutorCounts> {
        let mut registry = self.registry.lock();
        let previous = ObservationKey::Component(registry.unregister(task_id)?);
        let counts = registry.counts();
        for part in std::iter::once(&self.part).chain(mirror) {
            part.remove_contributor(&previous);
            for (obs, value) in counts.observations() {
                part.set_value(obs, value, None);
            }
        }
        Some(counts)
    }

    pub fn executor_counts(&self) -> ExecutorCounts {
        self.registry.lock().counts()
    }

    /// Record a value from one contributor, registering it first
    pub fn set_component_value(
        &self,
        observable: Observable,
        value: f64,
        key: Option<&ComponentKey>,
    ) -> (bool, Option<ExecutorCounts>) {
        self.set_mirrored_value(observable, value, key, None)
    }

    /// Like [`set_component_value`](Self::set_component_value), also writing
    /// the value and any recounted totals to `mirror`
    pub(crate) fn set_mirrored_value(
        &self,
        observable: Observable,
        value: f64,
        key: Option<&ComponentKey>,
        mirror: Option<&SystemPart>,
    ) -> (bool, Option<ExecutorCounts>) {
        let counts = key.and_then(|k| self.register_mirrored(k, mirror));
        let observation_key = key.cloned().map(ObservationKey::Component);
        let applied = self.part.set_value(observable, value, observation_key.as_ref());
        if let Some(mirror) = mirror {
            mirror.set_value(observable, value, observation_key.as_ref());
        }
        (applied, counts)
    }

    pub fn replicate(&self) -> PipelineNodeSystemPart {
        Self {
            part: self.part.replicate(),
            current_algorithm: RwLock::new(self.current_algorithm()),
            registry: Mutex::new(self.registry.lock().clone()),
        }
    }
}

impl Deref for PipelineNodeSystemPart {
    type Target = SystemPart;

    fn deref(&self) -> &SystemPart {
        &self.part
    }
}
