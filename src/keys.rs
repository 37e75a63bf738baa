//! Contributor identities
//!
//! A logical [`SystemPart`](crate::state::SystemPart) may be fed by many
//! physical contributors: parallel task instances of one pipeline node, or
//! several resource managers reporting to the platform. [`ComponentKey`]
//! identifies one task instance; [`ObservationKey`] is what observations are
//! keyed by and also covers named platform sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One physical contributor to a logical pipeline element
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentKey {
    pub host: String,
    pub port: u16,
    pub task_id: u32,
    #[serde(default)]
    pub thread_id: Option<u64>,
}

impl ComponentKey {
    pub fn new(host: impl Into<String>, port: u16, task_id: u32) -> Self {
        Self {
            host: host.into(),
            port,
            task_id,
            thread_id: None,
        }
    }

    pub fn with_thread(mut self, thread_id: u64) -> Self {
        self.thread_id = Some(thread_id);
        self
    }

    /// Identity of the executor (worker thread) running this task
    pub fn executor(&self) -> ExecutorKey {
        ExecutorKey {
            host: self.host.clone(),
            port: self.port,
            thread_id: self.thread_id,
        }
    }

    /// Identity of the task slot, independent of the executing thread
    pub fn task(&self) -> TaskKey {
        TaskKey {
            host: self.host.clone(),
            port: self.port,
            task_id: self.task_id,
        }
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.task_id)?;
        if let Some(thread) = self.thread_id {
            write!(f, "@{}", thread)?;
        }
        Ok(())
    }
}

/// (host, port, thread) identity counted for EXECUTORS
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutorKey {
    pub host: String,
    pub port: u16,
    pub thread_id: Option<u64>,
}

/// (host, port, task) identity counted for TASKS
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub host: String,
    pub port: u16,
    pub task_id: u32,
}

/// Key attributing a value to one contributor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKey {
    /// A task instance of a pipeline element
    Component(ComponentKey),
    /// A named source such as a resource manager reporting to the platform
    Source(String),
}

impl ObservationKey {
    pub fn source(name: impl AsRef<str>) -> Self {
        ObservationKey::Source(name.as_ref().to_string())
    }

    pub fn as_component(&self) -> Option<&ComponentKey> {
        match self {
            ObservationKey::Component(key) => Some(key),
            ObservationKey::Source(_) => None,
        }
    }
}

impl From<ComponentKey> for ObservationKey {
    fn from(key: ComponentKey) -> Self {
        ObservationKey::Component(key)
    }
}

impl fmt::Display for ObservationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationKey::Component(key) => fmt::Display::fmt(key, f),
            ObservationKey::Source(name) => f.write_str(name),
        }
    }
}
