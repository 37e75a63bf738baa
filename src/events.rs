//! Monitoring events delivered by the transport layer
//!
//! Events are plain serde data. They are serialized as tagged JSON objects,
//! one per line in trace files replayed by the `flowmon` binary:
//!
//! ```json
//! {"type":"observation","pipeline":"pip","element":"processor","observable":"LATENCY","value":12.5}
//! {"type":"platform_observation","observable":"AVAILABLE_MACHINES","value":5,"source":"Storm"}
//! ```

use crate::config::PartType;
use crate::keys::ComponentKey;
use crate::observables::Observable;
use crate::state::PipelineLifecycleStatus;
use crate::topology::TopologyDescription;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of resource part held by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Machine,
    HardwareNode,
    Cluster,
    Cloud,
}

impl ResourceKind {
    pub const ALL: &'static [ResourceKind] = &[
        ResourceKind::Machine,
        ResourceKind::HardwareNode,
        ResourceKind::Cluster,
        ResourceKind::Cloud,
    ];

    pub fn part_type(self) -> PartType {
        match self {
            ResourceKind::Machine => PartType::Machine,
            ResourceKind::HardwareNode => PartType::HardwareNode,
            ResourceKind::Cluster => PartType::Cluster,
            ResourceKind::Cloud => PartType::Cloud,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.part_type(), f)
    }
}

/// One event from the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitoringEvent {
    /// Single value for a pipeline (`element == None`) or one of its elements
    Observation {
        pipeline: String,
        #[serde(default)]
        element: Option<String>,
        #[serde(default)]
        key: Option<ComponentKey>,
        observable: Observable,
        value: f64,
    },

    /// Several values for the same target
    Observations {
        pipeline: String,
        #[serde(default)]
        element: Option<String>,
        #[serde(default)]
        key: Option<ComponentKey>,
        values: BTreeMap<Observable, f64>,
    },

    /// The active algorithm of an element changed
    AlgorithmChanged {
        pipeline: String,
        element: String,
        algorithm: String,
    },

    /// Platform-wide value reported by a named source
    PlatformObservation {
        observable: Observable,
        value: f64,
        #[serde(default)]
        source: Option<String>,
    },

    /// Value of a machine, hardware node, cluster or cloud
    ResourceObservation {
        kind: ResourceKind,
        name: String,
        observable: Observable,
        value: f64,
    },

    /// Lifecycle transition of a pipeline
    PipelineLifecycle {
        pipeline: String,
        status: PipelineLifecycleStatus,
    },

    /// Deployment metadata of a pipeline
    PipelineTopology {
        pipeline: String,
        topology: TopologyDescription,
    },
}

impl MonitoringEvent {
    pub fn observation(
        pipeline: impl Into<String>,
        element: Option<&str>,
        observable: Observable,
        value: f64,
    ) -> Self {
        MonitoringEvent::Observation {
            pipeline: pipeline.into(),
            element: element.map(str::to_string),
            key: None,
            observable,
            value,
        }
    }

    pub fn keyed_observation(
        pipeline: impl Into<String>,
        element: impl Into<String>,
        key: ComponentKey,
        observable: Observable,
        value: f64,
    ) -> Self {
        MonitoringEvent::Observation {
            pipeline: pipeline.into(),
            element: Some(element.into()),
            key: Some(key),
            observable,
            value,
        }
    }

    pub fn platform(observable: Observable, value: f64, source: impl Into<String>) -> Self {
        MonitoringEvent::PlatformObservation {
            observable,
            value,
            source: Some(source.into()),
        }
    }

    pub fn resource(kind: ResourceKind, name: impl Into<String>, observable: Observable, value: f64) -> Self {
        MonitoringEvent::ResourceObservation {
            kind,
            name: name.into(),
            observable,
            value,
        }
    }

    pub fn algorithm_changed(
        pipeline: impl Into<String>,
        element: impl Into<String>,
        algorithm: impl Into<String>,
    ) -> Self {
        MonitoringEvent::AlgorithmChanged {
            pipeline: pipeline.into(),
            element: element.into(),
            algorithm: algorithm.into(),
        }
    }

    pub fn lifecycle(pipeline: impl Into<String>, status: PipelineLifecycleStatus) -> Self {
        MonitoringEvent::PipelineLifecycle {
            pipeline: pipeline.into(),
            status,
        }
    }

    /// Pipeline targeted by the event, if any
    pub fn pipeline(&self) -> Option<&str> {
        match self {
            MonitoringEvent::Observation { pipeline, .. }
            | MonitoringEvent::Observations { pipeline, .. }
            | MonitoringEvent::AlgorithmChanged { pipeline, .. }
            | MonitoringEvent::PipelineLifecycle { pipeline, .. }
            | MonitoringEvent::PipelineTopology { pipeline, .. } => Some(pipeline),
            MonitoringEvent::PlatformObservation { .. }
            | MonitoringEvent::ResourceObservation { .. } => None,
        }
    }

    /// Path of the target part and the values carried by the event
    pub fn values(&self) -> Vec<(String, Observable, f64)> {
        fn path(pipeline: &str, element: &Option<String>) -> String {
            match element {
                Some(element) => format!("{}/{}", pipeline, element),
                None => pipeline.to_string(),
            }
        }

        match self {
            MonitoringEvent::Observation {
                pipeline,
                element,
                observable,
                value,
                ..
            } => vec![(path(pipeline, element), *observable, *value)],
            MonitoringEvent::Observations {
                pipeline,
                element,
                values,
                ..
            } => {
                let target = path(pipeline, element);
                values
                    .iter()
                    .map(|(&obs, &value)| (target.clone(), obs, value))
                    .collect()
            }
            MonitoringEvent::PlatformObservation {
                observable, value, ..
            } => vec![("platform".to_string(), *observable, *value)],
            MonitoringEvent::ResourceObservation {
                kind,
                name,
                observable,
                value,
            } => vec![(format!("{}:{}", kind, name), *observable, *value)],
            MonitoringEvent::AlgorithmChanged { .. }
            | MonitoringEvent::PipelineLifecycle { .. }
            | MonitoringEvent::PipelineTopology { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let event = MonitoringEvent::observation("pip", Some("processor"), Observable::Latency, 12.5);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"observation\""));
        assert!(json.contains("\"observable\":\"LATENCY\""));

        let back: MonitoringEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_optional_fields_default() {
        let event: MonitoringEvent = serde_json::from_str(
            r#"{"type":"platform_observation","observable":"AVAILABLE_MACHINES","value":5}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            MonitoringEvent::PlatformObservation {
                observable: Observable::AvailableMachines,
                value: 5.0,
                source: None,
            }
        );
        assert_eq!(event.pipeline(), None);
    }

    #[test]
    fn test_lifecycle_and_resource_events() {
        let event: MonitoringEvent =
            serde_json::from_str(r#"{"type":"pipeline_lifecycle","pipeline":"p","status":"stopping"}"#)
                .unwrap();
        assert_eq!(
            event,
            MonitoringEvent::lifecycle("p", PipelineLifecycleStatus::Stopping)
        );

        let event: MonitoringEvent = serde_json::from_str(
            r#"{"type":"resource_observation","kind":"hardware_node","name":"dfe1","observable":"USED_DFES","value":2}"#,
        )
        .unwrap();
        assert_eq!(event.values(), vec![("hardware node:dfe1".to_string(), Observable::UsedDfes, 2.0)]);
    }

    #[test]
    fn test_batch_values() {
        let mut values = BTreeMap::new();
        values.insert(Observable::Latency, 1.0);
        values.insert(Observable::Items, 2.0);
        let event = MonitoringEvent::Observations {
            pipeline: "p".into(),
            element: Some("n".into()),
            key: None,
            values,
        };
        let traced = event.values();
        assert_eq!(traced.len(), 2);
        assert!(traced.iter().all(|(path, _, _)| path == "p/n"));
    }
}
