//! Immutable snapshots handed to the reasoning consumer.

use super::pipeline::PipelineLifecycleStatus;
use crate::error::{FlowMonError, Result, ResultExt};
use crate::observables::Observable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Observable values of one part
pub type ObservableValues = BTreeMap<Observable, f64>;

/// Frozen values of one algorithm and its sub-nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrozenAlgorithm {
    pub values: ObservableValues,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_nodes: BTreeMap<String, ObservableValues>,
}

/// Frozen values of one pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrozenPipeline {
    pub status: PipelineLifecycleStatus,
    pub values: ObservableValues,
    pub nodes: BTreeMap<String, ObservableValues>,
    pub algorithms: BTreeMap<String, FrozenAlgorithm>,
    /// Active algorithm per node
    pub current_algorithms: BTreeMap<String, String>,
}

/// Point-in-time copy of the whole system state.
///
/// Plain owned data, independent of the live model. Queries return the
/// caller's default when a value is absent; the `try_` variants return
/// `None` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenSystemState {
    pub timestamp: DateTime<Utc>,
    pub platform: ObservableValues,
    pub machines: BTreeMap<String, ObservableValues>,
    pub hardware: BTreeMap<String, ObservableValues>,
    pub clusters: BTreeMap<String, ObservableValues>,
    pub clouds: BTreeMap<String, ObservableValues>,
    pub pipelines: BTreeMap<String, FrozenPipeline>,
}

fn lookup(values: Option<&ObservableValues>, observable: Observable) -> Option<f64> {
    values.and_then(|v| v.get(&observable)).copied()
}

impl FrozenSystemState {
    pub fn pipeline(&self, pipeline: &str) -> Option<&FrozenPipeline> {
        self.pipelines.get(pipeline)
    }

    pub fn try_platform_value(&self, observable: Observable) -> Option<f64> {
        lookup(Some(&self.platform), observable)
    }

    pub fn platform_value(&self, observable: Observable, default: f64) -> f64 {
        self.try_platform_value(observable).unwrap_or(default)
    }

    pub fn try_pipeline_value(&self, pipeline: &str, observable: Observable) -> Option<f64> {
        lookup(self.pipeline(pipeline).map(|p| &p.values), observable)
    }

    pub fn pipeline_value(&self, pipeline: &str, observable: Observable, default: f64) -> f64 {
        self.try_pipeline_value(pipeline, observable)
            .unwrap_or(default)
    }

    /// Value of a pipeline element (node)
    pub fn try_element_value(&self, pipeline: &str, element: &str, observable: Observable) -> Option<f64> {
        lookup(
            self.pipeline(pipeline).and_then(|p| p.nodes.get(element)),
            observable,
        )
    }

    pub fn element_value(&self, pipeline: &str, element: &str, observable: Observable, default: f64) -> f64 {
        self.try_element_value(pipeline, element, observable)
            .unwrap_or(default)
    }

    pub fn try_algorithm_value(&self, pipeline: &str, algorithm: &str, observable: Observable) -> Option<f64> {
        lookup(
            self.pipeline(pipeline)
                .and_then(|p| p.algorithms.get(algorithm))
                .map(|a| &a.values),
            observable,
        )
    }

    pub fn algorithm_value(&self, pipeline: &str, algorithm: &str, observable: Observable, default: f64) -> f64 {
        self.try_algorithm_value(pipeline, algorithm, observable)
            .unwrap_or(default)
    }

    /// Active algorithm of an element at freeze time
    pub fn current_algorithm(&self, pipeline: &str, element: &str) -> Option<&str> {
        self.pipeline(pipeline)
            .and_then(|p| p.current_algorithms.get(element))
            .map(String::as_str)
    }

    pub fn try_machine_value(&self, machine: &str, observable: Observable) -> Option<f64> {
        lookup(self.machines.get(machine), observable)
    }

    pub fn machine_value(&self, machine: &str, observable: Observable, default: f64) -> f64 {
        self.try_machine_value(machine, observable)
            .unwrap_or(default)
    }

    pub fn try_hardware_value(&self, node: &str, observable: Observable) -> Option<f64> {
        lookup(self.hardware.get(node), observable)
    }

    pub fn hardware_value(&self, node: &str, observable: Observable, default: f64) -> f64 {
        self.try_hardware_value(node, observable)
            .unwrap_or(default)
    }

    pub fn try_cluster_value(&self, cluster: &str, observable: Observable) -> Option<f64> {
        lookup(self.clusters.get(cluster), observable)
    }

    pub fn try_cloud_value(&self, cloud: &str, observable: Observable) -> Option<f64> {
        lookup(self.clouds.get(cloud), observable)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(FlowMonError::from)
            .context("Failed to parse system state snapshot")
    }
}
