//! Configuration module for FlowMon-RS
//!
//! This module handles monitoring configuration including:
//! - Time window of rate observations
//! - Statistics wrapping of non-rate observations
//! - Aggregation schedule and per-observable policy overrides
//! - Capability matrix overrides
//!
//! # Files
//!
//! Configuration files are TOML when the extension is `.toml` and JSON
//! otherwise:
//!
//! ```toml
//! rate_window_ms = 1000
//! statistics = true
//! aggregation_interval_ms = 500
//!
//! [[policy_overrides]]
//! observable = "CAPACITY"
//! element = "Max"
//!
//! [[capability_overrides]]
//! part = "machine"
//! observable = "LATENCY"
//! ```

pub mod capabilities;

pub use capabilities::*;

use crate::error::{FlowMonError, Result};
use crate::observables::{AggregationPolicy, ElementAggregator, Observable};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default length of the rate window in milliseconds
pub const DEFAULT_RATE_WINDOW_MS: u64 = 1000;

/// Default period of the background aggregation pass in milliseconds
pub const DEFAULT_AGGREGATION_INTERVAL_MS: u64 = 1000;

/// Default capacity of the ingestion channel
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 4096;

/// Replaces the declared aggregation policy of one observable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverride {
    pub observable: Observable,
    pub element: ElementAggregator,
    #[serde(default)]
    pub path_average: bool,
}

/// File format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Monitoring configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Length of the time window of rate observations
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Wrap non-rate observations in running min/max/average tracking
    #[serde(default = "default_true")]
    pub statistics: bool,

    /// Period of the background StatisticsWalker pass
    #[serde(default = "default_aggregation_interval_ms")]
    pub aggregation_interval_ms: u64,

    /// Bounded size of the ingestion channel
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Per-observable aggregation policy overrides
    #[serde(default)]
    pub policy_overrides: Vec<PolicyOverride>,

    /// Additional (part type, observable) combinations to allow
    #[serde(default)]
    pub capability_overrides: Vec<CapabilityOverride>,
}

fn default_rate_window_ms() -> u64 {
    DEFAULT_RATE_WINDOW_MS
}

fn default_true() -> bool {
    true
}

fn default_aggregation_interval_ms() -> u64 {
    DEFAULT_AGGREGATION_INTERVAL_MS
}

fn default_event_queue_capacity() -> usize {
    DEFAULT_EVENT_QUEUE_CAPACITY
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            rate_window_ms: DEFAULT_RATE_WINDOW_MS,
            statistics: true,
            aggregation_interval_ms: DEFAULT_AGGREGATION_INTERVAL_MS,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            policy_overrides: Vec::new(),
            capability_overrides: Vec::new(),
        }
    }
}

impl MonitoringConfig {
    /// Set the rate window length
    pub fn with_rate_window(mut self, window: Duration) -> Self {
        self.rate_window_ms = window.as_millis() as u64;
        self
    }

    /// Set the background aggregation period
    pub fn with_aggregation_interval(mut self, interval: Duration) -> Self {
        self.aggregation_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enable or disable statistics wrapping
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics = enabled;
        self
    }

    /// Add a policy override, replacing an earlier one for the same observable
    pub fn with_policy(mut self, observable: Observable, policy: AggregationPolicy) -> Self {
        self.policy_overrides.retain(|o| o.observable != observable);
        self.policy_overrides.push(PolicyOverride {
            observable,
            element: policy.element,
            path_average: policy.path_average,
        });
        self
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn aggregation_interval(&self) -> Duration {
        Duration::from_millis(self.aggregation_interval_ms)
    }

    /// Effective aggregation policy of an observable
    pub fn policy_for(&self, observable: Observable) -> AggregationPolicy {
        self.policy_overrides
            .iter()
            .find(|o| o.observable == observable)
            .map(|o| AggregationPolicy::new(o.element, o.path_average))
            .unwrap_or_else(|| observable.default_policy())
    }

    /// Capability matrix with the configured overrides applied
    pub fn capabilities(&self) -> CapabilityMatrix {
        CapabilityMatrix::with_overrides(&self.capability_overrides)
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowMonError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| {
                FlowMonError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| {
                FlowMonError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
        }
    }

    /// Load a configuration file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load monitoring config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the configuration to disk
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    FlowMonError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| FlowMonError::Config(format!("Failed to serialize config: {}", e)))?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| FlowMonError::Config(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content).map_err(|e| {
            FlowMonError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }
}
