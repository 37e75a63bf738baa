//! Value holders for one (part, observable) pair
//!
//! Three variants implement [`Observation`]:
//!
//! - [`SingleObservation`]: last value, incremental average and per-key
//!   contributions folded by the observable's aggregation policy.
//! - [`TimeFramedObservation`]: wraps an inner observation fed with
//!   cumulative counters and reports the rate of increase over a time window.
//! - [`StatisticsObservation`]: wraps an inner observation and tracks
//!   running min / max / average of its value.
//!
//! Parts never construct observations directly; they ask the shared
//! [`ObservationFactory`], which applies the configured wrapping.

mod single;
mod statistics;
mod time_framed;

pub use single::SingleObservation;
pub use statistics::StatisticsObservation;
pub use time_framed::TimeFramedObservation;

use crate::clock::{SharedClock, SystemClock};
use crate::config::{CapabilityMatrix, MonitoringConfig, PartType};
use crate::keys::ObservationKey;
use crate::observables::{AggregationPolicy, Observable, ObservationKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Running statistics of an observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationStatistics {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub count: u64,
}

/// Value tracking for one observable of one part.
///
/// Unset observations read as `0.0` and report `has_value() == false`.
pub trait Observation: Send + Sync + fmt::Debug {
    /// Record a value, optionally attributed to one contributor
    fn set_value(&mut self, value: f64, key: Option<&ObservationKey>);

    /// Current logical value
    fn value(&self) -> f64;

    /// Value contributed by `key` alone, if it contributed
    fn local_value(&self, key: &ObservationKey) -> Option<f64>;

    /// Underlying value before derivation (the counter of a rate)
    fn raw_value(&self) -> f64 {
        self.value()
    }

    /// Incremental average over all logical values seen
    fn average(&self) -> f64;

    fn has_value(&self) -> bool;

    /// Reset the value and every derived field
    fn clear(&mut self);

    /// Number of distinct contributors
    fn component_count(&self) -> usize;

    /// Keys of the contributors, sorted
    fn keys(&self) -> Vec<ObservationKey>;

    /// Drop one contributor, returning whether it was present
    fn remove_key(&mut self, key: &ObservationKey) -> bool;

    fn statistics(&self) -> Option<ObservationStatistics> {
        None
    }

    /// Structurally independent copy
    fn replicate(&self) -> Box<dyn Observation>;
}

/// Builds observations for parts according to configuration
#[derive(Debug, Clone)]
pub struct ObservationFactory {
    capabilities: CapabilityMatrix,
    clock: SharedClock,
    rate_window_ms: u64,
    statistics: bool,
    policies: HashMap<Observable, AggregationPolicy>,
}

impl Default for ObservationFactory {
    fn default() -> Self {
        Self::new(&MonitoringConfig::default(), SystemClock::shared())
    }
}

impl ObservationFactory {
    pub fn new(config: &MonitoringConfig, clock: SharedClock) -> Self {
        let policies = Observable::ALL
            .iter()
            .map(|&obs| (obs, config.policy_for(obs)))
            .collect();
        Self {
            capabilities: config.capabilities(),
            clock,
            rate_window_ms: config.rate_window_ms,
            statistics: config.statistics,
            policies,
        }
    }

    /// Replace the capability matrix
    pub fn with_capabilities(mut self, capabilities: CapabilityMatrix) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capabilities(&self) -> &CapabilityMatrix {
        &self.capabilities
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    pub fn rate_window_ms(&self) -> u64 {
        self.rate_window_ms
    }

    #[inline]
    pub fn supports(&self, part: PartType, observable: Observable) -> bool {
        self.capabilities.supports(part, observable)
    }

    /// Effective aggregation policy of an observable
    pub fn policy(&self, observable: Observable) -> AggregationPolicy {
        self.policies
            .get(&observable)
            .copied()
            .unwrap_or_else(|| observable.default_policy())
    }

    /// Create the backing observation for `observable` on a part of type `part`
    pub fn create(&self, part: PartType, observable: Observable) -> Box<dyn Observation> {
        let single = Box::new(SingleObservation::new(self.policy(observable)));
        match observable.kind() {
            ObservationKind::Rate if part.receives_raw_events() => Box::new(
                TimeFramedObservation::new(single, self.clock.clone(), self.rate_window_ms),
            ),
            ObservationKind::Statistics if self.statistics => {
                Box::new(StatisticsObservation::new(single))
            }
            _ => single,
        }
    }
}
