//! Observable catalogue
//!
//! An [`Observable`] names one measurable dimension (latency, throughput,
//! memory, ...). Observables are plain `Copy` values shared by every part of
//! the state model and never mutated. Each one declares:
//!
//! - its [`ObservableCategory`],
//! - the [`AggregationPolicy`] used when folding values of several
//!   contributors or several parts,
//! - the [`ObservationKind`] deciding how the backing observation is wrapped,
//! - the part types that support it by default (see
//!   [`CapabilityMatrix`](crate::config::CapabilityMatrix)).

use crate::config::PartType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grouping of observables, mirroring the quality model they belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservableCategory {
    TimeBehavior,
    Scalability,
    ResourceUsage,
    FunctionalSuitability,
    CloudResourceUsage,
}

/// Function folding several element values into one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ElementAggregator {
    #[default]
    Sum,
    Min,
    Max,
}

impl ElementAggregator {
    /// Fold `value` into the accumulated `acc` (`None` when nothing was folded yet)
    #[inline]
    pub fn fold(self, acc: Option<f64>, value: f64) -> f64 {
        match (self, acc) {
            (_, None) => value,
            (ElementAggregator::Sum, Some(a)) => a + value,
            (ElementAggregator::Min, Some(a)) => a.min(value),
            (ElementAggregator::Max, Some(a)) => a.max(value),
        }
    }

    /// Whether parts without any contributor must be skipped
    #[inline]
    pub fn is_extreme(self) -> bool {
        matches!(self, ElementAggregator::Min | ElementAggregator::Max)
    }
}

/// How values of one observable are combined across contributors and parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregationPolicy {
    /// Element function across parallel/sibling parts
    pub element: ElementAggregator,
    /// Divide the folded sum by the number of contributing parts
    #[serde(default)]
    pub path_average: bool,
}

impl AggregationPolicy {
    pub const SUM: AggregationPolicy = AggregationPolicy::new(ElementAggregator::Sum, false);
    pub const MIN: AggregationPolicy = AggregationPolicy::new(ElementAggregator::Min, false);
    pub const MAX: AggregationPolicy = AggregationPolicy::new(ElementAggregator::Max, false);
    pub const AVERAGE: AggregationPolicy = AggregationPolicy::new(ElementAggregator::Sum, true);

    pub const fn new(element: ElementAggregator, path_average: bool) -> Self {
        Self {
            element,
            path_average,
        }
    }

    /// Fold a complete set of values, `None` if the set is empty
    pub fn fold_all<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut acc = None;
        let mut count = 0usize;
        for value in values {
            acc = Some(self.element.fold(acc, value));
            count += 1;
        }
        acc.map(|v| {
            if self.path_average && self.element == ElementAggregator::Sum && count > 0 {
                v / count as f64
            } else {
                v
            }
        })
    }
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::SUM
    }
}

/// How the backing observation of an observable is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationKind {
    /// Last value plus incremental average
    Plain,
    /// Rate over a time window, fed by cumulative counters
    Rate,
    /// Plain value plus running min/max/average
    Statistics,
}

/// A measurable quality or resource dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Observable {
    // time behavior
    Latency,
    ThroughputItems,
    ThroughputVolume,
    EnactmentDelay,
    // scalability
    Items,
    Volume,
    Velocity,
    Volatility,
    PredictedItemsThreshold,
    // resource usage
    Capacity,
    Executors,
    Tasks,
    Hosts,
    UsedMemory,
    AvailableMemory,
    AvailableFrequency,
    Bandwidth,
    Available,
    AvailableCpus,
    UsedCpus,
    AvailableDfes,
    UsedDfes,
    AvailableMachines,
    UsedMachines,
    Load,
    // functional suitability
    AccuracyConfidence,
    AccuracyErrorRate,
    Believability,
    Relevancy,
    Completeness,
    // cloud resource usage
    Ping,
    CloudBandwidth,
    UsedProcessors,
    UsedHarddiscMem,
    UsedWorkingStorage,
}

use PartType::{Algorithm, Cloud, Cluster, HardwareNode, Machine, Pipeline, PipelineNode, Platform};

const PIPELINE_ELEMENTS: &[PartType] = &[Pipeline, PipelineNode, Algorithm];
const COMPUTE_RESOURCES: &[PartType] = &[Machine, HardwareNode];
const CLOUD_ONLY: &[PartType] = &[Cloud];

impl Observable {
    /// Every observable, in declaration order
    pub const ALL: &'static [Observable] = &[
        Observable::Latency,
        Observable::ThroughputItems,
        Observable::ThroughputVolume,
        Observable::EnactmentDelay,
        Observable::Items,
        Observable::Volume,
        Observable::Velocity,
        Observable::Volatility,
        Observable::PredictedItemsThreshold,
        Observable::Capacity,
        Observable::Executors,
        Observable::Tasks,
        Observable::Hosts,
        Observable::UsedMemory,
        Observable::AvailableMemory,
        Observable::AvailableFrequency,
        Observable::Bandwidth,
        Observable::Available,
        Observable::AvailableCpus,
        Observable::UsedCpus,
        Observable::AvailableDfes,
        Observable::UsedDfes,
        Observable::AvailableMachines,
        Observable::UsedMachines,
        Observable::Load,
        Observable::AccuracyConfidence,
        Observable::AccuracyErrorRate,
        Observable::Believability,
        Observable::Relevancy,
        Observable::Completeness,
        Observable::Ping,
        Observable::CloudBandwidth,
        Observable::UsedProcessors,
        Observable::UsedHarddiscMem,
        Observable::UsedWorkingStorage,
    ];

    /// Upper-case wire name, e.g. `THROUGHPUT_ITEMS`
    pub fn name(self) -> &'static str {
        match self {
            Observable::Latency => "LATENCY",
            Observable::ThroughputItems => "THROUGHPUT_ITEMS",
            Observable::ThroughputVolume => "THROUGHPUT_VOLUME",
            Observable::EnactmentDelay => "ENACTMENT_DELAY",
            Observable::Items => "ITEMS",
            Observable::Volume => "VOLUME",
            Observable::Velocity => "VELOCITY",
            Observable::Volatility => "VOLATILITY",
            Observable::PredictedItemsThreshold => "PREDICTED_ITEMS_THRESHOLD",
            Observable::Capacity => "CAPACITY",
            Observable::Executors => "EXECUTORS",
            Observable::Tasks => "TASKS",
            Observable::Hosts => "HOSTS",
            Observable::UsedMemory => "USED_MEMORY",
            Observable::AvailableMemory => "AVAILABLE_MEMORY",
            Observable::AvailableFrequency => "AVAILABLE_FREQUENCY",
            Observable::Bandwidth => "BANDWIDTH",
            Observable::Available => "AVAILABLE",
            Observable::AvailableCpus => "AVAILABLE_CPUS",
            Observable::UsedCpus => "USED_CPUS",
            Observable::AvailableDfes => "AVAILABLE_DFES",
            Observable::UsedDfes => "USED_DFES",
            Observable::AvailableMachines => "AVAILABLE_MACHINES",
            Observable::UsedMachines => "USED_MACHINES",
            Observable::Load => "LOAD",
            Observable::AccuracyConfidence => "ACCURACY_CONFIDENCE",
            Observable::AccuracyErrorRate => "ACCURACY_ERROR_RATE",
            Observable::Believability => "BELIEVABILITY",
            Observable::Relevancy => "RELEVANCY",
            Observable::Completeness => "COMPLETENESS",
            Observable::Ping => "PING",
            Observable::CloudBandwidth => "CLOUD_BANDWIDTH",
            Observable::UsedProcessors => "USED_PROCESSORS",
            Observable::UsedHarddiscMem => "USED_HARDDISC_MEM",
            Observable::UsedWorkingStorage => "USED_WORKING_STORAGE",
        }
    }

    /// Look up an observable by its wire name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Observable> {
        Self::ALL
            .iter()
            .copied()
            .find(|o| o.name().eq_ignore_ascii_case(name))
    }

    pub fn category(self) -> ObservableCategory {
        use Observable::*;
        match self {
            Latency | ThroughputItems | ThroughputVolume | EnactmentDelay => {
                ObservableCategory::TimeBehavior
            }
            Items | Volume | Velocity | Volatility | PredictedItemsThreshold => {
                ObservableCategory::Scalability
            }
            AccuracyConfidence | AccuracyErrorRate | Believability | Relevancy | Completeness => {
                ObservableCategory::FunctionalSuitability
            }
            Ping | CloudBandwidth | UsedProcessors | UsedHarddiscMem | UsedWorkingStorage => {
                ObservableCategory::CloudResourceUsage
            }
            _ => ObservableCategory::ResourceUsage,
        }
    }

    /// Declared default aggregation policy
    pub fn default_policy(self) -> AggregationPolicy {
        use Observable::*;
        match self {
            Latency | Capacity => AggregationPolicy::AVERAGE,
            EnactmentDelay | Volatility | Load | AccuracyErrorRate | Ping => AggregationPolicy::MAX,
            PredictedItemsThreshold
            | AvailableFrequency
            | Available
            | AccuracyConfidence
            | Believability
            | Relevancy
            | Completeness => AggregationPolicy::MIN,
            _ => AggregationPolicy::SUM,
        }
    }

    /// How the backing observation is wrapped
    pub fn kind(self) -> ObservationKind {
        use Observable::*;
        match self {
            ThroughputItems | ThroughputVolume => ObservationKind::Rate,
            Latency | EnactmentDelay | Capacity | UsedMemory | Load => ObservationKind::Statistics,
            _ => ObservationKind::Plain,
        }
    }

    /// Part types supporting this observable unless overridden by configuration
    pub fn default_part_types(self) -> &'static [PartType] {
        use Observable::*;
        match self {
            Latency | ThroughputItems | ThroughputVolume | EnactmentDelay | Items | Volume
            | Velocity | Volatility | PredictedItemsThreshold | Capacity | Executors | Tasks
            | Hosts | AccuracyConfidence | AccuracyErrorRate | Believability | Relevancy
            | Completeness => PIPELINE_ELEMENTS,
            UsedMemory | Load => &[Pipeline, PipelineNode, Algorithm, Machine, HardwareNode],
            AvailableMemory | AvailableFrequency | Bandwidth | Available | AvailableCpus => {
                COMPUTE_RESOURCES
            }
            UsedCpus => &[Pipeline, Machine, HardwareNode],
            AvailableDfes => &[Platform, HardwareNode],
            UsedDfes => &[Platform, Pipeline, PipelineNode, Algorithm, HardwareNode],
            AvailableMachines => &[Platform, Cluster],
            UsedMachines => &[Platform, Cluster, Pipeline],
            Ping | CloudBandwidth | UsedProcessors | UsedHarddiscMem | UsedWorkingStorage => {
                CLOUD_ONLY
            }
        }
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_lookup() {
        for &obs in Observable::ALL {
            assert_eq!(Observable::from_name(obs.name()), Some(obs));
        }
        assert_eq!(
            Observable::from_name("throughput_items"),
            Some(Observable::ThroughputItems)
        );
        assert_eq!(Observable::from_name("NO_SUCH"), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Observable::AvailableMachines).unwrap();
        assert_eq!(json, "\"AVAILABLE_MACHINES\"");
        let back: Observable = serde_json::from_str("\"USED_HARDDISC_MEM\"").unwrap();
        assert_eq!(back, Observable::UsedHarddiscMem);
    }

    #[test]
    fn test_declared_policies() {
        assert_eq!(
            Observable::ThroughputItems.default_policy(),
            AggregationPolicy::SUM
        );
        assert!(Observable::Latency.default_policy().path_average);
        assert!(Observable::Capacity.default_policy().path_average);
        assert_eq!(
            Observable::Load.default_policy().element,
            ElementAggregator::Max
        );
        assert_eq!(Observable::ThroughputItems.kind(), ObservationKind::Rate);
        assert_eq!(Observable::Latency.kind(), ObservationKind::Statistics);
        assert_eq!(Observable::Executors.kind(), ObservationKind::Plain);
    }

    #[test]
    fn test_fold_all() {
        let values = [3.0, 1.0, 2.0];
        assert_eq!(AggregationPolicy::SUM.fold_all(values), Some(6.0));
        assert_eq!(AggregationPolicy::MIN.fold_all(values), Some(1.0));
        assert_eq!(AggregationPolicy::MAX.fold_all(values), Some(3.0));
        assert_eq!(AggregationPolicy::AVERAGE.fold_all(values), Some(2.0));
        assert_eq!(AggregationPolicy::SUM.fold_all(std::iter::empty()), None);
    }

    #[test]
    fn test_every_observable_has_a_home() {
        for &obs in Observable::ALL {
            assert!(!obs.default_part_types().is_empty(), "{} unsupported everywhere", obs);
        }
    }
}
