//! Part types and the capability matrix
//!
//! Every [`SystemPart`](crate::state::SystemPart) carries a [`PartType`]. The
//! [`CapabilityMatrix`] decides which observables a part type may hold; reads
//! and writes outside the matrix are ignored rather than rejected, so that
//! events from misconfigured or evolving deployments cannot destabilize
//! monitoring.

use crate::observables::Observable;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Kind of node in the monitoring hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Platform,
    Pipeline,
    PipelineNode,
    Algorithm,
    Machine,
    HardwareNode,
    Cluster,
    Cloud,
}

impl PartType {
    pub const ALL: &'static [PartType] = &[
        PartType::Platform,
        PartType::Pipeline,
        PartType::PipelineNode,
        PartType::Algorithm,
        PartType::Machine,
        PartType::HardwareNode,
        PartType::Cluster,
        PartType::Cloud,
    ];

    /// Whether parts of this type receive per-item events directly.
    ///
    /// Only those parts wrap rate observables in a time window; aggregated
    /// parts receive already-derived rates.
    pub fn receives_raw_events(self) -> bool {
        matches!(self, PartType::PipelineNode | PartType::Algorithm)
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartType::Platform => "platform",
            PartType::Pipeline => "pipeline",
            PartType::PipelineNode => "pipeline node",
            PartType::Algorithm => "algorithm",
            PartType::Machine => "machine",
            PartType::HardwareNode => "hardware node",
            PartType::Cluster => "cluster",
            PartType::Cloud => "cloud",
        };
        f.write_str(s)
    }
}

/// An extra (part type, observable) combination allowed by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityOverride {
    pub part: PartType,
    pub observable: Observable,
}

/// PartType × Observable support matrix
#[derive(Debug, Clone)]
pub struct CapabilityMatrix {
    allowed: HashMap<PartType, HashSet<Observable>>,
}

impl Default for CapabilityMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityMatrix {
    /// Matrix built from the declared defaults of every observable
    pub fn new() -> Self {
        let mut allowed: HashMap<PartType, HashSet<Observable>> = HashMap::new();
        for &obs in Observable::ALL {
            for &part in obs.default_part_types() {
                allowed.entry(part).or_default().insert(obs);
            }
        }
        Self { allowed }
    }

    /// Matrix that allows nothing, for building custom setups
    pub fn empty() -> Self {
        Self {
            allowed: HashMap::new(),
        }
    }

    /// Default matrix plus configured overrides
    pub fn with_overrides(overrides: &[CapabilityOverride]) -> Self {
        let mut matrix = Self::new();
        for o in overrides {
            matrix.allow(o.part, o.observable);
        }
        matrix
    }

    pub fn allow(&mut self, part: PartType, observable: Observable) {
        self.allowed.entry(part).or_default().insert(observable);
    }

    pub fn deny(&mut self, part: PartType, observable: Observable) {
        if let Some(set) = self.allowed.get_mut(&part) {
            set.remove(&observable);
        }
    }

    #[inline]
    pub fn supports(&self, part: PartType, observable: Observable) -> bool {
        self.allowed
            .get(&part)
            .is_some_and(|set| set.contains(&observable))
    }

    /// Observables supported by a part type, sorted
    pub fn observables_for(&self, part: PartType) -> Vec<Observable> {
        let mut list: Vec<_> = self
            .allowed
            .get(&part)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        list.sort();
        list
    }
}
