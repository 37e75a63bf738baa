//! The generic hierarchy node.

use crate::config::PartType;
use crate::keys::ObservationKey;
use crate::observables::Observable;
use crate::observation::{Observation, ObservationFactory, ObservationStatistics};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Result of a subtree aggregation stored on its root part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateValue {
    pub value: f64,
    /// Parts that had at least one contributor
    pub contributors: usize,
}

/// One node of the monitoring hierarchy.
///
/// Holds one lazily created [`Observation`] per supported observable and an
/// overlay of subtree aggregates written by the
/// [`StatisticsWalker`](crate::aggregation::StatisticsWalker). Reads prefer the
/// aggregate. Each map has its own lock, so concurrent writers of different
/// parts never contend.
pub struct SystemPart {
    name: String,
    part_type: PartType,
    factory: Arc<ObservationFactory>,
    observations: RwLock<HashMap<Observable, Box<dyn Observation>>>,
    aggregates: RwLock<HashMap<Observable, AggregateValue>>,
}

impl SystemPart {
    pub fn new(name: impl Into<String>, part_type: PartType, factory: Arc<ObservationFactory>) -> Self {
        Self {
            name: name.into(),
            part_type,
            factory,
            observations: RwLock::new(HashMap::new()),
            aggregates: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn part_type(&self) -> PartType {
        self.part_type
    }

    pub fn factory(&self) -> &Arc<ObservationFactory> {
        &self.factory
    }

    #[inline]
    pub fn supports(&self, observable: Observable) -> bool {
        self.factory.supports(self.part_type, observable)
    }

    /// Record a value. Returns `false` if the observable is not supported by
    /// this part type; the value is dropped in that case.
    pub fn set_value(&self, observable: Observable, value: f64, key: Option<&ObservationKey>) -> bool {
        if !self.supports(observable) {
            tracing::debug!(
                "Dropping {} = {} on {} {:?}: unsupported",
                observable,
                value,
                self.part_type,
                self.name
            );
            return false;
        }

        let mut observations = self.observations.write();
        observations
            .entry(observable)
            .or_insert_with(|| self.factory.create(self.part_type, observable))
            .set_value(value, key);
        true
    }

    /// Current value, `0.0` when there is none
    pub fn observed_value(&self, observable: Observable) -> f64 {
        self.try_observed_value(observable).unwrap_or(0.0)
    }

    /// Current value, preferring a stored aggregate
    pub fn try_observed_value(&self, observable: Observable) -> Option<f64> {
        if !self.supports(observable) {
            return None;
        }
        if let Some(aggregate) = self.aggregates.read().get(&observable) {
            return Some(aggregate.value);
        }
        self.observations
            .read()
            .get(&observable)
            .filter(|o| o.has_value())
            .map(|o| o.value())
    }

    /// Value of the part's own observation, ignoring aggregates
    pub fn own_value(&self, observable: Observable) -> Option<f64> {
        if !self.supports(observable) {
            return None;
        }
        self.observations
            .read()
            .get(&observable)
            .filter(|o| o.has_value())
            .map(|o| o.value())
    }

    /// Value contributed by one contributor alone
    pub fn local_value(&self, observable: Observable, key: &ObservationKey) -> Option<f64> {
        if !self.supports(observable) {
            return None;
        }
        self.observations
            .read()
            .get(&observable)
            .and_then(|o| o.local_value(key))
    }

    /// Underlying value before derivation, e.g. the counter behind a rate
    pub fn raw_observed_value(&self, observable: Observable) -> Option<f64> {
        if !self.supports(observable) {
            return None;
        }
        self.observations
            .read()
            .get(&observable)
            .filter(|o| o.has_value())
            .map(|o| o.raw_value())
    }

    pub fn has_value(&self, observable: Observable) -> bool {
        self.try_observed_value(observable).is_some()
    }

    /// Distinct contributors of the observation, or of the stored aggregate
    pub fn component_count(&self, observable: Observable) -> usize {
        if !self.supports(observable) {
            return 0;
        }
        let own = self
            .observations
            .read()
            .get(&observable)
            .map_or(0, |o| o.component_count());
        if own > 0 {
            return own;
        }
        self.aggregates
            .read()
            .get(&observable)
            .map_or(0, |a| a.contributors)
    }

    pub fn statistics(&self, observable: Observable) -> Option<ObservationStatistics> {
        self.observations
            .read()
            .get(&observable)
            .and_then(|o| o.statistics())
    }

    /// Average of all values recorded for the observable
    pub fn average(&self, observable: Observable) -> Option<f64> {
        self.observations
            .read()
            .get(&observable)
            .filter(|o| o.has_value())
            .map(|o| o.average())
    }

    /// Observables with a value, sorted
    pub fn observables(&self) -> Vec<Observable> {
        let mut list: Vec<Observable> = self
            .observations
            .read()
            .iter()
            .filter(|(_, o)| o.has_value())
            .map(|(&obs, _)| obs)
            .collect();
        list.extend(self.aggregates.read().keys().copied());
        list.sort();
        list.dedup();
        list
    }

    /// Reset one observation and its aggregate
    pub fn clear(&self, observable: Observable) {
        if let Some(o) = self.observations.write().get_mut(&observable) {
            o.clear();
        }
        self.aggregates.write().remove(&observable);
    }

    pub fn clear_all(&self) {
        for o in self.observations.write().values_mut() {
            o.clear();
        }
        self.aggregates.write().clear();
    }

    /// Drop every value attributed to `key`
    pub fn remove_contributor(&self, key: &ObservationKey) -> bool {
        let mut removed = false;
        for o in self.observations.write().values_mut() {
            removed |= o.remove_key(key);
        }
        removed
    }

    /// Store a subtree aggregate. Ignored for unsupported observables.
    pub fn set_aggregate(&self, observable: Observable, aggregate: AggregateValue) -> bool {
        if !self.supports(observable) {
            return false;
        }
        self.aggregates.write().insert(observable, aggregate);
        true
    }

    /// Replace all stored aggregates at once, dropping unsupported ones
    pub fn replace_aggregates<I>(&self, aggregates: I) -> usize
    where
        I: IntoIterator<Item = (Observable, AggregateValue)>,
    {
        let aggregates: HashMap<Observable, AggregateValue> = aggregates
            .into_iter()
            .filter(|(obs, _)| self.supports(*obs))
            .collect();
        let count = aggregates.len();
        *self.aggregates.write() = aggregates;
        count
    }

    pub fn aggregate(&self, observable: Observable) -> Option<AggregateValue> {
        self.aggregates.read().get(&observable).copied()
    }

    pub fn has_aggregates(&self) -> bool {
        !self.aggregates.read().is_empty()
    }

    pub fn clear_aggregates(&self) {
        self.aggregates.write().clear();
    }

    /// Current values of every observable with a value, aggregates preferred
    pub fn snapshot_values(&self) -> BTreeMap<Observable, f64> {
        let mut values: BTreeMap<Observable, f64> = self
            .observations
            .read()
            .iter()
            .filter(|(_, o)| o.has_value())
            .map(|(&obs, o)| (obs, o.value()))
            .collect();
        for (&obs, aggregate) in self.aggregates.read().iter() {
            values.insert(obs, aggregate.value);
        }
        values
    }

    /// Structurally independent copy sharing only the factory
    pub fn replicate(&self) -> SystemPart {
        let observations = self
            .observations
            .read()
            .iter()
            .map(|(&obs, o)| (obs, o.replicate()))
            .collect();
        let aggregates = self.aggregates.read().clone();
        Self {
            name: self.name.clone(),
            part_type: self.part_type,
            factory: self.factory.clone(),
            observations: RwLock::new(observations),
            aggregates: RwLock::new(aggregates),
        }
    }
}

impl fmt::Debug for SystemPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemPart")
            .field("name", &self.name)
            .field("part_type", &self.part_type)
            .field("values", &self.snapshot_values())
            .finish()
    }
}
