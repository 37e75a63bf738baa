use super::Observation;
use crate::keys::ObservationKey;
use crate::observables::AggregationPolicy;
use std::collections::HashMap;

/// Last value plus incremental average.
///
/// Keyed writes are kept per contributor and folded with the observable's
/// policy into the logical value. An unkeyed write is kept apart and only
/// serves as the logical value while no keyed contribution exists.
#[derive(Debug, Clone)]
pub struct SingleObservation {
    policy: AggregationPolicy,
    value: f64,
    unkeyed: Option<f64>,
    keyed: HashMap<ObservationKey, f64>,
    average: f64,
    updates: u64,
}

impl SingleObservation {
    pub fn new(policy: AggregationPolicy) -> Self {
        Self {
            policy,
            value: 0.0,
            unkeyed: None,
            keyed: HashMap::new(),
            average: 0.0,
            updates: 0,
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    fn refold(&mut self) {
        self.value = match self.policy.fold_all(self.keyed.values().copied()) {
            Some(folded) => folded,
            None => self.unkeyed.unwrap_or(0.0),
        };
    }

    fn record(&mut self) {
        self.updates += 1;
        self.average += (self.value - self.average) / self.updates as f64;
    }
}

impl Observation for SingleObservation {
    fn set_value(&mut self, value: f64, key: Option<&ObservationKey>) {
        match key {
            Some(key) => {
                self.keyed.insert(key.clone(), value);
                self.refold();
            }
            None => {
                self.unkeyed = Some(value);
                self.refold();
            }
        }
        self.record();
    }

    #[inline]
    fn value(&self) -> f64 {
        self.value
    }

    fn local_value(&self, key: &ObservationKey) -> Option<f64> {
        self.keyed.get(key).copied()
    }

    fn average(&self) -> f64 {
        self.average
    }

    #[inline]
    fn has_value(&self) -> bool {
        self.updates > 0
    }

    fn clear(&mut self) {
        self.value = 0.0;
        self.unkeyed = None;
        self.keyed.clear();
        self.average = 0.0;
        self.updates = 0;
    }

    fn component_count(&self) -> usize {
        if self.keyed.is_empty() {
            usize::from(self.unkeyed.is_some())
        } else {
            self.keyed.len()
        }
    }

    fn keys(&self) -> Vec<ObservationKey> {
        let mut keys: Vec<_> = self.keyed.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn remove_key(&mut self, key: &ObservationKey) -> bool {
        let removed = self.keyed.remove(key).is_some();
        if removed {
            self.refold();
        }
        removed
    }

    fn replicate(&self) -> Box<dyn Observation> {
        Box::new(self.clone())
    }
}
