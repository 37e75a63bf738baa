use super::{Observation, ObservationStatistics};
use crate::keys::ObservationKey;

/// Running min / max / average of the inner logical value
#[derive(Debug)]
pub struct StatisticsObservation {
    inner: Box<dyn Observation>,
    min: f64,
    max: f64,
    average: f64,
    count: u64,
}

impl StatisticsObservation {
    pub fn new(inner: Box<dyn Observation>) -> Self {
        Self {
            inner,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            average: 0.0,
            count: 0,
        }
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    fn update(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.average += (value - self.average) / self.count as f64;
    }
}

impl Clone for StatisticsObservation {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.replicate(),
            min: self.min,
            max: self.max,
            average: self.average,
            count: self.count,
        }
    }
}

impl Observation for StatisticsObservation {
    fn set_value(&mut self, value: f64, key: Option<&ObservationKey>) {
        self.inner.set_value(value, key);
        let logical = self.inner.value();
        self.update(logical);
    }

    fn value(&self) -> f64 {
        self.inner.value()
    }

    fn local_value(&self, key: &ObservationKey) -> Option<f64> {
        self.inner.local_value(key)
    }

    fn raw_value(&self) -> f64 {
        self.inner.raw_value()
    }

    fn average(&self) -> f64 {
        self.average
    }

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.average = 0.0;
        self.count = 0;
    }

    fn component_count(&self) -> usize {
        self.inner.component_count()
    }

    fn keys(&self) -> Vec<ObservationKey> {
        self.inner.keys()
    }

    fn remove_key(&mut self, key: &ObservationKey) -> bool {
        self.inner.remove_key(key)
    }

    fn statistics(&self) -> Option<ObservationStatistics> {
        (self.count > 0).then_some(ObservationStatistics {
            min: self.min,
            max: self.max,
            average: self.average,
            count: self.count,
        })
    }

    fn replicate(&self) -> Box<dyn Observation> {
        Box::new(self.clone())
    }
}
