use super::Observation;
use crate::clock::SharedClock;
use crate::keys::ObservationKey;
use std::collections::HashMap;

/// Rate of a cumulative counter over a time window.
///
/// Every write is forwarded to the inner observation. The increase against
/// the previous value of the same contributor is accumulated for the current
/// window; decreases (counter resets) are ignored. The reported value is the
/// accumulated increase divided by the seconds elapsed since the window
/// started. A write arriving more than `window_ms` after the window start
/// opens a new window.
#[derive(Debug)]
pub struct TimeFramedObservation {
    inner: Box<dyn Observation>,
    clock: SharedClock,
    window_ms: u64,
    window_start: Option<u64>,
    accumulated: f64,
    previous: HashMap<Option<ObservationKey>, f64>,
}

impl TimeFramedObservation {
    pub fn new(inner: Box<dyn Observation>, clock: SharedClock, window_ms: u64) -> Self {
        Self {
            inner,
            clock,
            window_ms,
            window_start: None,
            accumulated: 0.0,
            previous: HashMap::new(),
        }
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Increase accumulated in the current window
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    fn rate_at(&self, now: u64) -> f64 {
        let Some(start) = self.window_start else {
            return 0.0;
        };
        let elapsed_ms = now.saturating_sub(start);
        if elapsed_ms == 0 {
            // window just opened: spread over a full window
            if self.window_ms == 0 {
                return self.accumulated;
            }
            return self.accumulated / (self.window_ms as f64 / 1000.0);
        }
        self.accumulated / (elapsed_ms as f64 / 1000.0)
    }
}

impl Clone for TimeFramedObservation {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.replicate(),
            clock: self.clock.clone(),
            window_ms: self.window_ms,
            window_start: self.window_start,
            accumulated: self.accumulated,
            previous: self.previous.clone(),
        }
    }
}

impl Observation for TimeFramedObservation {
    fn set_value(&mut self, value: f64, key: Option<&ObservationKey>) {
        let now = self.clock.now_millis();
        match self.window_start {
            Some(start) if now.saturating_sub(start) <= self.window_ms => {}
            _ => {
                self.window_start = Some(now);
                self.accumulated = 0.0;
            }
        }

        let slot = key.cloned();
        let delta = match self.previous.get(&slot) {
            Some(previous) => value - previous,
            None => value,
        };
        if delta >= 0.0 {
            self.accumulated += delta;
        }
        self.previous.insert(slot, value);
        self.inner.set_value(value, key);
    }

    fn value(&self) -> f64 {
        self.rate_at(self.clock.now_millis())
    }

    fn local_value(&self, key: &ObservationKey) -> Option<f64> {
        self.inner.local_value(key)
    }

    fn raw_value(&self) -> f64 {
        self.inner.value()
    }

    fn average(&self) -> f64 {
        self.inner.average()
    }

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn clear(&mut self) {
        self.inner.clear();
        self.window_start = None;
        self.accumulated = 0.0;
        self.previous.clear();
    }

    fn component_count(&self) -> usize {
        self.inner.component_count()
    }

    fn keys(&self) -> Vec<ObservationKey> {
        self.inner.keys()
    }

    fn remove_key(&mut self, key: &ObservationKey) -> bool {
        self.previous.remove(&Some(key.clone()));
        self.inner.remove_key(key)
    }

    fn statistics(&self) -> Option<super::ObservationStatistics> {
        self.inner.statistics()
    }

    fn replicate(&self) -> Box<dyn Observation> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observables::AggregationPolicy;
    use crate::observation::SingleObservation;
    use std::sync::Arc;
    use std::time::Duration;

    fn rate(clock: &Arc<ManualClock>, window_ms: u64) -> TimeFramedObservation {
        TimeFramedObservation::new(
            Box::new(SingleObservation::new(AggregationPolicy::SUM)),
            clock.clone(),
            window_ms,
        )
    }

    #[test]
    fn test_unset_reads_zero() {
        let clock = ManualClock::shared(0);
        let obs = rate(&clock, 1000);
        assert!(!obs.has_value());
        assert_eq!(obs.value(), 0.0);
    }

    #[test]
    fn test_rate_at_window_end() {
        let clock = ManualClock::shared(5_000);
        let mut obs = rate(&clock, 1000);

        obs.set_value(0.0, None);
        clock.advance(Duration::from_millis(1000));
        obs.set_value(40.0, None);

        assert!((obs.value() - 40.0).abs() < 1e-9);
        assert_eq!(obs.raw_value(), 40.0);
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let clock = ManualClock::shared(0);
        let mut obs = rate(&clock, 1000);

        obs.set_value(10.0, None);
        clock.set(1000);
        obs.set_value(30.0, None);
        assert!((obs.accumulated() - 30.0).abs() < 1e-9);

        clock.set(1500);
        obs.set_value(35.0, None);
        assert!((obs.accumulated() - 5.0).abs() < 1e-9);
        clock.set(2000);
        assert!((obs.value() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cumulative_counter_rate() {
        let clock = ManualClock::shared(0);
        let mut obs = rate(&clock, 10_000);

        obs.set_value(100.0, None);
        clock.advance(Duration::from_secs(1));
        obs.set_value(200.0, None);
        clock.advance(Duration::from_secs(1));
        obs.set_value(300.0, None);

        assert_eq!(obs.raw_value(), 300.0);
        assert!((obs.value() - 150.0).abs() < 5.0);
    }

    #[test]
    fn test_negative_deltas_are_ignored() {
        let clock = ManualClock::shared(0);
        let mut obs = rate(&clock, 10_000);
        obs.set_value(50.0, None);
        clock.set(500);
        obs.set_value(10.0, None);
        assert!((obs.accumulated() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_deltas_are_per_contributor() {
        let clock = ManualClock::shared(0);
        let mut obs = rate(&clock, 10_000);
        let a = ObservationKey::source("a");
        let b = ObservationKey::source("b");

        obs.set_value(10.0, Some(&a));
        obs.set_value(20.0, Some(&b));
        obs.set_value(15.0, Some(&a));
        assert!((obs.accumulated() - 35.0).abs() < 1e-9);
        assert_eq!(obs.raw_value(), 35.0);
        assert_eq!(obs.component_count(), 2);
    }

    #[test]
    fn test_clear_restarts_window() {
        let clock = ManualClock::shared(0);
        let mut obs = rate(&clock, 1000);
        obs.set_value(10.0, None);
        obs.clear();
        assert!(!obs.has_value());
        assert_eq!(obs.value(), 0.0);

        clock.set(200);
        obs.set_value(5.0, None);
        assert!((obs.accumulated() - 5.0).abs() < 1e-9);
    }
}
