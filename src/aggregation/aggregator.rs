use crate::observables::{AggregationPolicy, Observable};
use crate::state::{AggregateValue, SystemPart};

/// Folds the values of several parts for one observable.
///
/// Parts without any contributor still count (as `0.0`) for SUM but are
/// skipped for MIN/MAX. With path-average the folded sum is divided by the
/// number of parts that had contributors. Call [`clear`](Self::clear)
/// before reusing it for the next pass.
#[derive(Debug, Clone)]
pub struct ObservationAggregator {
    observable: Observable,
    policy: AggregationPolicy,
    acc: Option<f64>,
    parts: usize,
    contributing: usize,
}

impl ObservationAggregator {
    pub fn new(observable: Observable, policy: AggregationPolicy) -> Self {
        Self {
            observable,
            policy,
            acc: None,
            parts: 0,
            contributing: 0,
        }
    }

    #[inline]
    pub fn observable(&self) -> Observable {
        self.observable
    }

    #[inline]
    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Fold one part. Returns whether it was taken into account.
    pub fn push_part(&mut self, part: &SystemPart) -> bool {
        if !part.supports(self.observable) {
            return false;
        }
        let contributors = part.component_count(self.observable);
        if contributors == 0 && self.policy.element.is_extreme() {
            return false;
        }
        let value = part.try_observed_value(self.observable).unwrap_or(0.0);
        self.push_value(value, contributors);
        true
    }

    /// Fold a raw value contributed by `contributors` physical contributors
    pub fn push_value(&mut self, value: f64, contributors: usize) {
        self.acc = Some(self.policy.element.fold(self.acc, value));
        self.parts += 1;
        if contributors > 0 {
            self.contributing += 1;
        }
    }

    /// Number of parts folded
    pub fn parts(&self) -> usize {
        self.parts
    }

    /// Number of folded parts that had contributors
    pub fn contributing(&self) -> usize {
        self.contributing
    }

    pub fn value(&self) -> Option<f64> {
        let acc = self.acc?;
        if self.policy.path_average && self.contributing > 0 {
            Some(acc / self.contributing as f64)
        } else {
            Some(acc)
        }
    }

    /// Result to store on the root part; `None` if nothing contributed
    pub fn result(&self) -> Option<AggregateValue> {
        if self.contributing == 0 {
            return None;
        }
        self.value().map(|value| AggregateValue {
            value,
            contributors: self.contributing,
        })
    }

    pub fn clear(&mut self) {
        self.acc = None;
        self.parts = 0;
        self.contributing = 0;
    }
}
