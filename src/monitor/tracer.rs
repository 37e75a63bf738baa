//! Optional collaborator receiving every applied value.

use chrono::{DateTime, Utc};
use crate::observables::Observable;
use parking_lot::Mutex;

/// Receives `(part, observable, value, timestamp)` tuples for each value
/// the monitor applied. `part` is a path such as `pipeline/element`.
#[cfg_attr(test, mockall::automock)]
pub trait StateTracer: Send + Sync {
    fn trace(&self, part: &str, observable: Observable, value: f64, timestamp: DateTime<Utc>);

    /// Called after each aggregation pass
    fn flush(&self) {}
}

/// One traced value
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    pub part: String,
    pub observable: Observable,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Tracer keeping every record in memory
#[derive(Debug, Default)]
pub struct MemoryTracer {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemoryTracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Take all records, leaving the tracer empty
    pub fn drain(&self) -> Vec<TraceRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl StateTracer for MemoryTracer {
    fn trace(&self, part: &str, observable: Observable, value: f64, timestamp: DateTime<Utc>) {
        self.records.lock().push(TraceRecord {
            part: part.to_string(),
            observable,
            value,
            timestamp,
        });
    }
}
