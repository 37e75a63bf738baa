//! Mock construction helpers

use chrono::{DateTime, Utc};
use flowmon_rs::monitor::StateTracer;
use flowmon_rs::Observable;

mockall::mock! {
    pub Tracer {}

    impl StateTracer for Tracer {
        fn trace(&self, part: &str, observable: Observable, value: f64, timestamp: DateTime<Utc>);
        fn flush(&self);
    }
}

/// Tracer mock that accepts any number of calls
pub fn permissive_tracer() -> MockTracer {
    let mut tracer = MockTracer::new();
    tracer.expect_trace().return_const(());
    tracer.expect_flush().return_const(());
    tracer
}
