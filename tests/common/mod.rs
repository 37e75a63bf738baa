//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use flowmon_rs::{ManualClock, MonitoringConfig, SystemState};
use std::sync::Arc;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(1000)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// System state driven by a manual clock starting at zero
pub fn manual_state(config: &MonitoringConfig) -> (SystemState, Arc<ManualClock>) {
    let clock = ManualClock::shared(0);
    let state = SystemState::with_config(config, clock.clone());
    (state, clock)
}
