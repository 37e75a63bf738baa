//! Integration tests for the monitor thread
//!
//! These tests validate the complete ingestion workflow:
//! - startup and shutdown of the monitor thread
//! - event submission, name resolution and tracing
//! - snapshots requested through the bridge

mod common;

use common::mock_helpers::{permissive_tracer, MockTracer};
use common::test_timeout;
use flowmon_rs::monitor::{Monitor, MonitorBridge, MonitorHandle, NameMappingRegistry};
use flowmon_rs::state::PipelineLifecycleStatus;
use flowmon_rs::{MonitoringConfig, MonitoringEvent, Observable, SystemState};
use mockall::predicate::{always, eq};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

fn config() -> MonitoringConfig {
    MonitoringConfig::default().with_aggregation_interval(Duration::from_millis(20))
}

#[test]
fn test_monitor_start_and_stop() {
    let state = Arc::new(SystemState::default());
    let handle = MonitorHandle::start(&config(), state).unwrap();
    assert!(handle.is_running());

    let stats = handle.stop().expect("monitor thread should exit cleanly");
    assert_eq!(stats.events_received, 0);
}

#[test]
fn test_events_are_visible_in_snapshots() {
    let state = Arc::new(SystemState::default());
    let handle = MonitorHandle::start(&config(), state.clone()).unwrap();
    let bridge = handle.bridge().clone();

    bridge
        .submit(MonitoringEvent::observation("pip", Some("src"), Observable::Items, 10.0))
        .unwrap();
    bridge
        .submit(MonitoringEvent::observation("pip", Some("sink"), Observable::Items, 4.0))
        .unwrap();

    // the snapshot is taken after the queued events were applied
    let frozen = bridge.snapshot(test_timeout()).unwrap();
    assert_eq!(frozen.element_value("pip", "src", Observable::Items, 0.0), 10.0);
    assert_eq!(frozen.pipeline_value("pip", Observable::Items, 0.0), 14.0);

    // the shared state can be frozen directly as well
    assert_eq!(
        state.freeze().element_value("pip", "sink", Observable::Items, 0.0),
        4.0
    );

    let stats = handle.stop().unwrap();
    assert_eq!(stats.events_applied, 2);
    assert_eq!(stats.snapshots, 1);
}

#[test]
fn test_tracer_sees_resolved_names() {
    let registry = Arc::new(NameMappingRegistry::new());
    registry.register_pipeline("pip-3-1712", "pip");
    registry.register_element("pip", "ProcessorBolt", "processor");

    let mut tracer = MockTracer::new();
    tracer
        .expect_trace()
        .with(eq("pip/processor"), eq(Observable::Latency), eq(12.0), always())
        .times(1)
        .return_const(());
    tracer.expect_flush().return_const(());

    let state = Arc::new(SystemState::default());
    let (bridge, cmd_rx) = MonitorBridge::new(16);
    let running = Arc::new(AtomicBool::new(true));
    let monitor = Monitor::new(&config(), state.clone(), cmd_rx, running)
        .with_resolver(registry)
        .with_tracer(Arc::new(tracer));
    let thread = monitor.spawn().unwrap();

    bridge
        .submit(MonitoringEvent::observation(
            "pip-3-1712",
            Some("ProcessorBolt"),
            Observable::Latency,
            12.0,
        ))
        .unwrap();
    bridge.shutdown();

    let stats = thread.join().unwrap();
    assert_eq!(stats.events_applied, 1);
    assert!(state.pipeline("pip").is_some_and(|p| p.node("processor").is_some()));
}

#[test]
fn test_rejected_events_are_not_traced() {
    let state = Arc::new(SystemState::default());
    let handle = MonitorHandle::start_with(&config(), state, |monitor| {
        monitor.with_tracer(Arc::new(permissive_tracer()))
    })
    .unwrap();
    let bridge = handle.bridge();

    bridge
        .submit(MonitoringEvent::lifecycle("pip", PipelineLifecycleStatus::Stopping))
        .unwrap();
    bridge
        .submit(MonitoringEvent::observation("pip", None, Observable::Items, 1.0))
        .unwrap();
    let frozen = bridge.snapshot(test_timeout()).unwrap();
    assert_eq!(frozen.try_pipeline_value("pip", Observable::Items), None);

    let stats = handle.stop().unwrap();
    assert_eq!(stats.events_applied, 1);
    assert_eq!(stats.events_ignored, 1);
}

#[test]
fn test_periodic_aggregation_runs() {
    let state = Arc::new(SystemState::default());
    let handle = MonitorHandle::start(&config(), state.clone()).unwrap();
    handle
        .bridge()
        .submit(MonitoringEvent::observation("pip", Some("n"), Observable::Items, 3.0))
        .unwrap();

    let mut aggregated = false;
    for _ in 0..100 {
        if state.pipeline("pip").is_some_and(|p| p.aggregate(Observable::Items).is_some()) {
            aggregated = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(aggregated, "aggregation pass should run on its own schedule");

    let stats = handle.stop().unwrap();
    assert!(stats.aggregation_passes >= 1);
}
