//! Monitor runtime: the ingestion loop around a shared [`SystemState`].
//!
//! The monitor runs on a dedicated thread. Each iteration:
//! 1. Wait for the next command, at most until the next aggregation is due.
//! 2. Drain queued commands: resolve names, apply events, trace values.
//! 3. Run a statistics pass every `aggregation_interval_ms`.
//!
//! Producers talk to it through a [`MonitorBridge`]; readers may also call
//! [`SystemState::freeze`] directly on the shared state at any time.

pub mod bridge;
pub mod names;
pub mod tracer;

pub use bridge::{MonitorBridge, MonitorCommand};
pub use names::{resolve_event, IdentityResolver, NameMappingRegistry, NameResolver};
pub use tracer::{MemoryTracer, StateTracer, TraceRecord};

use crate::aggregation::StatisticsWalker;
use crate::config::MonitoringConfig;
use crate::error::{Result, ResultExt};
use crate::events::MonitoringEvent;
use crate::state::SystemState;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Longest wait for a command before the running flag is checked again
const MAX_IDLE_WAIT: Duration = Duration::from_millis(50);

/// Counters of one monitor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub events_received: u64,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub aggregation_passes: u64,
    pub snapshots: u64,
}

/// The ingestion loop.
pub struct Monitor {
    state: Arc<SystemState>,
    cmd_rx: Receiver<MonitorCommand>,
    running: Arc<AtomicBool>,
    resolver: Arc<dyn NameResolver>,
    tracer: Option<Arc<dyn StateTracer>>,
    walker: StatisticsWalker,
    aggregation_interval: Duration,
    last_aggregation: Instant,
    stats: MonitorStats,
}

impl Monitor {
    pub fn new(
        config: &MonitoringConfig,
        state: Arc<SystemState>,
        cmd_rx: Receiver<MonitorCommand>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let walker = StatisticsWalker::for_pipelines(state.factory());
        Self {
            state,
            cmd_rx,
            running,
            resolver: Arc::new(IdentityResolver),
            tracer: None,
            walker,
            aggregation_interval: config.aggregation_interval(),
            last_aggregation: Instant::now(),
            stats: MonitorStats::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn StateTracer>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn state(&self) -> &Arc<SystemState> {
        &self.state
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    /// Run until `running` is cleared, Shutdown is received or every
    /// producer is gone.
    pub fn run(&mut self) {
        tracing::info!(
            "Monitor thread started (aggregation every {:?})",
            self.aggregation_interval
        );

        while self.running.load(Ordering::Relaxed) {
            let due = self
                .aggregation_interval
                .saturating_sub(self.last_aggregation.elapsed());
            match self.cmd_rx.recv_timeout(due.clamp(Duration::from_millis(1), MAX_IDLE_WAIT)) {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        self.process_commands();
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::warn!("Monitor command channel disconnected");
                    break;
                }
            }

            if self.last_aggregation.elapsed() >= self.aggregation_interval {
                self.aggregate();
            }
        }

        self.running.store(false, Ordering::Relaxed);
        tracing::info!(
            "Monitor thread exiting ({} events applied, {} ignored, {} aggregation passes)",
            self.stats.events_applied,
            self.stats.events_ignored,
            self.stats.aggregation_passes
        );
    }

    fn process_commands(&mut self) {
        while self.running.load(Ordering::Relaxed) {
            match self.cmd_rx.try_recv() {
                Ok(cmd) => {
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    }

    /// Returns `false` once the loop should stop
    fn handle_command(&mut self, cmd: MonitorCommand) -> bool {
        match cmd {
            MonitorCommand::Event(event) => self.ingest(event),
            MonitorCommand::Aggregate => self.aggregate(),
            MonitorCommand::Snapshot(reply) => {
                self.aggregate();
                self.stats.snapshots += 1;
                let _ = reply.send(self.state.freeze());
            }
            MonitorCommand::Shutdown => {
                tracing::info!("Monitor shutdown requested");
                self.running.store(false, Ordering::Relaxed);
                return false;
            }
        }
        true
    }

    /// Resolve, apply and trace one event
    pub fn ingest(&mut self, mut event: MonitoringEvent) {
        self.stats.events_received += 1;
        resolve_event(self.resolver.as_ref(), &mut event);

        if !self.state.apply(&event) {
            self.stats.events_ignored += 1;
            return;
        }
        self.stats.events_applied += 1;

        if let Some(tracer) = &self.tracer {
            let now = chrono::Utc::now();
            for (part, observable, value) in event.values() {
                tracer.trace(&part, observable, value, now);
            }
        }
    }

    /// Run one statistics pass over every live pipeline
    pub fn aggregate(&mut self) {
        let mut stored = 0;
        for pipeline in self.state.platform().pipelines() {
            stored += self.walker.aggregate_pipeline(&pipeline);
        }
        self.last_aggregation = Instant::now();
        self.stats.aggregation_passes += 1;
        tracing::trace!("Aggregation pass stored {} values", stored);

        if let Some(tracer) = &self.tracer {
            tracer.flush();
        }
    }

    /// Move the monitor onto its own named thread. The handle yields the
    /// final counters.
    pub fn spawn(mut self) -> Result<JoinHandle<MonitorStats>> {
        let handle = std::thread::Builder::new()
            .name("flowmon-monitor".into())
            .spawn(move || {
                self.run();
                self.stats
            })?;
        Ok(handle)
    }
}

/// A running monitor together with its producer handle
pub struct MonitorHandle {
    bridge: MonitorBridge,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<MonitorStats>>,
}

impl MonitorHandle {
    /// Create the channel, the monitor and its thread for `state`
    pub fn start(config: &MonitoringConfig, state: Arc<SystemState>) -> Result<Self> {
        Self::start_with(config, state, |monitor| monitor)
    }

    /// Like [`start`](Self::start), letting the caller attach collaborators
    pub fn start_with<F>(config: &MonitoringConfig, state: Arc<SystemState>, setup: F) -> Result<Self>
    where
        F: FnOnce(Monitor) -> Monitor,
    {
        let (bridge, cmd_rx) = MonitorBridge::new(config.event_queue_capacity);
        let running = Arc::new(AtomicBool::new(true));
        let monitor = setup(Monitor::new(config, state, cmd_rx, running.clone()));
        let thread = monitor.spawn().context("Failed to start monitor thread")?;
        Ok(Self {
            bridge,
            running,
            thread: Some(thread),
        })
    }

    pub fn bridge(&self) -> &MonitorBridge {
        &self.bridge
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the monitor and wait for its thread. Queued events that were
    /// not yet applied are discarded.
    pub fn stop(mut self) -> Option<MonitorStats> {
        self.halt()
    }

    fn halt(&mut self) -> Option<MonitorStats> {
        self.running.store(false, Ordering::Relaxed);
        self.bridge.shutdown();
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(stats) => Some(stats),
            Err(_) => {
                tracing::warn!("Monitor thread panicked");
                None
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.halt();
    }
}
