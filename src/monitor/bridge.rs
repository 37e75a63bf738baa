//! Thread boundary between event producers and the monitor.

use crate::error::{FlowMonError, Result};
use crate::events::MonitoringEvent;
use crate::state::FrozenSystemState;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::Duration;

/// Commands consumed by the [`Monitor`](super::Monitor) thread.
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    /// Apply one event to the state
    Event(MonitoringEvent),
    /// Run a statistics pass now
    Aggregate,
    /// Aggregate, freeze and reply with the snapshot
    Snapshot(Sender<FrozenSystemState>),
    /// Stop the monitor loop
    Shutdown,
}

/// Producer handle of the monitor. Cheap to clone; every clone feeds the
/// same bounded queue.
#[derive(Debug, Clone)]
pub struct MonitorBridge {
    cmd_tx: Sender<MonitorCommand>,
}

impl MonitorBridge {
    /// Create a bridge and the receiving end to hand to the monitor
    pub fn new(capacity: usize) -> (Self, Receiver<MonitorCommand>) {
        let (cmd_tx, cmd_rx) = bounded(capacity.max(1));
        (Self { cmd_tx }, cmd_rx)
    }

    /// Submit an event, blocking while the queue is full
    pub fn submit(&self, event: MonitoringEvent) -> Result<()> {
        self.cmd_tx
            .send(MonitorCommand::Event(event))
            .map_err(|_| FlowMonError::Channel("monitor is not running".into()))
    }

    /// Submit an event without blocking. Returns `false` if the queue is
    /// full or the monitor is gone.
    pub fn try_submit(&self, event: MonitoringEvent) -> bool {
        match self.cmd_tx.try_send(MonitorCommand::Event(event)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Monitor queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Send a raw command. Returns `true` if sent.
    pub fn send_command(&self, cmd: MonitorCommand) -> bool {
        self.cmd_tx.send(cmd).is_ok()
    }

    pub fn aggregate_now(&self) -> bool {
        self.send_command(MonitorCommand::Aggregate)
    }

    /// Ask the monitor for a fresh snapshot and wait up to `timeout` for it
    pub fn snapshot(&self, timeout: Duration) -> Result<FrozenSystemState> {
        let (reply_tx, reply_rx) = bounded(1);
        if !self.send_command(MonitorCommand::Snapshot(reply_tx)) {
            return Err(FlowMonError::Channel("monitor is not running".into()));
        }
        reply_rx
            .recv_timeout(timeout)
            .map_err(|e| FlowMonError::Channel(format!("no snapshot received: {}", e)))
    }

    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(MonitorCommand::Shutdown);
    }

    /// Commands waiting in the queue
    pub fn pending(&self) -> usize {
        self.cmd_tx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observables::Observable;

    #[test]
    fn test_submit_and_receive() {
        let (bridge, rx) = MonitorBridge::new(4);
        bridge
            .submit(MonitoringEvent::platform(Observable::AvailableMachines, 1.0, "Storm"))
            .unwrap();
        assert_eq!(bridge.pending(), 1);
        assert!(matches!(rx.try_recv(), Ok(MonitorCommand::Event(_))));
    }

    #[test]
    fn test_try_submit_full_queue() {
        let (bridge, _rx) = MonitorBridge::new(1);
        let event = MonitoringEvent::platform(Observable::AvailableMachines, 1.0, "Storm");
        assert!(bridge.try_submit(event.clone()));
        assert!(!bridge.try_submit(event));
    }

    #[test]
    fn test_disconnected_monitor() {
        let (bridge, rx) = MonitorBridge::new(1);
        drop(rx);
        let event = MonitoringEvent::platform(Observable::AvailableMachines, 1.0, "Storm");
        assert!(matches!(bridge.submit(event), Err(FlowMonError::Channel(_))));
        assert!(!bridge.aggregate_now());
        assert!(bridge.snapshot(Duration::from_millis(10)).is_err());
    }
}
