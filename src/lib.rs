//! # FlowMon-RS: live system state for adaptive stream processing
//!
//! Keeps a hierarchical, concurrently updated model of a running
//! stream-processing platform and hands immutable snapshots of it to a
//! reasoning component deciding on adaptations.
//!
//! ## Architecture
//!
//! - **State**: platform → pipelines → nodes / algorithms → sub-nodes, each
//!   part holding one observation per supported observable
//! - **Observation**: plain, time-framed rate and statistics variants,
//!   created by an [`ObservationFactory`](observation::ObservationFactory)
//! - **Topology**: processor/stream graphs of pipelines and the walker used
//!   to traverse them
//! - **Aggregation**: subtree rollups computed by the
//!   [`StatisticsWalker`](aggregation::StatisticsWalker)
//! - **Monitor**: channel-driven ingestion thread with periodic aggregation
//!
//! ## Example
//!
//! ```
//! use flowmon_rs::{MonitoringEvent, Observable, SystemState};
//!
//! let state = SystemState::default();
//! state.apply(&MonitoringEvent::observation("pip", Some("src"), Observable::Items, 10.0));
//! state.apply(&MonitoringEvent::observation("pip", Some("sink"), Observable::Items, 5.0));
//! state.aggregate_all();
//!
//! let frozen = state.freeze();
//! assert_eq!(frozen.pipeline_value("pip", Observable::Items, 0.0), 15.0);
//! assert_eq!(frozen.element_value("pip", "src", Observable::Items, 0.0), 10.0);
//! ```

pub mod aggregation;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod monitor;
pub mod observables;
pub mod observation;
pub mod state;
pub mod topology;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::{MonitoringConfig, PartType};
pub use error::{FlowMonError, Result, ResultExt};
pub use events::{MonitoringEvent, ResourceKind};
pub use keys::{ComponentKey, ObservationKey};
pub use monitor::{Monitor, MonitorBridge, MonitorHandle, NameMappingRegistry, StateTracer};
pub use observables::{AggregationPolicy, Observable};
pub use state::{FrozenSystemState, PipelineLifecycleStatus, SystemState};
pub use topology::{PipelineTopology, TopologyDescription};
