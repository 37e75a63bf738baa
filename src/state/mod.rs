//! Hierarchical system state
//!
//! ```text
//! SystemState
//! └── PlatformSystemPart
//!     ├── machines / hardware nodes / clusters / clouds   (SystemPart)
//!     └── PipelineSystemPart (one per live pipeline)
//!         ├── PipelineNodeSystemPart (one per element)  --current algorithm-->
//!         └── AlgorithmSystemPart    (one per variant)
//!             └── PipelineNodeSystemPart (sub-nodes)
//! ```
//!
//! Every part is created lazily on first reference and shared through an
//! `Arc`. [`SystemState::freeze`] produces a [`FrozenSystemState`].

pub mod algorithm;
pub mod frozen;
pub mod node;
pub mod part;
pub mod pipeline;
pub mod platform;
pub mod system;

pub use algorithm::{AlgorithmSystemPart, NodeImplementationSystemPart};
pub use frozen::{FrozenAlgorithm, FrozenPipeline, FrozenSystemState, ObservableValues};
pub use node::{ExecutorCounts, ExecutorRegistry, PipelineNodeSystemPart};
pub use part::{AggregateValue, SystemPart};
pub use pipeline::{PipelineLifecycleStatus, PipelineSystemPart};
pub use platform::PlatformSystemPart;
pub use system::SystemState;
