//! Subtree aggregation
//!
//! An [`ObservationAggregator`] folds one observable across a set of parts;
//! the [`StatisticsWalker`] drives a set of aggregators over a pipeline and
//! stores the results as the aggregate overlay of the pipeline and of its
//! active algorithms.

pub mod aggregator;
pub mod walker;

pub use aggregator::ObservationAggregator;
pub use walker::StatisticsWalker;
