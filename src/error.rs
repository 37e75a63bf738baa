//! Error handling for FlowMon-RS
//!
//! Only construction-time and file-level operations can fail. Event
//! ingestion, reads, aggregation and snapshotting are infallible by contract
//! and report degraded data as "no value" instead.

use crate::topology::TopologyError;
use thiserror::Error;

/// Main error type for FlowMon-RS operations
#[derive(Error, Debug)]
pub enum FlowMonError {
    /// Malformed pipeline topology
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FlowMonError>,
    },
}

impl FlowMonError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FlowMonError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for FlowMonError {
    fn from(err: serde_json::Error) -> Self {
        FlowMonError::Serialization(err.to_string())
    }
}

/// Result type alias for FlowMon-RS operations
pub type Result<T> = std::result::Result<T, FlowMonError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlowMonError::Config("missing window".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing window");
    }

    #[test]
    fn test_error_with_context() {
        let err = FlowMonError::Channel("closed".to_string());
        let with_ctx = err.with_context("Failed to submit event");
        assert!(with_ctx.to_string().contains("Failed to submit event"));
        assert!(with_ctx.to_string().contains("closed"));
    }

    #[test]
    fn test_topology_error_converts() {
        let err: FlowMonError = TopologyError::DuplicateProcessor("map".into()).into();
        assert!(matches!(err, FlowMonError::Topology(_)));
        assert!(err.to_string().contains("map"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: Result<()> = Err(FlowMonError::Serialization("bad".into()));
        let err = res.context("Loading snapshot").unwrap_err();
        assert!(err.to_string().starts_with("Loading snapshot"));
    }
}
