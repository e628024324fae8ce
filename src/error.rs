//! Error handling for the compositor
//!
//! This module defines the crate-level error type and a Result alias. Graph
//! and runtime errors live in [`crate::pipeline::PipelineError`] and are
//! wrapped here.

use thiserror::Error;

use crate::pipeline::PipelineError;

/// Main error type for compositor operations
#[derive(Error, Debug)]
pub enum CompositorError {
    /// Errors from building or running the pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error wrapped with what was being attempted. The wrapped error is
    /// reachable through `source()`.
    #[error("{context}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CompositorError>,
    },
}

impl CompositorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CompositorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for compositor operations
pub type Result<T> = std::result::Result<T, CompositorError>;

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

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CompositorError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CompositorError::from(e).with_context(f()))
    }
}
