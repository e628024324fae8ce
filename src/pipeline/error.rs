//! Pipeline-specific error types.

use crate::pipeline::id::{NodeId, PadId};
use crate::pipeline::lifecycle::PipelineState;
use crate::pipeline::node_kind::NodeKind;
use thiserror::Error;

/// Why a dynamic link could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkFailureReason {
    /// The target node has no input pad whose caps match the new pad.
    NoCompatiblePad,
    /// The announced pad is not an output pad.
    NotAnOutput,
    /// No target was registered for the producer.
    NoRoute,
    /// The producer does not announce pads dynamically.
    NotDynamic,
}

impl std::fmt::Display for LinkFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            LinkFailureReason::NoCompatiblePad => "no compatible input pad on target",
            LinkFailureReason::NotAnOutput => "announced pad is not an output",
            LinkFailureReason::NoRoute => "no target registered for producer",
            LinkFailureReason::NotDynamic => "producer does not expose dynamic pads",
        };
        f.write_str(text)
    }
}

/// A non-fatal failure of the dynamic linker. The affected stream produces
/// no output but the pipeline keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicLinkFailure {
    pub producer: String,
    pub pad: String,
    pub caps: String,
    pub target: Option<String>,
    pub reason: LinkFailureReason,
}

impl std::fmt::Display for DynamicLinkFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({})", self.producer, self.pad, self.caps)?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target)?;
        }
        write!(f, ": {}", self.reason)
    }
}

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot create {kind} node '{name}': {message}")]
    NodeCreation {
        kind: NodeKind,
        name: String,
        message: String,
    },

    #[error("Static link {from} -> {to} failed: {message}")]
    StaticLink {
        from: String,
        to: String,
        message: String,
    },

    #[error("Mixer capacity exceeded: {requested} inputs requested, {capacity} available")]
    Capacity { requested: usize, capacity: usize },

    #[error("Mixer slot for '{0}' is already reserved")]
    DuplicateSlot(String),

    #[error("No mixer slot reserved for '{0}'")]
    UnknownSlot(String),

    #[error("Dynamic link failed: {0}")]
    DynamicLink(DynamicLinkFailure),

    #[error("Invalid state transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    #[error("Pipeline not active")]
    NotActive,

    #[error("Terminal event was already observed")]
    TerminalConsumed,

    #[error("Pipeline has no mixer")]
    NoMixer,

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Unknown pad {0:?}")]
    UnknownPad(PadId),

    #[error("Node {node:?} has no pad named '{name}'")]
    NoSuchPad { node: NodeId, name: String },

    #[error("Failed to spawn link dispatcher: {0}")]
    Dispatcher(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error aborts the build/run. Only dynamic link failures
    /// leave the pipeline running.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::DynamicLink(_))
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dynamic_link_failure_is_not_fatal() {
        let err = PipelineError::DynamicLink(DynamicLinkFailure {
            producer: "main-decoder".into(),
            pad: "src_1".into(),
            caps: "audio/raw".into(),
            target: Some("main-converter".into()),
            reason: LinkFailureReason::NoCompatiblePad,
        });
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("main-decoder:src_1"));
        assert!(err.to_string().contains("no compatible input pad"));
    }

    #[test]
    fn test_capacity_error_message() {
        let err = PipelineError::Capacity {
            requested: 3,
            capacity: 2,
        };
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "Mixer capacity exceeded: 3 inputs requested, 2 available"
        );
    }
}
