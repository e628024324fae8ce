//! Media framework seam.
//!
//! The compositor core never decodes or renders anything itself. Node
//! implementations, asynchronous pad announcements and the message bus all
//! come from a media framework behind the [`MediaFramework`] trait.
//!
//! # Channels
//!
//! - **Pad notifications**: the core hands every dynamic producer a
//!   [`PadNotifier`] (the sending half of a crossbeam channel). The framework
//!   sends a [`PadAdded`] from whatever thread discovers the pad.
//! - **Message bus**: the framework owns the bus and hands out receivers via
//!   [`MediaFramework::bus`]. Terminal conditions (error, end-of-stream) and
//!   informational traffic all travel on it.
//!
//! [`SimFramework`] is a simulated framework driven by per-URI scripts.

pub mod sim;

pub use sim::{SimFramework, SimSource};

use crossbeam_channel::{Receiver, Sender};

use crate::pipeline::id::NodeId;
use crate::pipeline::lifecycle::PipelineState;
use crate::pipeline::node_kind::NodeKind;
use crate::pipeline::pad::{PadInfo, PadSpec};
use crate::pipeline::registry::NodeConfig;

/// A producer announced a new output pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadAdded {
    pub producer: NodeId,
    pub pad: PadSpec,
}

/// Sending half of the pad notification channel.
pub type PadNotifier = Sender<PadAdded>;

/// Messages posted on the framework's bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// A node failed. Terminal.
    Error {
        /// Name of the node that posted the error, if known.
        source: Option<String>,
        message: String,
        debug: Option<String>,
    },
    /// All streams finished. Terminal.
    EndOfStream,
    /// The framework applied a state change.
    StateChanged {
        from: PipelineState,
        to: PipelineState,
    },
    /// Non-fatal problem reported by a node.
    Warning {
        source: Option<String>,
        message: String,
    },
}

impl BusMessage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BusMessage::Error { .. } | BusMessage::EndOfStream)
    }
}

/// External collaborator supplying node implementations, pad
/// announcements and the message bus.
#[cfg_attr(test, mockall::automock)]
pub trait MediaFramework: Send + Sync {
    /// Instantiate the implementation for a node. `Err` carries the reason
    /// the factory is unavailable.
    fn create_node(
        &self,
        id: NodeId,
        kind: NodeKind,
        name: &str,
        config: &NodeConfig,
    ) -> Result<(), String>;

    /// Subscribe to pad announcements from a dynamic producer.
    fn connect_pad_added(&self, producer: NodeId, notifier: PadNotifier);

    /// Tell the framework a link now exists so data can flow across it.
    fn link_pads(&self, from: &PadInfo, to: &PadInfo);

    /// Request a pipeline-wide state change. Failures surface on the bus.
    fn set_state(&self, state: PipelineState);

    /// A receiver for the message bus.
    fn bus(&self) -> Receiver<BusMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_messages() {
        assert!(BusMessage::EndOfStream.is_terminal());
        assert!(BusMessage::Error {
            source: None,
            message: "boom".into(),
            debug: None,
        }
        .is_terminal());
        assert!(!BusMessage::Warning {
            source: None,
            message: "late frame".into(),
        }
        .is_terminal());
        assert!(!BusMessage::StateChanged {
            from: PipelineState::Null,
            to: PipelineState::Ready,
        }
        .is_terminal());
    }
}
