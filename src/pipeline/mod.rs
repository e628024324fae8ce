//! Picture-in-picture compositing graph.
//!
//! Two source chains feed a compositor whose output goes to a video sink.
//! Source and decoder outputs only appear after the pipeline starts, so half
//! of the graph is linked at build time and the other half on the fly.
//!
//! # Architecture
//!
//! ```text
//! [Source] ~> [Decoder] ~> [Converter] ──► [Mixer sink_0] ┐
//! [Source] ~> [Decoder] ~> [Converter] ──► [Mixer sink_1] ┴─► [Sink]
//! ```
//!
//! `──►` links are static, `~>` links are made by the dynamic linker.
//!
//! # Design
//!
//! - **Arena registry**: nodes and pads are addressed by `NodeId`/`PadId`
//!   and owned by one `NodeRegistry`; teardown is a single release pass.
//! - **Explicit notification channel**: producers report new pads as
//!   `PadAdded` messages, drained by a small dispatcher pool.
//! - **Atomic linking**: a pad gains a peer at most once, so duplicate
//!   announcements are harmless.
//! - **Single terminal event**: the first error or end-of-stream ends the run.

pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod id;
pub mod lifecycle;
pub mod linker;
pub mod monitor;
pub mod node_kind;
pub mod pad;
pub mod registry;
pub mod slots;
pub mod snapshot;

pub use dispatcher::LinkDispatcher;
pub use error::{DynamicLinkFailure, LinkFailureReason, PipelineError, PipelineResult};
pub use executor::{
    Pipeline, PipelineBuilder, PipelineNodeIds, RunReport, SourceChain, EXIT_BUILD_FAILURE,
};
pub use id::{LinkId, NodeId, PadId};
pub use lifecycle::{LifecycleController, PipelineState};
pub use linker::{DynamicLinker, LinkOutcome, StaticLinker};
pub use monitor::{EventMonitor, TerminalEvent};
pub use node_kind::NodeKind;
pub use pad::{MediaCaps, MediaFormat, MediaKind, PadDirection, PadInfo, PadPresence, PadSpec};
pub use registry::{Link, LinkAttempt, NodeConfig, NodeInfo, NodeRegistry};
pub use slots::{MixerInputSlot, SlotManager, SlotPosition};
pub use snapshot::{LinkSnapshot, NodeSnapshot, TopologySnapshot};
