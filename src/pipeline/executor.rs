//! Pipeline aggregate: graph building, start-up, monitoring and teardown.
//!
//! A [`Pipeline`] owns the node registry and every component that touches
//! it. Building happens from a single control context through
//! [`PipelineBuilder`]; once [`Pipeline::start`] has brought the framework
//! to `Playing`, pad announcements are linked on dispatcher threads while
//! the caller blocks in [`Pipeline::wait_terminal`].

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info};

use crate::config::PipConfig;
use crate::framework::{MediaFramework, PadAdded};
use crate::pipeline::dispatcher::LinkDispatcher;
use crate::pipeline::error::{DynamicLinkFailure, PipelineError, PipelineResult};
use crate::pipeline::id::{LinkId, NodeId, PadId};
use crate::pipeline::lifecycle::{LifecycleController, PipelineState};
use crate::pipeline::linker::{DynamicLinker, StaticLinker};
use crate::pipeline::monitor::{EventMonitor, TerminalEvent};
use crate::pipeline::node_kind::NodeKind;
use crate::pipeline::registry::{NodeConfig, NodeRegistry};
use crate::pipeline::slots::{SlotManager, SlotPosition};
use crate::pipeline::snapshot::TopologySnapshot;

/// Process exit status for a build failure.
pub const EXIT_BUILD_FAILURE: i32 = 2;

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub terminal: TerminalEvent,
    /// Dynamic link failures seen while running.
    pub link_failures: Vec<DynamicLinkFailure>,
    /// Graph as it stood when the terminal event arrived.
    pub topology: TopologySnapshot,
}

impl RunReport {
    /// `0` on end-of-stream, `1` on failure.
    pub fn exit_code(&self) -> i32 {
        match self.terminal {
            TerminalEvent::EndOfStream => 0,
            TerminalEvent::Failure { .. } => 1,
        }
    }
}

/// The picture-in-picture graph and its runtime.
pub struct Pipeline {
    registry: Arc<NodeRegistry>,
    framework: Arc<dyn MediaFramework>,
    lifecycle: Arc<LifecycleController>,
    linker: Arc<DynamicLinker>,
    slots: Option<SlotManager>,
    pad_tx: Sender<PadAdded>,
    pad_rx: Receiver<PadAdded>,
    monitor: Option<EventMonitor>,
    dispatcher: Option<LinkDispatcher>,
    workers: usize,
}

impl Pipeline {
    pub fn new(framework: Arc<dyn MediaFramework>, workers: usize) -> Self {
        let registry = Arc::new(NodeRegistry::new());
        let lifecycle = Arc::new(LifecycleController::new(framework.clone()));
        let linker = Arc::new(DynamicLinker::new(
            registry.clone(),
            framework.clone(),
            lifecycle.clone(),
        ));
        let (pad_tx, pad_rx) = crossbeam_channel::unbounded();
        let monitor = Some(EventMonitor::new(framework.bus()));
        Self {
            registry,
            framework,
            lifecycle,
            linker,
            slots: None,
            pad_tx,
            pad_rx,
            monitor,
            dispatcher: None,
            workers,
        }
    }

    // ── Graph building ──

    /// Instantiate a node through the framework and register it.
    ///
    /// Dynamic producers are subscribed to pad announcements right away.
    pub fn create_node(
        &mut self,
        kind: NodeKind,
        name: &str,
        config: NodeConfig,
    ) -> PipelineResult<NodeId> {
        if self.registry.find_node(name).is_some() {
            return Err(PipelineError::NodeCreation {
                kind,
                name: name.to_string(),
                message: "a node with this name already exists".to_string(),
            });
        }
        let id = self.registry.next_node_id();
        self.framework
            .create_node(id, kind, name, &config)
            .map_err(|message| PipelineError::NodeCreation {
                kind,
                name: name.to_string(),
                message,
            })?;
        let id = self.registry.insert_node(kind, name, config)?;
        if kind.has_dynamic_pads() {
            self.framework.connect_pad_added(id, self.pad_tx.clone());
        }
        debug!("Created {} '{}' ({:?})", kind, name, id);
        Ok(id)
    }

    /// Create the mixer and its slot table.
    pub fn add_mixer(&mut self, name: &str, capacity: usize) -> PipelineResult<NodeId> {
        let id = self.create_node(NodeKind::Mixer, name, NodeConfig::default())?;
        self.slots = Some(SlotManager::new(id, capacity));
        Ok(id)
    }

    pub fn reserve_slot(&mut self, logical: &str, position: SlotPosition) -> PipelineResult<PadId> {
        let slots = self.slots.as_mut().ok_or(PipelineError::NoMixer)?;
        slots
            .reserve(&self.registry, logical, position)
            .map(|slot| slot.pad)
    }

    pub fn slot_for(&self, logical: &str) -> PipelineResult<PadId> {
        self.slots
            .as_ref()
            .ok_or(PipelineError::NoMixer)?
            .slot_for(logical)
    }

    pub fn slots(&self) -> Option<&SlotManager> {
        self.slots.as_ref()
    }

    pub fn link(&self, from: PadId, to: PadId) -> PipelineResult<LinkId> {
        StaticLinker::new(&self.registry, self.framework.as_ref()).link(from, to)
    }

    pub fn link_named(
        &self,
        from_node: NodeId,
        from_pad: &str,
        to_node: NodeId,
        to_pad: &str,
    ) -> PipelineResult<LinkId> {
        StaticLinker::new(&self.registry, self.framework.as_ref())
            .link_named(from_node, from_pad, to_node, to_pad)
    }

    /// Send pads announced by `producer` to `target`.
    pub fn route(&self, producer: NodeId, target: NodeId) {
        self.linker.route(producer, target);
    }

    // ── Accessors ──

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn linker(&self) -> &DynamicLinker {
        &self.linker
    }

    pub fn state(&self) -> PipelineState {
        self.lifecycle.state()
    }

    pub fn topology(&self) -> TopologySnapshot {
        TopologySnapshot::capture(&self.registry)
    }

    pub fn link_failures(&self) -> Vec<DynamicLinkFailure> {
        self.linker.failures()
    }

    // ── Running ──

    /// Bring the framework to `Playing`, then start dispatching pad
    /// announcements.
    pub fn start(&mut self) -> PipelineResult<()> {
        self.lifecycle.start()?;
        let dispatcher =
            LinkDispatcher::start(self.linker.clone(), self.pad_rx.clone(), self.workers)?;
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    /// Block until the first error or end-of-stream.
    pub fn wait_terminal(&mut self) -> PipelineResult<TerminalEvent> {
        if !self.lifecycle.has_started() {
            return Err(PipelineError::NotActive);
        }
        let monitor = self.monitor.take().ok_or(PipelineError::TerminalConsumed)?;
        Ok(monitor.wait_terminal())
    }

    /// Stop the framework, then the dispatcher, then drop the graph.
    ///
    /// Returns `false` if teardown already ran.
    pub fn teardown(&mut self) -> bool {
        let dispatcher = &mut self.dispatcher;
        let registry = &self.registry;
        self.lifecycle.teardown(|| {
            if let Some(mut dispatcher) = dispatcher.take() {
                dispatcher.stop();
            }
            registry.release();
        })
    }

    /// Start, wait for the terminal event and tear down.
    pub fn run(mut self) -> PipelineResult<RunReport> {
        if let Err(e) = self.start() {
            self.teardown();
            return Err(e);
        }
        let terminal = self.wait_terminal()?;
        let report = RunReport {
            terminal,
            link_failures: self.link_failures(),
            topology: self.topology(),
        };
        self.teardown();
        info!("Pipeline finished: {}", report.terminal);
        Ok(report)
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // A graph that never started has nothing running in the framework.
        if self.lifecycle.has_started() {
            self.teardown();
        }
    }
}

/// Node handles of one source chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChain {
    pub role: String,
    pub source: NodeId,
    pub decoder: NodeId,
    pub converter: NodeId,
    pub slot: PadId,
}

/// Well-known node handles returned by [`PipelineBuilder::build`].
#[derive(Debug, Clone)]
pub struct PipelineNodeIds {
    pub chains: Vec<SourceChain>,
    pub mixer: NodeId,
    pub sink: NodeId,
}

impl PipelineNodeIds {
    pub fn chain(&self, role: &str) -> Option<&SourceChain> {
        self.chains.iter().find(|c| c.role == role)
    }
}

/// Builds the picture-in-picture graph from configuration.
pub struct PipelineBuilder {
    config: PipConfig,
}

impl PipelineBuilder {
    pub fn new(config: PipConfig) -> Self {
        Self { config }
    }

    /// Build the standard graph:
    /// ```text
    /// main-source ~> main-decoder ~> main-converter ──► video-mixer:sink_0 ┐
    /// pip-source  ~> pip-decoder  ~> pip-converter  ──► video-mixer:sink_1 ┴► video-sink
    /// ```
    /// `~>` links are made at run time when the producer announces its pad.
    pub fn build(
        self,
        framework: Arc<dyn MediaFramework>,
    ) -> PipelineResult<(Pipeline, PipelineNodeIds)> {
        let mut pipeline = Pipeline::new(framework, self.config.dispatch.workers);

        // Create every node before wiring anything.
        let mut pending = Vec::new();
        for (role, source) in self.config.sources() {
            let src = pipeline.create_node(
                NodeKind::Source,
                &format!("{}-source", role),
                NodeConfig::with_uri(source.uri.clone()),
            )?;
            let dec = pipeline.create_node(
                NodeKind::Decoder,
                &format!("{}-decoder", role),
                NodeConfig::default(),
            )?;
            let conv = pipeline.create_node(
                NodeKind::Converter,
                &format!("{}-converter", role),
                NodeConfig::default(),
            )?;
            pending.push((role, source.position, src, dec, conv));
        }
        let mixer = pipeline.add_mixer("video-mixer", self.config.mixer.max_inputs)?;
        let sink = pipeline.create_node(NodeKind::Sink, "video-sink", NodeConfig::default())?;

        let mut chains = Vec::with_capacity(pending.len());
        for (role, position, src, dec, conv) in pending {
            let slot = pipeline.reserve_slot(role, position)?;
            let conv_src = pipeline.registry().pad_by_name(conv, "src")?;
            pipeline.link(conv_src, slot)?;
            pipeline.route(src, dec);
            pipeline.route(dec, conv);
            chains.push(SourceChain {
                role: role.to_string(),
                source: src,
                decoder: dec,
                converter: conv,
                slot,
            });
        }
        pipeline.link_named(mixer, "src", sink, "sink")?;

        info!(
            "Built pipeline: {} nodes, {} static links",
            pipeline.registry().node_count(),
            pipeline.registry().link_count()
        );
        let ids = PipelineNodeIds {
            chains,
            mixer,
            sink,
        };
        Ok((pipeline, ids))
    }
}
