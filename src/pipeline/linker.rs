//! Static and dynamic linking.
//!
//! Static links are made during build between pads that exist from node
//! creation (or were requested from the mixer). Dynamic links are made at
//! run time, whenever a producer announces a new output pad: the pad is
//! connected to the first free, caps-compatible input of the producer's
//! downstream target.
//!
//! Dynamic link handling is invoked from dispatcher threads, possibly for
//! both chains at once, and is idempotent: a repeated announcement of an
//! already-linked pad is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::framework::{MediaFramework, PadAdded};
use crate::pipeline::error::{
    DynamicLinkFailure, LinkFailureReason, PipelineError, PipelineResult,
};
use crate::pipeline::id::{LinkId, NodeId, PadId};
use crate::pipeline::lifecycle::LifecycleController;
use crate::pipeline::pad::{PadDirection, PadInfo};
use crate::pipeline::registry::{LinkAttempt, NodeRegistry};

/// Outcome of a dynamic link request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created.
    Linked(LinkId),
    /// The pad (or every compatible target input) was already linked.
    AlreadyLinked,
}

/// Links pads that exist at build time.
pub struct StaticLinker<'a> {
    registry: &'a NodeRegistry,
    framework: &'a dyn MediaFramework,
}

impl<'a> StaticLinker<'a> {
    pub fn new(registry: &'a NodeRegistry, framework: &'a dyn MediaFramework) -> Self {
        Self {
            registry,
            framework,
        }
    }

    /// Link `from` to `to`. Either pad being linked already is an error.
    pub fn link(&self, from: PadId, to: PadId) -> PipelineResult<LinkId> {
        match self.registry.try_link(from, to)? {
            LinkAttempt::Linked(id) => {
                let out_info = self.registry.pad_info(from)?;
                let in_info = self.registry.pad_info(to)?;
                self.framework.link_pads(&out_info, &in_info);
                debug!(
                    "Linked {} -> {}",
                    self.registry.pad_label(from),
                    self.registry.pad_label(to)
                );
                Ok(id)
            }
            LinkAttempt::OutputBusy(pad) | LinkAttempt::InputBusy(pad) => {
                Err(PipelineError::StaticLink {
                    from: self.registry.pad_label(from),
                    to: self.registry.pad_label(to),
                    message: format!("{} is already linked", self.registry.pad_label(pad)),
                })
            }
        }
    }

    /// Link two pads looked up by node and pad name.
    pub fn link_named(
        &self,
        from_node: NodeId,
        from_pad: &str,
        to_node: NodeId,
        to_pad: &str,
    ) -> PipelineResult<LinkId> {
        let from = self.registry.pad_by_name(from_node, from_pad)?;
        let to = self.registry.pad_by_name(to_node, to_pad)?;
        self.link(from, to)
    }
}

/// Connects pads announced at run time to their downstream targets.
pub struct DynamicLinker {
    registry: Arc<NodeRegistry>,
    framework: Arc<dyn MediaFramework>,
    lifecycle: Arc<LifecycleController>,
    routes: RwLock<HashMap<NodeId, NodeId>>,
    failures: Mutex<Vec<DynamicLinkFailure>>,
}

impl DynamicLinker {
    pub fn new(
        registry: Arc<NodeRegistry>,
        framework: Arc<dyn MediaFramework>,
        lifecycle: Arc<LifecycleController>,
    ) -> Self {
        Self {
            registry,
            framework,
            lifecycle,
            routes: RwLock::new(HashMap::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Pads announced by `producer` go to `target`.
    pub fn route(&self, producer: NodeId, target: NodeId) {
        self.routes.write().insert(producer, target);
    }

    pub fn target_for(&self, producer: NodeId) -> Option<NodeId> {
        self.routes.read().get(&producer).copied()
    }

    /// Register an announced pad and link it to the producer's target.
    pub fn handle(&self, event: &PadAdded) -> PipelineResult<LinkOutcome> {
        if !self.lifecycle.is_playing() {
            return Err(PipelineError::NotActive);
        }

        let kind = self.registry.node_kind(event.producer)?;
        if !kind.has_dynamic_pads() {
            return Err(self.fail(DynamicLinkFailure {
                producer: self.node_label(event.producer),
                pad: event.pad.name.clone(),
                caps: event.pad.caps.to_string(),
                target: None,
                reason: LinkFailureReason::NotDynamic,
            }));
        }

        let pad = self.registry.add_dynamic_pad(event.producer, &event.pad)?;
        let Some(target) = self.target_for(event.producer) else {
            return Err(self.fail(DynamicLinkFailure {
                producer: self.node_label(event.producer),
                pad: event.pad.name.clone(),
                caps: event.pad.caps.to_string(),
                target: None,
                reason: LinkFailureReason::NoRoute,
            }));
        };
        self.on_pad_ready(event.producer, pad, target)
    }

    /// Link `new_pad` of `producer` to the first free compatible input of
    /// `target`.
    pub fn on_pad_ready(
        &self,
        producer: NodeId,
        new_pad: PadId,
        target: NodeId,
    ) -> PipelineResult<LinkOutcome> {
        if !self.lifecycle.is_playing() {
            return Err(PipelineError::NotActive);
        }

        let pad = self.registry.pad_info(new_pad)?;
        if pad.node != producer || pad.direction != PadDirection::Output {
            return Err(self.fail(self.failure(&pad, Some(target), LinkFailureReason::NotAnOutput)));
        }
        if pad.is_linked() {
            debug!("{} already linked", self.registry.pad_label(new_pad));
            return Ok(LinkOutcome::AlreadyLinked);
        }

        let candidates: Vec<PadInfo> = self
            .registry
            .pads(target)?
            .into_iter()
            .filter(|p| p.direction == PadDirection::Input && pad.caps.is_compatible(&p.caps))
            .collect();
        if candidates.is_empty() {
            return Err(self.fail(self.failure(
                &pad,
                Some(target),
                LinkFailureReason::NoCompatiblePad,
            )));
        }

        for candidate in candidates {
            match self.registry.try_link(new_pad, candidate.id)? {
                LinkAttempt::Linked(id) => {
                    let out_info = self.registry.pad_info(new_pad)?;
                    let in_info = self.registry.pad_info(candidate.id)?;
                    self.framework.link_pads(&out_info, &in_info);
                    debug!(
                        "Linked {} -> {}",
                        self.registry.pad_label(new_pad),
                        self.registry.pad_label(candidate.id)
                    );
                    return Ok(LinkOutcome::Linked(id));
                }
                // Lost the race to a duplicate announcement.
                LinkAttempt::OutputBusy(_) => return Ok(LinkOutcome::AlreadyLinked),
                LinkAttempt::InputBusy(_) => continue,
            }
        }

        debug!(
            "Every compatible input of {} is taken, ignoring {}",
            self.node_label(target),
            self.registry.pad_label(new_pad)
        );
        Ok(LinkOutcome::AlreadyLinked)
    }

    /// Failures recorded so far, in the order they happened.
    pub fn failures(&self) -> Vec<DynamicLinkFailure> {
        self.failures.lock().clone()
    }

    fn failure(
        &self,
        pad: &PadInfo,
        target: Option<NodeId>,
        reason: LinkFailureReason,
    ) -> DynamicLinkFailure {
        DynamicLinkFailure {
            producer: self.node_label(pad.node),
            pad: pad.name.clone(),
            caps: pad.caps.to_string(),
            target: target.map(|t| self.node_label(t)),
            reason,
        }
    }

    fn fail(&self, failure: DynamicLinkFailure) -> PipelineError {
        warn!("Dynamic link failed: {}", failure);
        self.failures.lock().push(failure.clone());
        PipelineError::DynamicLink(failure)
    }

    fn node_label(&self, node: NodeId) -> String {
        self.registry
            .node_name(node)
            .unwrap_or_else(|| format!("{:?}", node))
    }
}
