//! Node registry: the arena that owns every node, pad and link.
//!
//! Nodes are only added while the graph is being built, from a single
//! control context. Pads can still appear afterwards: producers announce
//! them from their own threads and the dynamic linker connects them while
//! the other chain does the same. Each node therefore keeps its own pad
//! list, and each pad its own peer slot, so two chains never contend.
//!
//! # Link atomicity
//!
//! [`NodeRegistry::try_link`] locks both endpoint peers in [`PadId`] order,
//! checks that both are free and records the link before releasing them.
//! A pad is the endpoint of at most one link at any time.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::{LinkId, NodeId, PadId};
use crate::pipeline::node_kind::{NodeKind, MIXER_INPUT_CAPS};
use crate::pipeline::pad::{MediaCaps, PadDirection, PadInfo, PadPresence, PadSpec};

/// Per-node configuration handed to the media framework.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeConfig {
    /// Location of the media for source nodes.
    pub uri: Option<String>,
}

impl NodeConfig {
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
        }
    }
}

/// An (output pad, input pad) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Link {
    pub id: LinkId,
    pub from: PadId,
    pub to: PadId,
}

/// Result of a single link attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAttempt {
    /// Both pads were free; the link now exists.
    Linked(LinkId),
    /// The output pad already has a peer.
    OutputBusy(PadId),
    /// The input pad already has a peer.
    InputBusy(PadId),
}

struct PadEntry {
    id: PadId,
    node: NodeId,
    name: String,
    direction: PadDirection,
    presence: PadPresence,
    caps: MediaCaps,
    peer: Mutex<Option<PadId>>,
}

impl PadEntry {
    fn info(&self) -> PadInfo {
        PadInfo {
            id: self.id,
            node: self.node,
            name: self.name.clone(),
            direction: self.direction,
            presence: self.presence,
            caps: self.caps,
            peer: *self.peer.lock(),
        }
    }
}

struct NodeEntry {
    id: NodeId,
    name: String,
    kind: NodeKind,
    config: NodeConfig,
    pads: RwLock<Vec<Arc<PadEntry>>>,
}

impl NodeEntry {
    /// Append a pad. Caller holds the write lock on `pads`.
    fn push_pad(
        &self,
        pads: &mut Vec<Arc<PadEntry>>,
        name: String,
        direction: PadDirection,
        presence: PadPresence,
        caps: MediaCaps,
    ) -> PipelineResult<PadId> {
        if pads.len() >= PadId::MAX_PADS_PER_NODE {
            return Err(PipelineError::NoSuchPad {
                node: self.id,
                name,
            });
        }
        let id = PadId::new(self.id, pads.len() as u16);
        pads.push(Arc::new(PadEntry {
            id,
            node: self.id,
            name,
            direction,
            presence,
            caps,
            peer: Mutex::new(None),
        }));
        Ok(id)
    }
}

/// Read-only view of a registered node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub config: NodeConfig,
    pub pads: Vec<PadId>,
}

/// Owns all nodes, pads and links of one pipeline.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: RwLock<Vec<Arc<NodeEntry>>>,
    names: RwLock<HashMap<String, NodeId>>,
    links: Mutex<Vec<Link>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ──

    /// Register a node and its always-present pads.
    ///
    /// Availability of the node kind is checked by the caller against the
    /// media framework before the node is registered here.
    pub fn insert_node(
        &self,
        kind: NodeKind,
        name: &str,
        config: NodeConfig,
    ) -> PipelineResult<NodeId> {
        let mut names = self.names.write();
        if names.contains_key(name) {
            return Err(PipelineError::NodeCreation {
                kind,
                name: name.to_string(),
                message: "a node with this name already exists".to_string(),
            });
        }

        let mut nodes = self.nodes.write();
        let id = NodeId(nodes.len() as u32);
        let entry = NodeEntry {
            id,
            name: name.to_string(),
            kind,
            config,
            pads: RwLock::new(Vec::new()),
        };
        {
            let mut pads = entry.pads.write();
            for template in kind.static_pads() {
                entry.push_pad(
                    &mut pads,
                    template.name.to_string(),
                    template.direction,
                    PadPresence::Always,
                    template.caps,
                )?;
            }
        }
        nodes.push(Arc::new(entry));
        names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Peek at the id the next inserted node will receive.
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.nodes.read().len() as u32)
    }

    fn node(&self, id: NodeId) -> PipelineResult<Arc<NodeEntry>> {
        self.nodes
            .read()
            .get(id.index())
            .cloned()
            .ok_or(PipelineError::UnknownNode(id))
    }

    pub fn node_info(&self, id: NodeId) -> PipelineResult<NodeInfo> {
        let node = self.node(id)?;
        let pads = node.pads.read().iter().map(|p| p.id).collect();
        Ok(NodeInfo {
            id: node.id,
            name: node.name.clone(),
            kind: node.kind,
            config: node.config.clone(),
            pads,
        })
    }

    pub fn node_name(&self, id: NodeId) -> Option<String> {
        self.node(id).ok().map(|n| n.name.clone())
    }

    pub fn node_kind(&self, id: NodeId) -> PipelineResult<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.names.read().get(name).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.read().iter().map(|n| n.id).collect()
    }

    // ── Pads ──

    fn pad(&self, id: PadId) -> PipelineResult<Arc<PadEntry>> {
        let node = self.node(id.node()).map_err(|_| PipelineError::UnknownPad(id))?;
        let pads = node.pads.read();
        pads.get(id.pad_index() as usize)
            .cloned()
            .ok_or(PipelineError::UnknownPad(id))
    }

    pub fn pad_info(&self, id: PadId) -> PipelineResult<PadInfo> {
        self.pad(id).map(|p| p.info())
    }

    /// Look up an existing pad by name.
    pub fn pad_by_name(&self, node: NodeId, name: &str) -> PipelineResult<PadId> {
        let entry = self.node(node)?;
        let pads = entry.pads.read();
        pads.iter()
            .find(|p| p.name == name)
            .map(|p| p.id)
            .ok_or_else(|| PipelineError::NoSuchPad {
                node,
                name: name.to_string(),
            })
    }

    /// All pads of `node` in creation order.
    pub fn pads(&self, node: NodeId) -> PipelineResult<Vec<PadInfo>> {
        let entry = self.node(node)?;
        let pads = entry.pads.read();
        Ok(pads.iter().map(|p| p.info()).collect())
    }

    /// Register a pad announced by a producer. Announcing the same name
    /// twice returns the pad registered the first time.
    pub fn add_dynamic_pad(&self, node: NodeId, spec: &PadSpec) -> PipelineResult<PadId> {
        let entry = self.node(node)?;
        let mut pads = entry.pads.write();
        if let Some(existing) = pads.iter().find(|p| p.name == spec.name) {
            return Ok(existing.id);
        }
        entry.push_pad(
            &mut pads,
            spec.name.clone(),
            PadDirection::Output,
            PadPresence::Sometimes,
            spec.caps,
        )
    }

    /// Create the next `sink_%u` input on a mixer node.
    pub fn request_pad(&self, node: NodeId) -> PipelineResult<PadId> {
        let entry = self.node(node)?;
        if !entry.kind.has_request_pads() {
            return Err(PipelineError::NoSuchPad {
                node,
                name: "sink_%u".to_string(),
            });
        }
        let mut pads = entry.pads.write();
        let index = pads
            .iter()
            .filter(|p| p.presence == PadPresence::Request)
            .count();
        entry.push_pad(
            &mut pads,
            format!("sink_{}", index),
            PadDirection::Input,
            PadPresence::Request,
            MIXER_INPUT_CAPS,
        )
    }

    /// Human-readable `node:pad` label used in logs and errors.
    pub fn pad_label(&self, id: PadId) -> String {
        match (self.node_name(id.node()), self.pad(id)) {
            (Some(node), Ok(pad)) => format!("{}:{}", node, pad.name),
            _ => format!("{:?}", id),
        }
    }

    // ── Links ──

    /// Link `from` (output) to `to` (input) if both pads are free.
    ///
    /// Direction and caps are validated first; the busy check and the link
    /// itself happen under both pads' locks.
    pub fn try_link(&self, from: PadId, to: PadId) -> PipelineResult<LinkAttempt> {
        let out_pad = self.pad(from)?;
        let in_pad = self.pad(to)?;

        if out_pad.direction != PadDirection::Output || in_pad.direction != PadDirection::Input {
            return Err(self.static_link_error(from, to, "pads must be linked output -> input"));
        }
        if !out_pad.caps.is_compatible(&in_pad.caps) {
            let message = format!("incompatible caps {} -> {}", out_pad.caps, in_pad.caps);
            return Err(self.static_link_error(from, to, &message));
        }

        // Lock in PadId order so two linkers never wait on each other.
        let (first, second) = if from < to {
            (&out_pad, &in_pad)
        } else {
            (&in_pad, &out_pad)
        };
        let mut first_peer = first.peer.lock();
        let mut second_peer = second.peer.lock();
        let (out_peer, in_peer) = if from < to {
            (&mut *first_peer, &mut *second_peer)
        } else {
            (&mut *second_peer, &mut *first_peer)
        };

        if out_peer.is_some() {
            return Ok(LinkAttempt::OutputBusy(from));
        }
        if in_peer.is_some() {
            return Ok(LinkAttempt::InputBusy(to));
        }

        let mut links = self.links.lock();
        let id = LinkId(links.len() as u32);
        links.push(Link { id, from, to });
        *out_peer = Some(to);
        *in_peer = Some(from);
        Ok(LinkAttempt::Linked(id))
    }

    fn static_link_error(&self, from: PadId, to: PadId, message: &str) -> PipelineError {
        PipelineError::StaticLink {
            from: self.pad_label(from),
            to: self.pad_label(to),
            message: message.to_string(),
        }
    }

    pub fn links(&self) -> Vec<Link> {
        self.links.lock().clone()
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().len()
    }

    /// Drop every node, pad and link.
    pub fn release(&self) {
        let mut names = self.names.write();
        let mut nodes = self.nodes.write();
        let mut links = self.links.lock();
        links.clear();
        nodes.clear();
        names.clear();
    }
}
