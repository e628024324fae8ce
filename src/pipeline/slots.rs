//! Compositor input slots.
//!
//! Each logical input (e.g. `"main"`, `"pip"`) reserves exactly one request
//! pad on the mixer. Reservations happen during build only; afterwards the
//! slot table is read-only.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::{NodeId, PadId};
use crate::pipeline::registry::NodeRegistry;

/// Default number of inputs the mixer accepts.
pub const DEFAULT_MAX_INPUTS: usize = 2;

/// Where a stream lands in the composited frame, in output pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotPosition {
    pub xpos: i32,
    pub ypos: i32,
    pub width: u32,
    pub height: u32,
    /// Stacking order; higher is drawn on top.
    pub zorder: u32,
    pub alpha: f64,
}

impl Default for SlotPosition {
    fn default() -> Self {
        Self {
            xpos: 0,
            ypos: 0,
            width: 1280,
            height: 720,
            zorder: 0,
            alpha: 1.0,
        }
    }
}

/// A reserved mixer input.
#[derive(Debug, Clone, PartialEq)]
pub struct MixerInputSlot {
    pub logical: String,
    pub pad: PadId,
    pub position: SlotPosition,
}

/// Hands out mixer input pads, one per logical stream.
#[derive(Debug)]
pub struct SlotManager {
    mixer: NodeId,
    capacity: usize,
    slots: Vec<MixerInputSlot>,
}

impl SlotManager {
    pub fn new(mixer: NodeId, capacity: usize) -> Self {
        Self {
            mixer,
            capacity,
            slots: Vec::with_capacity(capacity),
        }
    }

    pub fn mixer(&self) -> NodeId {
        self.mixer
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserve a fresh mixer input for `logical`.
    pub fn reserve(
        &mut self,
        registry: &NodeRegistry,
        logical: &str,
        position: SlotPosition,
    ) -> PipelineResult<&MixerInputSlot> {
        if self.slots.iter().any(|s| s.logical == logical) {
            return Err(PipelineError::DuplicateSlot(logical.to_string()));
        }
        if self.slots.len() >= self.capacity {
            return Err(PipelineError::Capacity {
                requested: self.slots.len() + 1,
                capacity: self.capacity,
            });
        }

        let pad = registry.request_pad(self.mixer)?;
        debug!(
            "Reserved mixer input {} for '{}'",
            registry.pad_label(pad),
            logical
        );
        self.slots.push(MixerInputSlot {
            logical: logical.to_string(),
            pad,
            position,
        });
        Ok(&self.slots[self.slots.len() - 1])
    }

    /// The mixer pad reserved for `logical`.
    pub fn slot_for(&self, logical: &str) -> PipelineResult<PadId> {
        self.slot(logical).map(|s| s.pad)
    }

    pub fn slot(&self, logical: &str) -> PipelineResult<&MixerInputSlot> {
        self.slots
            .iter()
            .find(|s| s.logical == logical)
            .ok_or_else(|| PipelineError::UnknownSlot(logical.to_string()))
    }

    pub fn slots(&self) -> &[MixerInputSlot] {
        &self.slots
    }
}
