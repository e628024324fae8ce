//! Identity types for the pipeline graph.
//!
//! All IDs are newtypes over `u32` that serve as direct array indices
//! into their respective storage vectors, providing O(1) lookup.

use std::fmt;

/// Index into the registry's node arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Compact pad identifier. High 20 bits = node index, low 12 bits = pad index
/// within that node. Ordering follows the packed value, which gives linking a
/// stable lock order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PadId(pub u32);

impl PadId {
    const PAD_BITS: u32 = 12;
    const PAD_MASK: u32 = (1 << Self::PAD_BITS) - 1;

    /// Largest number of pads a single node may own.
    pub const MAX_PADS_PER_NODE: usize = 1 << Self::PAD_BITS;

    pub fn new(node: NodeId, pad_index: u16) -> Self {
        debug_assert!((pad_index as usize) < Self::MAX_PADS_PER_NODE);
        Self((node.0 << Self::PAD_BITS) | (pad_index as u32 & Self::PAD_MASK))
    }

    #[inline]
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> Self::PAD_BITS)
    }

    #[inline]
    pub fn pad_index(self) -> u16 {
        (self.0 & Self::PAD_MASK) as u16
    }
}

impl fmt::Debug for PadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PadId(node={}, pad={})", self.node().0, self.pad_index())
    }
}

/// Index into the registry's link list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u32);

impl LinkId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "NodeId(42)");
    }

    #[test]
    fn test_pad_id_packs_node_and_index() {
        let node = NodeId(100);
        let pad = PadId::new(node, 7);
        assert_eq!(pad.node(), node);
        assert_eq!(pad.pad_index(), 7);
    }

    #[test]
    fn test_pad_id_limits() {
        let node = NodeId((1 << 20) - 1);
        let pad = PadId::new(node, 4095);
        assert_eq!(pad.node(), node);
        assert_eq!(pad.pad_index(), 4095);
    }

    #[test]
    fn test_pad_id_orders_by_node_first() {
        let a = PadId::new(NodeId(1), 4000);
        let b = PadId::new(NodeId(2), 0);
        assert!(a < b);
    }
}
