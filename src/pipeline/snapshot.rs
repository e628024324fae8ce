//! Point-in-time views of the graph for logging and tests.

use std::collections::BTreeSet;

use crate::pipeline::id::{LinkId, NodeId};
use crate::pipeline::node_kind::NodeKind;
use crate::pipeline::pad::PadInfo;
use crate::pipeline::registry::NodeRegistry;

/// Snapshot of a single node.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub pads: Vec<PadInfo>,
}

/// Snapshot of a single link, endpoints as `node:pad` labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub from: String,
    pub to: String,
}

/// Complete topology snapshot of the pipeline graph.
#[derive(Debug, Clone, Default)]
pub struct TopologySnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

impl TopologySnapshot {
    pub fn capture(registry: &NodeRegistry) -> Self {
        let nodes = registry
            .node_ids()
            .into_iter()
            .filter_map(|id| {
                let info = registry.node_info(id).ok()?;
                let pads = registry.pads(id).ok()?;
                Some(NodeSnapshot {
                    id,
                    name: info.name,
                    kind: info.kind,
                    pads,
                })
            })
            .collect();
        let links = registry
            .links()
            .into_iter()
            .map(|link| LinkSnapshot {
                id: link.id,
                from: registry.pad_label(link.from),
                to: registry.pad_label(link.to),
            })
            .collect();
        Self { nodes, links }
    }

    /// Links as `(from, to)` label pairs, independent of creation order.
    pub fn link_set(&self) -> BTreeSet<(String, String)> {
        self.links
            .iter()
            .map(|l| (l.from.clone(), l.to.clone()))
            .collect()
    }

    pub fn has_link(&self, from: &str, to: &str) -> bool {
        self.links.iter().any(|l| l.from == from && l.to == to)
    }

    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::NodeConfig;

    #[test]
    fn test_capture_labels_links() {
        let registry = NodeRegistry::new();
        let conv = registry
            .insert_node(NodeKind::Converter, "main-converter", NodeConfig::default())
            .unwrap();
        let sink = registry
            .insert_node(NodeKind::Sink, "video-sink", NodeConfig::default())
            .unwrap();
        let from = registry.pad_by_name(conv, "src").unwrap();
        let to = registry.pad_by_name(sink, "sink").unwrap();
        registry.try_link(from, to).unwrap();

        let snapshot = TopologySnapshot::capture(&registry);
        assert_eq!(snapshot.nodes.len(), 2);
        assert!(snapshot.has_link("main-converter:src", "video-sink:sink"));
        assert_eq!(snapshot.node("video-sink").unwrap().kind, NodeKind::Sink);
        assert_eq!(snapshot.link_set().len(), 1);
    }
}
