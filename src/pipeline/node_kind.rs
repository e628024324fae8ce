//! Node kind enumeration.
//!
//! Defines the processing node kinds the picture-in-picture graph is built
//! from, together with the pads each kind exposes at creation time.

use crate::pipeline::pad::{MediaCaps, PadTemplate};

const DECODER_PADS: &[PadTemplate] = &[PadTemplate::input("sink", MediaCaps::VIDEO_ENCODED)];
const CONVERTER_PADS: &[PadTemplate] = &[
    PadTemplate::input("sink", MediaCaps::VIDEO_RAW),
    PadTemplate::output("src", MediaCaps::VIDEO_RAW),
];
const MIXER_PADS: &[PadTemplate] = &[PadTemplate::output("src", MediaCaps::VIDEO_RAW)];
const SINK_PADS: &[PadTemplate] = &[PadTemplate::input("sink", MediaCaps::VIDEO_RAW)];

/// Caps of the compositor's request inputs.
pub const MIXER_INPUT_CAPS: MediaCaps = MediaCaps::VIDEO_RAW;

/// Kinds of processing nodes in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Resolves a URI and demuxes it; outputs appear once the container is parsed.
    Source,
    /// Decodes an encoded stream; outputs appear once the codec is known.
    Decoder,
    /// Converts raw video into a format the compositor accepts.
    Converter,
    /// Composites several raw video inputs into one frame.
    Mixer,
    /// Presents the composited output.
    Sink,
}

impl NodeKind {
    /// Get the display name for this node kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeKind::Source => "Source",
            NodeKind::Decoder => "Decoder",
            NodeKind::Converter => "Converter",
            NodeKind::Mixer => "Mixer",
            NodeKind::Sink => "Sink",
        }
    }

    /// Factory name the media framework knows this kind by.
    pub fn factory_name(&self) -> &'static str {
        match self {
            NodeKind::Source => "uridecodebin",
            NodeKind::Decoder => "decodebin",
            NodeKind::Converter => "videoconvert",
            NodeKind::Mixer => "compositor",
            NodeKind::Sink => "autovideosink",
        }
    }

    /// Get all node kinds.
    pub fn all() -> &'static [NodeKind] {
        &[
            NodeKind::Source,
            NodeKind::Decoder,
            NodeKind::Converter,
            NodeKind::Mixer,
            NodeKind::Sink,
        ]
    }

    /// Pads that exist from node creation.
    pub fn static_pads(&self) -> &'static [PadTemplate] {
        match self {
            NodeKind::Source => &[],
            NodeKind::Decoder => DECODER_PADS,
            NodeKind::Converter => CONVERTER_PADS,
            NodeKind::Mixer => MIXER_PADS,
            NodeKind::Sink => SINK_PADS,
        }
    }

    /// Whether nodes of this kind announce output pads after they start.
    pub fn has_dynamic_pads(&self) -> bool {
        matches!(self, NodeKind::Source | NodeKind::Decoder)
    }

    /// Whether nodes of this kind hand out input pads on request.
    pub fn has_request_pads(&self) -> bool {
        matches!(self, NodeKind::Mixer)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pad::PadDirection;

    #[test]
    fn test_only_producers_have_dynamic_pads() {
        let dynamic: Vec<_> = NodeKind::all()
            .iter()
            .filter(|k| k.has_dynamic_pads())
            .collect();
        assert_eq!(dynamic, vec![&NodeKind::Source, &NodeKind::Decoder]);
    }

    #[test]
    fn test_converter_has_both_directions() {
        let pads = NodeKind::Converter.static_pads();
        assert!(pads.iter().any(|p| p.direction == PadDirection::Input));
        assert!(pads.iter().any(|p| p.direction == PadDirection::Output));
    }

    #[test]
    fn test_source_starts_without_pads() {
        assert!(NodeKind::Source.static_pads().is_empty());
        assert_eq!(NodeKind::Source.factory_name(), "uridecodebin");
    }
}
