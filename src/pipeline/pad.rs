//! Pad descriptors and media capabilities.
//!
//! Each node kind declares its always-present pads via static `PadTemplate`
//! arrays. Dynamic and request pads are created later from the same
//! descriptor type. The registry uses the caps to validate links.

use std::fmt;

use crate::pipeline::id::{NodeId, PadId};

/// Broad media family of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    /// Matches any kind.
    Any,
}

/// Whether the stream is still compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Raw,
    Encoded,
    /// Matches any format.
    Any,
}

/// Media-type descriptor attached to every pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaCaps {
    pub kind: MediaKind,
    pub format: MediaFormat,
}

impl MediaCaps {
    pub const ANY: MediaCaps = MediaCaps::new(MediaKind::Any, MediaFormat::Any);
    pub const VIDEO_RAW: MediaCaps = MediaCaps::new(MediaKind::Video, MediaFormat::Raw);
    pub const VIDEO_ENCODED: MediaCaps = MediaCaps::new(MediaKind::Video, MediaFormat::Encoded);
    pub const AUDIO_RAW: MediaCaps = MediaCaps::new(MediaKind::Audio, MediaFormat::Raw);
    pub const AUDIO_ENCODED: MediaCaps = MediaCaps::new(MediaKind::Audio, MediaFormat::Encoded);

    pub const fn new(kind: MediaKind, format: MediaFormat) -> Self {
        Self { kind, format }
    }

    /// Two descriptors are compatible when both kind and format intersect.
    pub fn is_compatible(&self, other: &MediaCaps) -> bool {
        let kind = self.kind == MediaKind::Any
            || other.kind == MediaKind::Any
            || self.kind == other.kind;
        let format = self.format == MediaFormat::Any
            || other.format == MediaFormat::Any
            || self.format == other.format;
        kind && format
    }
}

impl fmt::Display for MediaCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Any => "*",
        };
        let format = match self.format {
            MediaFormat::Raw => "raw",
            MediaFormat::Encoded => "encoded",
            MediaFormat::Any => "*",
        };
        write!(f, "{}/{}", kind, format)
    }
}

/// Whether a pad is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    Input,
    Output,
}

/// How a pad comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Created together with the node.
    Always,
    /// Announced by the node once it starts processing.
    Sometimes,
    /// Created on demand (compositor inputs).
    Request,
}

/// Static descriptor for a node's pad.
#[derive(Debug, Clone)]
pub struct PadTemplate {
    pub name: &'static str,
    pub direction: PadDirection,
    pub caps: MediaCaps,
}

impl PadTemplate {
    pub const fn input(name: &'static str, caps: MediaCaps) -> Self {
        Self {
            name,
            direction: PadDirection::Input,
            caps,
        }
    }

    pub const fn output(name: &'static str, caps: MediaCaps) -> Self {
        Self {
            name,
            direction: PadDirection::Output,
            caps,
        }
    }
}

/// Description of a pad announced by a producer at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadSpec {
    pub name: String,
    pub caps: MediaCaps,
}

impl PadSpec {
    pub fn new(name: impl Into<String>, caps: MediaCaps) -> Self {
        Self {
            name: name.into(),
            caps,
        }
    }
}

/// Read-only view of a registered pad.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadInfo {
    pub id: PadId,
    pub node: NodeId,
    pub name: String,
    pub direction: PadDirection,
    pub presence: PadPresence,
    pub caps: MediaCaps,
    /// The pad on the other end of this pad's link, if any.
    pub peer: Option<PadId>,
}

impl PadInfo {
    pub fn is_linked(&self) -> bool {
        self.peer.is_some()
    }
}
