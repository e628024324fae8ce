//! Test data builders for creating test objects

use std::sync::Arc;

use pip_compositor::{
    config::PipConfig,
    framework::{MediaFramework, PadAdded},
    pipeline::{MediaCaps, NodeId, PadSpec, Pipeline, PipelineBuilder, PipelineNodeIds},
};

/// How long simulated streams play in integration runs. Long enough that
/// every announced pad is dispatched before the chain ends.
pub const STREAM_MS: u64 = 300;

/// A `sim://` URI that plays for [`STREAM_MS`], plus any extra query flags.
pub fn sim_uri(name: &str, flags: &str) -> String {
    if flags.is_empty() {
        format!("sim://{}?duration_ms={}", name, STREAM_MS)
    } else {
        format!("sim://{}?duration_ms={}&{}", name, STREAM_MS, flags)
    }
}

/// Builder for creating test configurations
pub struct ConfigBuilder {
    config: PipConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        let mut config = PipConfig::default();
        config.main.uri = sim_uri("main", "");
        config.pip.uri = sim_uri("pip", "");
        Self { config }
    }

    pub fn main_uri(mut self, uri: &str) -> Self {
        self.config.main.uri = uri.to_string();
        self
    }

    pub fn pip_uri(mut self, uri: &str) -> Self {
        self.config.pip.uri = uri.to_string();
        self
    }

    pub fn max_inputs(mut self, max_inputs: usize) -> Self {
        self.config.mixer.max_inputs = max_inputs;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.dispatch.workers = workers;
        self
    }

    pub fn build(self) -> PipConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the standard graph on `framework`
pub fn build_pipeline(
    config: PipConfig,
    framework: Arc<dyn MediaFramework>,
) -> (Pipeline, PipelineNodeIds) {
    PipelineBuilder::new(config)
        .build(framework)
        .expect("pipeline should build")
}

/// Pad announcement with the caps a source exposes
pub fn source_pad(producer: NodeId, name: &str) -> PadAdded {
    PadAdded {
        producer,
        pad: PadSpec::new(name, MediaCaps::VIDEO_ENCODED),
    }
}

/// Pad announcement with the caps a decoder exposes for video
pub fn decoded_video_pad(producer: NodeId, name: &str) -> PadAdded {
    PadAdded {
        producer,
        pad: PadSpec::new(name, MediaCaps::VIDEO_RAW),
    }
}

/// Pad announcement for a decoded audio stream
pub fn decoded_audio_pad(producer: NodeId, name: &str) -> PadAdded {
    PadAdded {
        producer,
        pad: PadSpec::new(name, MediaCaps::AUDIO_RAW),
    }
}

/// Every announcement the standard graph needs to become fully linked
pub fn full_announcements(ids: &PipelineNodeIds) -> Vec<PadAdded> {
    let mut events = Vec::new();
    for chain in &ids.chains {
        events.push(source_pad(chain.source, "src_0"));
        events.push(decoded_video_pad(chain.decoder, "src_0"));
    }
    events
}
