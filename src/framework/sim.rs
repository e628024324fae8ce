//! Simulated media framework.
//!
//! Stands in for a real media stack so the compositor can be run and tested
//! without decoders or a display. Each source URI is backed by a
//! [`SimSource`] script describing which pads appear, when, and how the
//! stream ends.
//!
//! # URI resolution
//!
//! - URIs registered with [`SimFramework::with_source`] use their script.
//! - `sim://name?key=value&...` builds a script from the query:
//!   `duration_ms`, `audio` (decoder also exposes an audio pad),
//!   `repeat` (every pad is announced twice) and `error` (the source fails
//!   with the given message).
//! - `file://path` resolves when the path exists.
//! - Anything else fails at start-up with an error on the bus.
//!
//! # Threads
//!
//! Entering `Playing` spawns one thread per source. It announces the
//! source's pads after `discover_delay`. Once the source pad is linked to a
//! decoder, a decoder thread announces the decoded pads after
//! `decode_delay` and plays for `duration`. When every chain has finished
//! the bus receives end-of-stream. Returning to `Null` stops and joins every
//! thread.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::{BusMessage, MediaFramework, PadAdded, PadNotifier};
use crate::pipeline::id::NodeId;
use crate::pipeline::lifecycle::PipelineState;
use crate::pipeline::node_kind::NodeKind;
use crate::pipeline::pad::{MediaCaps, PadInfo, PadSpec};
use crate::pipeline::registry::NodeConfig;

/// Script for one simulated source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSource {
    /// Pads the source announces once the container is parsed.
    pub source_pads: Vec<PadSpec>,
    /// Pads the decoder announces once the codec is known.
    pub decoder_pads: Vec<PadSpec>,
    pub discover_delay: Duration,
    pub decode_delay: Duration,
    /// Playback time after the decoder starts.
    pub duration: Duration,
    /// Announce every pad twice.
    pub repeat_announcements: bool,
    /// Fail with this message instead of announcing pads.
    pub error: Option<String>,
}

impl Default for SimSource {
    fn default() -> Self {
        Self {
            source_pads: vec![PadSpec::new("src_0", MediaCaps::VIDEO_ENCODED)],
            decoder_pads: vec![PadSpec::new("src_0", MediaCaps::VIDEO_RAW)],
            discover_delay: Duration::from_millis(5),
            decode_delay: Duration::from_millis(5),
            duration: Duration::from_millis(300),
            repeat_announcements: false,
            error: None,
        }
    }
}

impl SimSource {
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Replace the decoder's pads.
    pub fn with_decoder_pads(mut self, pads: Vec<PadSpec>) -> Self {
        self.decoder_pads = pads;
        self
    }

    /// Add an audio pad next to the decoder's video pad.
    pub fn with_audio(mut self) -> Self {
        let index = self.decoder_pads.len();
        self.decoder_pads
            .push(PadSpec::new(format!("src_{}", index), MediaCaps::AUDIO_RAW));
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat_announcements = true;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Build a script from the query part of a `sim://` URI.
    fn from_query(rest: &str) -> Self {
        let mut script = SimSource::default();
        let Some((_, query)) = rest.split_once('?') else {
            return script;
        };
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, "true"));
            let enabled = !matches!(value, "0" | "false" | "no");
            match key {
                "duration_ms" => match value.parse::<u64>() {
                    Ok(ms) => script.duration = Duration::from_millis(ms),
                    Err(_) => warn!("Ignoring bad duration_ms '{}'", value),
                },
                "audio" if enabled => script = script.with_audio(),
                "repeat" => script.repeat_announcements = enabled,
                "error" => script.error = Some(value.replace('+', " ")),
                _ => trace!("Ignoring sim URI parameter '{}'", key),
            }
        }
        script
    }
}

#[derive(Debug, Clone)]
struct SimNode {
    kind: NodeKind,
    name: String,
    uri: Option<String>,
}

/// Threads and stop signal of the current `Playing` period.
#[derive(Default)]
struct Runtime {
    stop_tx: Option<Sender<()>>,
    stop_rx: Option<Receiver<()>>,
    threads: Vec<JoinHandle<()>>,
    /// Per source: set once a thread has taken responsibility for ending the chain.
    claims: HashMap<NodeId, Arc<AtomicBool>>,
}

struct Shared {
    scripts: Mutex<HashMap<String, SimSource>>,
    unavailable: Mutex<Vec<NodeKind>>,
    nodes: Mutex<HashMap<NodeId, SimNode>>,
    notifiers: Mutex<HashMap<NodeId, PadNotifier>>,
    bus_tx: Sender<BusMessage>,
    bus_rx: Receiver<BusMessage>,
    state: Mutex<PipelineState>,
    state_log: Mutex<Vec<PipelineState>>,
    link_log: Mutex<Vec<(String, String)>>,
    active_chains: AtomicUsize,
    terminal_posted: AtomicBool,
    runtime: Mutex<Runtime>,
}

impl Shared {
    fn resolve(&self, uri: &str) -> Result<SimSource, String> {
        if let Some(script) = self.scripts.lock().get(uri) {
            return Ok(script.clone());
        }
        if let Some(rest) = uri.strip_prefix("sim://") {
            return Ok(SimSource::from_query(rest));
        }
        if let Some(path) = uri.strip_prefix("file://") {
            if Path::new(path).exists() {
                return Ok(SimSource::default());
            }
            return Err(format!("Could not resolve URI '{}': no such file", uri));
        }
        Err(format!("Could not resolve URI '{}': unsupported scheme", uri))
    }

    fn node(&self, id: NodeId) -> Option<SimNode> {
        self.nodes.lock().get(&id).cloned()
    }

    fn announce(&self, producer: NodeId, pad: &PadSpec) {
        let notifier = self.notifiers.lock().get(&producer).cloned();
        match notifier {
            Some(tx) => {
                trace!("Announcing pad '{}' on {:?}", pad.name, producer);
                if tx.send(PadAdded {
                    producer,
                    pad: pad.clone(),
                })
                .is_err()
                {
                    trace!("No listener for pads of {:?}", producer);
                }
            }
            None => trace!("No pad-added subscriber for {:?}", producer),
        }
    }

    fn post_terminal(&self, message: BusMessage) {
        if self.terminal_posted.swap(true, Ordering::AcqRel) {
            trace!("Terminal message already posted, dropping {:?}", message);
            return;
        }
        let _ = self.bus_tx.send(message);
    }

    fn fail(&self, source: &str, message: String, debug: Option<String>) {
        debug!("Simulated failure in {}: {}", source, message);
        self.post_terminal(BusMessage::Error {
            source: Some(source.to_string()),
            message,
            debug,
        });
    }

    fn finish_chain(&self, name: &str) {
        debug!("Simulated chain {} reached end of stream", name);
        if self.active_chains.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.post_terminal(BusMessage::EndOfStream);
        }
    }

    fn start_streaming(self: &Arc<Self>) {
        let sources: Vec<(NodeId, SimNode)> = self
            .nodes
            .lock()
            .iter()
            .filter(|(_, n)| n.kind == NodeKind::Source)
            .map(|(id, n)| (*id, n.clone()))
            .collect();

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let mut runtime = self.runtime.lock();
        runtime.stop_tx = Some(stop_tx);
        runtime.stop_rx = Some(stop_rx.clone());
        self.active_chains.store(sources.len(), Ordering::Release);
        if sources.is_empty() {
            self.post_terminal(BusMessage::EndOfStream);
            return;
        }

        for (id, node) in sources {
            let uri = node.uri.clone().unwrap_or_default();
            let script = self.resolve(&uri);
            let claim = Arc::new(AtomicBool::new(false));
            runtime.claims.insert(id, claim.clone());

            let shared = self.clone();
            let stop = stop_rx.clone();
            let name = node.name.clone();
            let spawned = thread::Builder::new()
                .name(format!("sim-{}", node.name))
                .spawn(move || source_thread(&shared, id, &name, script, &stop, &claim));
            match spawned {
                Ok(handle) => runtime.threads.push(handle),
                Err(e) => self.fail(&node.name, format!("cannot start streaming thread: {}", e), None),
            }
        }
    }

    fn start_decoding(self: &Arc<Self>, source: NodeId, decoder: NodeId) {
        let (Some(source_node), Some(decoder_node)) = (self.node(source), self.node(decoder)) else {
            return;
        };
        let Ok(script) = self.resolve(source_node.uri.as_deref().unwrap_or_default()) else {
            return;
        };

        let mut runtime = self.runtime.lock();
        let Some(stop) = runtime.stop_rx.clone() else {
            trace!("Not streaming, decoder {} stays idle", decoder_node.name);
            return;
        };
        let Some(claim) = runtime.claims.get(&source).cloned() else {
            return;
        };
        if claim.swap(true, Ordering::AcqRel) {
            trace!("Chain of {} already ended", source_node.name);
            return;
        }

        let shared = self.clone();
        let name = decoder_node.name.clone();
        let spawned = thread::Builder::new()
            .name(format!("sim-{}", decoder_node.name))
            .spawn(move || decoder_thread(&shared, decoder, &name, &script, &stop));
        match spawned {
            Ok(handle) => runtime.threads.push(handle),
            Err(e) => self.fail(
                &decoder_node.name,
                format!("cannot start decoding thread: {}", e),
                None,
            ),
        }
    }

    fn stop_streaming(&self) {
        let threads = {
            let mut runtime = self.runtime.lock();
            runtime.stop_tx = None;
            runtime.stop_rx = None;
            runtime.claims.clear();
            std::mem::take(&mut runtime.threads)
        };
        let count = threads.len();
        for handle in threads {
            if handle.join().is_err() {
                warn!("Simulated streaming thread panicked");
            }
        }
        if count > 0 {
            debug!("Joined {} simulated streaming threads", count);
        }
    }
}

/// Wait for `delay`. Returns `true` if the stop signal fired first.
fn stopped(stop: &Receiver<()>, delay: Duration) -> bool {
    !matches!(stop.recv_timeout(delay), Err(RecvTimeoutError::Timeout))
}

fn source_thread(
    shared: &Shared,
    id: NodeId,
    name: &str,
    script: Result<SimSource, String>,
    stop: &Receiver<()>,
    claim: &AtomicBool,
) {
    let script = match script {
        Ok(script) => script,
        Err(message) => {
            shared.fail(name, message, Some(format!("{} could not open its URI", name)));
            return;
        }
    };
    if stopped(stop, script.discover_delay) {
        return;
    }
    if let Some(message) = &script.error {
        shared.fail(name, message.clone(), None);
        return;
    }

    let rounds = if script.repeat_announcements { 2 } else { 1 };
    for _ in 0..rounds {
        for pad in &script.source_pads {
            shared.announce(id, pad);
        }
    }

    // Nobody took the stream over: end the chain here.
    if stopped(stop, script.duration) {
        return;
    }
    if !claim.swap(true, Ordering::AcqRel) {
        shared.finish_chain(name);
    }
}

fn decoder_thread(
    shared: &Shared,
    id: NodeId,
    name: &str,
    script: &SimSource,
    stop: &Receiver<()>,
) {
    if stopped(stop, script.decode_delay) {
        return;
    }
    let rounds = if script.repeat_announcements { 2 } else { 1 };
    for _ in 0..rounds {
        for pad in &script.decoder_pads {
            shared.announce(id, pad);
        }
    }
    if stopped(stop, script.duration) {
        return;
    }
    shared.finish_chain(name);
}

/// Script-driven [`MediaFramework`].
pub struct SimFramework {
    shared: Arc<Shared>,
}

impl Default for SimFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl SimFramework {
    pub fn new() -> Self {
        let (bus_tx, bus_rx) = crossbeam_channel::unbounded();
        Self {
            shared: Arc::new(Shared {
                scripts: Mutex::new(HashMap::new()),
                unavailable: Mutex::new(Vec::new()),
                nodes: Mutex::new(HashMap::new()),
                notifiers: Mutex::new(HashMap::new()),
                bus_tx,
                bus_rx,
                state: Mutex::new(PipelineState::Null),
                state_log: Mutex::new(Vec::new()),
                link_log: Mutex::new(Vec::new()),
                active_chains: AtomicUsize::new(0),
                terminal_posted: AtomicBool::new(false),
                runtime: Mutex::new(Runtime::default()),
            }),
        }
    }

    /// Use `script` for `uri`.
    pub fn with_source(self, uri: impl Into<String>, script: SimSource) -> Self {
        self.shared.scripts.lock().insert(uri.into(), script);
        self
    }

    /// Make node creation fail for `kind`.
    pub fn without_factory(self, kind: NodeKind) -> Self {
        self.shared.unavailable.lock().push(kind);
        self
    }

    /// Every state requested so far, in order.
    pub fn states(&self) -> Vec<PipelineState> {
        self.shared.state_log.lock().clone()
    }

    /// `(node:pad, node:pad)` pairs the framework was told about.
    pub fn linked(&self) -> Vec<(String, String)> {
        self.shared.link_log.lock().clone()
    }

    /// Whether streaming threads are still alive.
    pub fn is_streaming(&self) -> bool {
        self.shared.runtime.lock().stop_tx.is_some()
    }
}

impl MediaFramework for SimFramework {
    fn create_node(
        &self,
        id: NodeId,
        kind: NodeKind,
        name: &str,
        config: &NodeConfig,
    ) -> Result<(), String> {
        if self.shared.unavailable.lock().contains(&kind) {
            return Err(format!("no element \"{}\"", kind.factory_name()));
        }
        if kind == NodeKind::Source && config.uri.is_none() {
            return Err("source nodes need a URI".to_string());
        }
        trace!("Created {} '{}' as {:?}", kind.factory_name(), name, id);
        self.shared.nodes.lock().insert(
            id,
            SimNode {
                kind,
                name: name.to_string(),
                uri: config.uri.clone(),
            },
        );
        Ok(())
    }

    fn connect_pad_added(&self, producer: NodeId, notifier: PadNotifier) {
        self.shared.notifiers.lock().insert(producer, notifier);
    }

    fn link_pads(&self, from: &PadInfo, to: &PadInfo) {
        let (Some(out_node), Some(in_node)) = (self.shared.node(from.node), self.shared.node(to.node))
        else {
            warn!("Link between unknown nodes {:?} -> {:?}", from.node, to.node);
            return;
        };
        self.shared.link_log.lock().push((
            format!("{}:{}", out_node.name, from.name),
            format!("{}:{}", in_node.name, to.name),
        ));
        if out_node.kind == NodeKind::Source && in_node.kind == NodeKind::Decoder {
            self.shared.start_decoding(from.node, to.node);
        }
    }

    fn set_state(&self, state: PipelineState) {
        let from = std::mem::replace(&mut *self.shared.state.lock(), state);
        self.shared.state_log.lock().push(state);
        let _ = self
            .shared
            .bus_tx
            .send(BusMessage::StateChanged { from, to: state });

        match state {
            PipelineState::Playing if from != PipelineState::Playing => {
                self.shared.start_streaming()
            }
            PipelineState::Null => self.shared.stop_streaming(),
            _ => {}
        }
    }

    fn bus(&self) -> Receiver<BusMessage> {
        self.shared.bus_rx.clone()
    }
}

impl Drop for SimFramework {
    fn drop(&mut self) {
        self.shared.stop_streaming();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::id::PadId;
    use crate::pipeline::pad::{PadDirection, PadPresence};

    fn wait_terminal(bus: &Receiver<BusMessage>) -> BusMessage {
        loop {
            let message = bus
                .recv_timeout(Duration::from_secs(2))
                .expect("no terminal message");
            if message.is_terminal() {
                return message;
            }
        }
    }

    fn pad_info(node: NodeId, name: &str, direction: PadDirection) -> PadInfo {
        PadInfo {
            id: PadId::new(node, 0),
            node,
            name: name.to_string(),
            direction,
            presence: PadPresence::Sometimes,
            caps: MediaCaps::ANY,
            peer: None,
        }
    }

    #[test]
    fn test_sim_query_parsing() {
        let script = SimSource::from_query("pip?duration_ms=250&audio=1&repeat");
        assert_eq!(script.duration, Duration::from_millis(250));
        assert_eq!(script.decoder_pads.len(), 2);
        assert_eq!(script.decoder_pads[1].caps, MediaCaps::AUDIO_RAW);
        assert!(script.repeat_announcements);

        let failing = SimSource::from_query("x?error=Internal+data+stream+error");
        assert_eq!(failing.error.as_deref(), Some("Internal data stream error"));
    }

    #[test]
    fn test_resolve_schemes() {
        let sim = SimFramework::new();
        assert!(sim.shared.resolve("sim://anything").is_ok());
        assert!(sim.shared.resolve("http://example.invalid/a.mp4").is_err());
        assert!(sim.shared.resolve("file:///definitely/not/here.mp4").is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        let uri = format!("file://{}", file.path().display());
        assert!(sim.shared.resolve(&uri).is_ok());
    }

    #[test]
    fn test_unavailable_factory() {
        let sim = SimFramework::new().without_factory(NodeKind::Mixer);
        let err = sim
            .create_node(NodeId(0), NodeKind::Mixer, "mixer", &NodeConfig::default())
            .unwrap_err();
        assert!(err.contains("compositor"));
        assert!(sim
            .create_node(NodeId(1), NodeKind::Sink, "out", &NodeConfig::default())
            .is_ok());
    }

    #[test]
    fn test_source_needs_uri() {
        let sim = SimFramework::new();
        assert!(sim
            .create_node(NodeId(0), NodeKind::Source, "src", &NodeConfig::default())
            .is_err());
    }

    #[test]
    fn test_unresolvable_uri_posts_error() {
        let sim = SimFramework::new();
        sim.create_node(
            NodeId(0),
            NodeKind::Source,
            "main-source",
            &NodeConfig::with_uri("bogus://nowhere"),
        )
        .unwrap();
        let bus = sim.bus();
        sim.set_state(PipelineState::Playing);

        match wait_terminal(&bus) {
            BusMessage::Error {
                source, message, ..
            } => {
                assert_eq!(source.as_deref(), Some("main-source"));
                assert!(message.contains("Could not resolve URI"));
            }
            other => panic!("unexpected {:?}", other),
        }
        sim.set_state(PipelineState::Null);
        assert!(!sim.is_streaming());
    }

    #[test]
    fn test_source_announces_and_decoder_finishes_chain() {
        let sim = SimFramework::new();
        let source = NodeId(0);
        let decoder = NodeId(1);
        sim.create_node(
            source,
            NodeKind::Source,
            "src",
            &NodeConfig::with_uri("sim://a?duration_ms=200"),
        )
        .unwrap();
        sim.create_node(decoder, NodeKind::Decoder, "dec", &NodeConfig::default())
            .unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        sim.connect_pad_added(source, tx.clone());
        sim.connect_pad_added(decoder, tx);
        let bus = sim.bus();
        sim.set_state(PipelineState::Playing);

        let announced = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(announced.producer, source);
        assert_eq!(announced.pad.caps, MediaCaps::VIDEO_ENCODED);

        sim.link_pads(
            &pad_info(source, "src_0", PadDirection::Output),
            &pad_info(decoder, "sink", PadDirection::Input),
        );
        let decoded = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(decoded.producer, decoder);
        assert_eq!(decoded.pad.caps, MediaCaps::VIDEO_RAW);

        assert_eq!(wait_terminal(&bus), BusMessage::EndOfStream);
        sim.set_state(PipelineState::Null);
        assert_eq!(
            sim.linked(),
            vec![("src:src_0".to_string(), "dec:sink".to_string())]
        );
    }

    #[test]
    fn test_null_stops_long_streams() {
        let sim = SimFramework::new().with_source(
            "sim://long",
            SimSource::default().with_duration(Duration::from_secs(60)),
        );
        sim.create_node(
            NodeId(0),
            NodeKind::Source,
            "src",
            &NodeConfig::with_uri("sim://long"),
        )
        .unwrap();
        sim.set_state(PipelineState::Playing);
        assert!(sim.is_streaming());

        let started = std::time::Instant::now();
        sim.set_state(PipelineState::Null);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!sim.is_streaming());
        assert_eq!(
            sim.states(),
            vec![PipelineState::Playing, PipelineState::Null]
        );
    }
}
