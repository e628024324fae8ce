//! Mock construction helpers

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use pip_compositor::{
    framework::{BusMessage, MediaFramework, PadNotifier},
    pipeline::{NodeConfig, NodeId, NodeKind, PadInfo, PipelineState},
};

/// Calls observed by [`ScriptedFramework`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkCall {
    CreateNode(String),
    SetState(PipelineState),
    Link(String, String),
}

/// A framework that never produces anything on its own.
///
/// Tests post bus messages and pad announcements themselves, and inspect the
/// calls the pipeline made.
pub struct ScriptedFramework {
    bus_tx: Sender<BusMessage>,
    bus_rx: Receiver<BusMessage>,
    calls: Mutex<Vec<FrameworkCall>>,
    notifiers: Mutex<Vec<(NodeId, PadNotifier)>>,
    names: Mutex<Vec<(NodeId, String)>>,
}

impl ScriptedFramework {
    pub fn new() -> Self {
        let (bus_tx, bus_rx) = unbounded();
        Self {
            bus_tx,
            bus_rx,
            calls: Mutex::new(Vec::new()),
            notifiers: Mutex::new(Vec::new()),
            names: Mutex::new(Vec::new()),
        }
    }

    /// Post a message as if a node had sent it
    pub fn post(&self, message: BusMessage) {
        self.bus_tx.send(message).expect("bus receiver alive");
    }

    pub fn calls(&self) -> Vec<FrameworkCall> {
        self.calls.lock().clone()
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FrameworkCall::SetState(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Notifier handed to `producer` at build time
    pub fn notifier(&self, producer: NodeId) -> Option<PadNotifier> {
        self.notifiers
            .lock()
            .iter()
            .find(|(id, _)| *id == producer)
            .map(|(_, n)| n.clone())
    }

    fn name(&self, id: NodeId) -> String {
        self.names
            .lock()
            .iter()
            .find(|(n, _)| *n == id)
            .map(|(_, name)| name.clone())
            .unwrap_or_default()
    }
}

impl Default for ScriptedFramework {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaFramework for ScriptedFramework {
    fn create_node(
        &self,
        id: NodeId,
        _kind: NodeKind,
        name: &str,
        _config: &NodeConfig,
    ) -> Result<(), String> {
        self.names.lock().push((id, name.to_string()));
        self.calls
            .lock()
            .push(FrameworkCall::CreateNode(name.to_string()));
        Ok(())
    }

    fn connect_pad_added(&self, producer: NodeId, notifier: PadNotifier) {
        self.notifiers.lock().push((producer, notifier));
    }

    fn link_pads(&self, from: &PadInfo, to: &PadInfo) {
        let call = FrameworkCall::Link(
            format!("{}:{}", self.name(from.node), from.name),
            format!("{}:{}", self.name(to.node), to.name),
        );
        self.calls.lock().push(call);
    }

    fn set_state(&self, state: PipelineState) {
        self.calls.lock().push(FrameworkCall::SetState(state));
    }

    fn bus(&self) -> Receiver<BusMessage> {
        self.bus_rx.clone()
    }
}
