//! Blocking wait for the first terminal bus message.

use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

use crate::framework::BusMessage;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A node reported an error.
    Failure {
        message: String,
        debug: Option<String>,
        source: Option<String>,
    },
    /// Every stream reached its end.
    EndOfStream,
}

impl TerminalEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self, TerminalEvent::Failure { .. })
    }
}

impl std::fmt::Display for TerminalEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminalEvent::EndOfStream => f.write_str("end of stream"),
            TerminalEvent::Failure {
                message, source, ..
            } => match source {
                Some(source) => write!(f, "error from {}: {}", source, message),
                None => write!(f, "error: {}", message),
            },
        }
    }
}

/// Owns a bus receiver until the pipeline reaches a terminal condition.
pub struct EventMonitor {
    bus: Receiver<BusMessage>,
}

impl EventMonitor {
    pub fn new(bus: Receiver<BusMessage>) -> Self {
        Self { bus }
    }

    /// Block until an error or end-of-stream arrives.
    ///
    /// Non-terminal messages are logged and skipped. Consumes the monitor so
    /// the terminal event is observed once.
    pub fn wait_terminal(self) -> TerminalEvent {
        loop {
            let message = match self.bus.recv() {
                Ok(message) => message,
                Err(_) => {
                    error!("Message bus closed before a terminal message");
                    return TerminalEvent::Failure {
                        message: "message bus closed before end-of-stream".to_string(),
                        debug: None,
                        source: None,
                    };
                }
            };

            match message {
                BusMessage::Error {
                    source,
                    message,
                    debug: debug_info,
                } => {
                    error!(
                        "Error received from element {}: {}",
                        source.as_deref().unwrap_or("<unknown>"),
                        message
                    );
                    error!(
                        "Debugging information: {}",
                        debug_info.as_deref().unwrap_or("none")
                    );
                    return TerminalEvent::Failure {
                        message,
                        debug: debug_info,
                        source,
                    };
                }
                BusMessage::EndOfStream => {
                    info!("End-Of-Stream reached");
                    return TerminalEvent::EndOfStream;
                }
                BusMessage::StateChanged { from, to } => {
                    debug!("Bus: state changed {} -> {}", from, to);
                }
                BusMessage::Warning { source, message } => {
                    warn!(
                        "Warning from {}: {}",
                        source.as_deref().unwrap_or("<unknown>"),
                        message
                    );
                }
            }
        }
    }
}
