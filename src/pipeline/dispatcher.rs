//! Worker pool that drains pad announcements into the dynamic linker.
//!
//! Announcements arrive on a crossbeam channel from whichever framework
//! thread discovered the pad. A small fixed pool of workers receives from the
//! shared channel, so announcements from both chains can be linked
//! concurrently. Workers exit when the shutdown sender is dropped or every
//! notifier is gone.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::framework::PadAdded;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::linker::{DynamicLinker, LinkOutcome};

/// Default number of dispatcher workers.
pub const DEFAULT_WORKERS: usize = 2;

pub struct LinkDispatcher {
    shutdown: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl LinkDispatcher {
    /// Spawn `workers` threads (at least one) receiving from `events`.
    pub fn start(
        linker: Arc<DynamicLinker>,
        events: Receiver<PadAdded>,
        workers: usize,
    ) -> PipelineResult<Self> {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let mut dispatcher = Self {
            shutdown: Some(shutdown_tx),
            workers: Vec::with_capacity(workers.max(1)),
        };

        for index in 0..workers.max(1) {
            let linker = linker.clone();
            let events = events.clone();
            let shutdown = shutdown_rx.clone();
            // On spawn failure `dispatcher` drops here and joins what started.
            let handle = thread::Builder::new()
                .name(format!("pad-linker-{}", index))
                .spawn(move || worker_loop(index, &linker, &events, &shutdown))?;
            dispatcher.workers.push(handle);
        }

        debug!("Link dispatcher started with {} workers", dispatcher.workers.len());
        Ok(dispatcher)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Signal every worker and wait for them to finish.
    pub fn stop(&mut self) {
        if self.shutdown.take().is_none() {
            return;
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Link dispatcher worker panicked");
            }
        }
        debug!("Link dispatcher stopped");
    }
}

impl Drop for LinkDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    index: usize,
    linker: &DynamicLinker,
    events: &Receiver<PadAdded>,
    shutdown: &Receiver<()>,
) {
    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => dispatch(index, linker, &event),
                Err(_) => break,
            },
            recv(shutdown) -> _ => break,
        }
    }
    trace!("Link dispatcher worker {} exiting", index);
}

fn dispatch(index: usize, linker: &DynamicLinker, event: &PadAdded) {
    trace!(
        "Worker {} handling pad '{}' from {:?}",
        index,
        event.pad.name,
        event.producer
    );
    match linker.handle(event) {
        Ok(LinkOutcome::Linked(_)) | Ok(LinkOutcome::AlreadyLinked) => {}
        // Already logged and recorded by the linker.
        Err(PipelineError::DynamicLink(_)) => {}
        Err(e) => warn!("Dropped pad announcement '{}': {}", event.pad.name, e),
    }
}
