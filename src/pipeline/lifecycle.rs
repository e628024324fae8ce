//! Pipeline state machine.
//!
//! The pipeline moves `Null -> Ready -> Paused -> Playing` exactly once, and
//! falls back to `Null` exactly once during teardown. The current state is an
//! atomic so the dynamic linker can check it from dispatcher threads without
//! taking a lock.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::framework::MediaFramework;
use crate::pipeline::error::{PipelineError, PipelineResult};

/// Pipeline-wide processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PipelineState {
    Null = 0,
    Ready = 1,
    Paused = 2,
    Playing = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Ready,
            2 => PipelineState::Paused,
            3 => PipelineState::Playing,
            _ => PipelineState::Null,
        }
    }

    /// The next state on the way up, if any.
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Null => Some(PipelineState::Ready),
            PipelineState::Ready => Some(PipelineState::Paused),
            PipelineState::Paused => Some(PipelineState::Playing),
            PipelineState::Playing => None,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Null => "NULL",
            PipelineState::Ready => "READY",
            PipelineState::Paused => "PAUSED",
            PipelineState::Playing => "PLAYING",
        };
        f.write_str(name)
    }
}

/// Drives the framework through start-up and teardown.
pub struct LifecycleController {
    framework: Arc<dyn MediaFramework>,
    state: AtomicU8,
    started: AtomicBool,
    torn_down: AtomicBool,
}

impl LifecycleController {
    pub fn new(framework: Arc<dyn MediaFramework>) -> Self {
        Self {
            framework,
            state: AtomicU8::new(PipelineState::Null as u8),
            started: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Only `Playing` accepts dynamic link requests.
    pub fn is_playing(&self) -> bool {
        self.state() == PipelineState::Playing
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Step the framework up to `Playing`.
    ///
    /// Only valid once, from `Null`. The state reads `Playing` only after the
    /// framework has been asked for every intermediate state.
    pub fn start(&self) -> PipelineResult<()> {
        let current = self.state();
        if self.is_torn_down() || self.started.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::InvalidTransition {
                from: current,
                to: PipelineState::Playing,
            });
        }

        let mut state = current;
        while let Some(next) = state.next() {
            self.transition(state, next);
            state = next;
        }
        info!("Pipeline is {}", state);
        Ok(())
    }

    fn transition(&self, from: PipelineState, to: PipelineState) {
        debug!("Pipeline state {} -> {}", from, to);
        self.framework.set_state(to);
        self.state.store(to as u8, Ordering::Release);
    }

    /// Return the framework to `Null`, then run `release` for the resources
    /// the framework held on to.
    ///
    /// Returns `false` without doing anything if teardown already ran.
    pub fn teardown<F: FnOnce()>(&self, release: F) -> bool {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            debug!("Teardown already performed");
            return false;
        }

        let from = self.state();
        // Stop accepting link requests before the framework stops producing.
        self.state.store(PipelineState::Null as u8, Ordering::Release);
        debug!("Pipeline state {} -> {}", from, PipelineState::Null);
        self.framework.set_state(PipelineState::Null);
        release();
        info!("Pipeline torn down");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::MockMediaFramework;
    use mockall::Sequence;

    #[test]
    fn test_start_walks_every_state_in_order() {
        let mut framework = MockMediaFramework::new();
        let mut seq = Sequence::new();
        for state in [
            PipelineState::Ready,
            PipelineState::Paused,
            PipelineState::Playing,
        ] {
            framework
                .expect_set_state()
                .withf(move |s| *s == state)
                .times(1)
                .in_sequence(&mut seq)
                .return_const(());
        }

        let lifecycle = LifecycleController::new(Arc::new(framework));
        assert_eq!(lifecycle.state(), PipelineState::Null);
        lifecycle.start().unwrap();
        assert!(lifecycle.is_playing());
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut framework = MockMediaFramework::new();
        framework.expect_set_state().times(3).return_const(());

        let lifecycle = LifecycleController::new(Arc::new(framework));
        lifecycle.start().unwrap();
        let err = lifecycle.start().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                from: PipelineState::Playing,
                to: PipelineState::Playing
            }
        ));
    }

    #[test]
    fn test_teardown_runs_once() {
        let mut framework = MockMediaFramework::new();
        framework.expect_set_state().times(4).return_const(());

        let lifecycle = LifecycleController::new(Arc::new(framework));
        lifecycle.start().unwrap();

        let mut released = 0;
        assert!(lifecycle.teardown(|| released += 1));
        assert!(!lifecycle.teardown(|| released += 1));
        assert_eq!(released, 1);
        assert_eq!(lifecycle.state(), PipelineState::Null);
        assert!(!lifecycle.is_playing());
    }

    #[test]
    fn test_teardown_sets_null_before_release() {
        let mut framework = MockMediaFramework::new();
        framework
            .expect_set_state()
            .withf(|s| *s == PipelineState::Null)
            .times(1)
            .return_const(());

        let lifecycle = LifecycleController::new(Arc::new(framework));
        let mut state_during_release = None;
        lifecycle.teardown(|| state_during_release = Some(lifecycle.state()));
        assert_eq!(state_during_release, Some(PipelineState::Null));
    }

    #[test]
    fn test_start_after_teardown_is_rejected() {
        let mut framework = MockMediaFramework::new();
        framework.expect_set_state().times(1).return_const(());

        let lifecycle = LifecycleController::new(Arc::new(framework));
        lifecycle.teardown(|| {});
        assert!(lifecycle.start().is_err());
    }

    #[test]
    fn test_state_order() {
        assert!(PipelineState::Null < PipelineState::Ready);
        assert!(PipelineState::Paused < PipelineState::Playing);
        assert_eq!(PipelineState::Playing.next(), None);
        assert_eq!(PipelineState::Playing.to_string(), "PLAYING");
    }
}
