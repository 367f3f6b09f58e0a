//! Observation hooks for synthesis runs.

use std::path::PathBuf;

use crate::state::SynthesisState;

/// A state change reported to a [`StateObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: SynthesisState,
    /// Scratch directory at the time of the transition, once created.
    pub scratch: Option<PathBuf>,
}

/// Receives every state transition of a run.
///
/// Wraps a callback so callers (the CLI, tests) can follow progress without
/// the synthesizer knowing who is listening.
pub struct StateObserver {
    callback: Box<dyn Fn(&Transition) + Send + Sync>,
}

impl StateObserver {
    pub fn new(callback: impl Fn(&Transition) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// An observer that ignores everything.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_| {}),
        }
    }

    pub fn notify(&self, transition: &Transition) {
        (self.callback)(transition);
    }
}

impl std::fmt::Debug for StateObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateObserver").finish_non_exhaustive()
    }
}
