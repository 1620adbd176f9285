use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RunState {
    Idle,
    Running,
    CancelRequested,
}

/// Shared handle on the state of one batch run.
///
/// The orchestrator moves it through `Idle -> Running -> Idle`; anyone
/// holding a clone may ask for cancellation, which the orchestrator honours
/// at the next job boundary.
#[derive(Clone, Debug)]
pub struct RunControl {
    state: Arc<Mutex<RunState>>,
}

impl Default for RunControl {
    fn default() -> Self {
        RunControl::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        RunControl {
            state: Arc::new(Mutex::new(RunState::Idle)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        // the state is a plain enum, a poisoned lock still holds a usable value
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> RunState {
        *self.lock()
    }

    /// Idle -> Running. Returns false if a run is already in progress.
    pub fn begin(&self) -> bool {
        let mut state = self.lock();
        match *state {
            RunState::Idle => {
                *state = RunState::Running;
                true
            },
            _ => false,
        }
    }

    /// Running -> CancelRequested; ignored otherwise.
    pub fn request_cancel(&self) {
        let mut state = self.lock();
        if *state == RunState::Running {
            *state = RunState::CancelRequested;
        }
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.state() == RunState::CancelRequested
    }

    pub fn finish(&self) {
        *self.lock() = RunState::Idle;
    }
}
