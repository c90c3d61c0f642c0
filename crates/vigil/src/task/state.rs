use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Run state of a periodic task.
///
/// `Stopped` is terminal: once reached, no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Running,
    Paused,
    Stopped,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Running => write!(f, "running"),
            TaskState::Paused => write!(f, "paused"),
            TaskState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State shared between a task's loop thread and its controllers.
///
/// Every transition happens under `state`, and every transition that may
/// release a parked loop notifies `wake` while still holding the lock, so a
/// wakeup cannot slip in between the loop's check and its wait.
#[derive(Debug)]
pub(crate) struct Control {
    state: Mutex<TaskState>,
    wake: Condvar,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(TaskState::Running), wake: Condvar::new() }
    }

    // The guarded value is a plain enum, a panic elsewhere cannot leave it torn.
    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> TaskState {
        *self.lock()
    }

    /// `Running -> Paused`. Returns whether the state changed.
    pub(crate) fn pause(&self) -> bool {
        let mut state = self.lock();
        if *state == TaskState::Running {
            *state = TaskState::Paused;
            true
        } else {
            false
        }
    }

    /// `Paused -> Running`, waking the parked loop. Returns whether the state changed.
    pub(crate) fn resume(&self) -> bool {
        let mut state = self.lock();
        if *state == TaskState::Paused {
            *state = TaskState::Running;
            self.wake.notify_all();
            true
        } else {
            false
        }
    }

    /// Any state `-> Stopped`, waking the loop whether it is parked or sleeping.
    /// Returns whether the state changed.
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.lock();
        if *state == TaskState::Stopped {
            return false;
        }
        *state = TaskState::Stopped;
        self.wake.notify_all();
        true
    }

    /// Park while paused. Returns the state that ended the wait, never
    /// `Paused`, and whether the caller actually parked.
    pub(crate) fn wait_while_paused(&self) -> (TaskState, bool) {
        let guard = self.lock();
        let parked = *guard == TaskState::Paused;
        let guard = self
            .wake
            .wait_while(guard, |state| *state == TaskState::Paused)
            .unwrap_or_else(PoisonError::into_inner);
        (*guard, parked)
    }

    /// Sleep for `interval`, cut short only by `stop()`. Returns the state afterwards.
    pub(crate) fn sleep(&self, interval: Duration) -> TaskState {
        let guard = self.lock();
        let (guard, _timeout) = self
            .wake
            .wait_timeout_while(guard, interval, |state| *state != TaskState::Stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
