//! Pausable, stoppable periodic tasks.
//!
//! A [`PeriodicTask`] owns one [`Checker`] and runs it on a dedicated OS
//! thread, once per interval, until stopped. Checks run on a private
//! single-threaded tokio runtime so a slow probe never holds the state lock
//! and never competes with the command server's runtime.

pub mod registry;
mod state;

pub use registry::TaskRegistry;
pub use state::TaskState;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, info};

use crate::error::TaskError;
use crate::monitoring::{Checker, execute_check, report};
use state::Control;

/// One recurring probe running on its own thread.
pub struct PeriodicTask {
    name: String,
    interval: Duration,
    control: Arc<Control>,
    checks: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Start `checker` immediately in the `Running` state.
    ///
    /// The name is normalized to upper case; it is the target name used by
    /// the control protocol. A zero `interval` is rejected.
    pub fn spawn(
        name: impl Into<String>,
        interval: Duration,
        checker: Arc<dyn Checker>,
    ) -> Result<Self, TaskError> {
        let name = name.into().to_ascii_uppercase();
        if interval.is_zero() {
            return Err(TaskError::ZeroInterval(name));
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| TaskError::Runtime { name: name.clone(), source })?;

        let control = Arc::new(Control::new());
        let checks = Arc::new(AtomicU64::new(0));

        let worker = Worker {
            name: name.clone(),
            interval,
            control: Arc::clone(&control),
            checks: Arc::clone(&checks),
            checker,
            runtime,
        };

        let handle = thread::Builder::new()
            .name(format!("vigil-{}", name.to_ascii_lowercase()))
            .spawn(move || worker.run())
            .map_err(|source| TaskError::Spawn { name: name.clone(), source })?;

        info!(task = %name, interval = ?interval, "Started periodic task");

        Ok(Self { name, interval, control, checks, handle: Mutex::new(Some(handle)) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    /// Number of checks that have run to completion so far.
    pub fn checks_completed(&self) -> u64 {
        self.checks.load(Ordering::Acquire)
    }

    /// Skip future cycles. An in-flight check still completes.
    pub fn pause(&self) {
        if self.control.pause() {
            info!(task = %self.name, "Task paused");
        }
    }

    pub fn resume(&self) {
        if self.control.resume() {
            info!(task = %self.name, "Task resumed");
        }
    }

    /// Stop for good. Safe to call any number of times.
    pub fn stop(&self) {
        if self.control.stop() {
            info!(task = %self.name, "Task stopping");
        }
    }

    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the loop thread to exit. Call [`stop`](Self::stop) first or
    /// this blocks for as long as the task runs.
    pub fn join(&self) -> Result<(), TaskError> {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        match handle {
            Some(handle) => handle.join().map_err(|_| TaskError::Panicked(self.name.clone())),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.control.stop();
    }
}

/// The loop side of a task, moved onto its thread.
struct Worker {
    name: String,
    interval: Duration,
    control: Arc<Control>,
    checks: Arc<AtomicU64>,
    checker: Arc<dyn Checker>,
    runtime: Runtime,
}

impl Worker {
    fn run(self) {
        loop {
            match self.control.wait_while_paused() {
                (TaskState::Stopped, _) => break,
                // Back from a pause: wait a full interval before checking again
                (_, true) => match self.control.sleep(self.interval) {
                    TaskState::Stopped => break,
                    TaskState::Paused => continue,
                    TaskState::Running => {}
                },
                _ => {}
            }

            self.run_check();

            if self.control.sleep(self.interval) == TaskState::Stopped {
                break;
            }
        }
        info!(task = %self.name, checks = self.checks.load(Ordering::Acquire), "Task stopped");
    }

    /// Run the check without holding the state lock. A panicking checker is
    /// contained by the spawned future and logged.
    fn run_check(&self) {
        let checker = Arc::clone(&self.checker);
        let probe = self.name.clone();

        let outcome = self.runtime.block_on(async move {
            tokio::spawn(async move { execute_check(&probe, checker.as_ref()).await }).await
        });

        match outcome {
            Ok(result) => report(&result),
            Err(e) => error!(task = %self.name, "Check aborted: {}", e),
        }

        let total = self.checks.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(task = %self.name, checks = total, "Cycle finished");
    }
}
