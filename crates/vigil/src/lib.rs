//! Vigil - control plane for periodic health-check probes
//!
//! Each probe (reachability ping, HTTP, HTTPS, DNS) runs as a
//! [`PeriodicTask`] on its own thread and schedule. A [`CommandServer`]
//! accepts a plaintext control connection and pauses, resumes or shuts down
//! the tasks of a [`TaskRegistry`] by name.

pub mod config;
pub mod control;
pub mod error;
pub mod monitoring;
pub mod task;

pub use config::Config;
pub use control::{Action, Command, CommandServer, ControlClient, Reply};
pub use task::{PeriodicTask, TaskRegistry, TaskState};
