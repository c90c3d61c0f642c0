use thiserror::Error;
use tokio::task::JoinError;
use vigil::error::{ConfigError, ServerError, TaskError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
    #[error("{0:#}")]
    Server(#[from] ServerError),
    #[error("Background join failed: {0}")]
    Join(#[from] JoinError),
}
