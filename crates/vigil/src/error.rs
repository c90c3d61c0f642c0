use std::io::Error as IoError;
use std::net::SocketAddr;

use thiserror::Error;

/// Failures while loading, validating or persisting [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFailed(#[source] IoError),
    #[error("failed to write config file: {0}")]
    WriteFailed(#[source] IoError),
    #[error("failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid { field: field.into(), reason: reason.into() }
    }
}

/// Failures creating or tearing down a [`crate::task::PeriodicTask`].
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("failed to build runtime for task {name}: {source}")]
    Runtime {
        name: String,
        #[source]
        source: IoError,
    },
    #[error("failed to spawn thread for task {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: IoError,
    },
    #[error("task {0} needs a non-zero interval")]
    ZeroInterval(String),
    #[error("task {0} is registered more than once")]
    DuplicateTask(String),
    #[error("thread of task {0} panicked")]
    Panicked(String),
    #[error("probe {name} could not be built: {reason}")]
    Probe { name: String, reason: String },
}

/// Reasons a received command string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,
    #[error("{0} requires at least one target")]
    MissingTargets(String),
    #[error("unknown action {0}")]
    UnknownAction(String),
    #[error("command is not ASCII")]
    NotAscii,
}

/// Command server failures.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind control socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: IoError,
    },
    #[error("connection dropped: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0:#}")]
    Io(#[from] IoError),
}
