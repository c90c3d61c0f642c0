use std::future::{Future, pending};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use super::command::{Action, Command, Reply};
use crate::error::{ProtocolError, ServerError};
use crate::task::TaskRegistry;

/// Upper bound of a single command; one read is one command.
pub const READ_BUFFER_SIZE: usize = 1024;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How a control session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Session {
    Closed,
    Shutdown,
}

/// Apply `command` to the registry and pick the reply.
///
/// Unknown targets are skipped without affecting the reply. `SHUTDOWN`
/// stops every task whatever targets it carries.
pub fn dispatch(registry: &TaskRegistry, command: &Command) -> Reply {
    match command.action {
        Action::Pause | Action::Resume => {
            for target in &command.targets {
                let Some(task) = registry.lookup(target) else {
                    debug!(target = %target, "Ignoring unknown target");
                    continue;
                };
                if command.action == Action::Pause {
                    task.pause();
                } else {
                    task.resume();
                }
            }
            Reply::Executed
        }
        Action::Shutdown => {
            if !command.targets.is_empty() {
                debug!(targets = ?command.targets, "SHUTDOWN targets ignored, stopping every task");
            }
            registry.stop_all();
            Reply::ShuttingDown
        }
    }
}

/// Plaintext TCP command server controlling a [`TaskRegistry`].
///
/// Serves one connection at a time; commands within a connection are applied
/// in order. The listener is closed once `SHUTDOWN` has been processed.
pub struct CommandServer {
    listener: TcpListener,
    registry: Arc<TaskRegistry>,
}

impl CommandServer {
    /// Bind the control socket. Failing to bind is fatal for the server.
    pub async fn bind(addr: SocketAddr, registry: Arc<TaskRegistry>) -> Result<Self, ServerError> {
        let listener =
            TcpListener::bind(addr).await.map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Serve until a client sends `SHUTDOWN`.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(pending()).await
    }

    /// Serve until a client sends `SHUTDOWN` or `signal` resolves. Either way
    /// every task is stopped and the listener is closed on return.
    pub async fn run_until<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Server listening on {}", self.local_addr()?);

        tokio::select! {
            () = self.accept_loop() => {}
            () = signal => {
                info!("Shutdown signal received");
                self.registry.stop_all();
            }
        }

        info!("Command server stopped");
        Ok(())
    }

    async fn accept_loop(&self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept control connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            info!(peer = %peer, "Connected");
            match self.serve(stream).await {
                Ok(Session::Shutdown) => {
                    info!(peer = %peer, "Shutdown requested");
                    return;
                }
                Ok(Session::Closed) => info!(peer = %peer, "Connection closed"),
                Err(e) => warn!(peer = %peer, "Connection ended: {}", e),
            }
        }
    }

    async fn serve(&self, mut stream: TcpStream) -> Result<Session, ServerError> {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let read = stream.read(&mut buf).await?;
            if read == 0 {
                return Ok(Session::Closed);
            }

            let reply = match Command::decode(&buf[..read]) {
                Ok(command) => {
                    info!(command = %command, "Received command");
                    dispatch(&self.registry, &command)
                }
                Err(ProtocolError::NotAscii) => return Err(ProtocolError::NotAscii.into()),
                Err(e) => {
                    debug!("Rejected command: {}", e);
                    Reply::Invalid
                }
            };

            stream.write_all(reply.as_bytes()).await?;

            if reply == Reply::ShuttingDown {
                // The peer may already be gone, the reply was best effort
                let _ = stream.shutdown().await;
                return Ok(Session::Shutdown);
            }
        }
    }
}
