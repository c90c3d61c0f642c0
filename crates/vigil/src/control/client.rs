use std::io;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::command::Command;
use super::server::READ_BUFFER_SIZE;

const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client side of the control channel.
///
/// Keeps one connection open across commands and reconnects once when a
/// send finds it broken.
pub struct ControlClient {
    address: String,
    stream: Option<TcpStream>,
    reply_timeout: Duration,
}

impl ControlClient {
    /// Connect to `address` (`host:port`).
    pub async fn connect(address: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(address);
        client.reconnect().await?;
        Ok(client)
    }

    /// Create a client without connecting; the first send connects.
    pub fn new(address: impl Into<String>) -> Self {
        Self { address: address.into(), stream: None, reply_timeout: DEFAULT_REPLY_TIMEOUT }
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Drop the current connection, if any, and open a new one.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.stream = None;
        let stream = TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("could not connect to {}", self.address))?;
        stream.set_nodelay(true)?;
        debug!(address = %self.address, "Connected to control server");
        self.stream = Some(stream);
        Ok(())
    }

    /// Send a parsed command and return the server's reply.
    pub async fn send_command(&mut self, command: &Command) -> Result<String> {
        self.send(&command.to_string()).await
    }

    /// Send a raw command string and return the server's reply.
    ///
    /// If the connection turns out to be broken the client reconnects and
    /// retries once; pause, resume and stop are idempotent so a replay is safe.
    pub async fn send(&mut self, command: &str) -> Result<String> {
        if !command.is_ascii() {
            return Err(anyhow!("commands must be ASCII"));
        }

        match self.round_trip(command).await {
            Ok(reply) => Ok(reply),
            Err(e) if is_connection_lost(&e) => {
                warn!(address = %self.address, "Connection lost ({}), reconnecting", e);
                self.reconnect().await?;
                Ok(self.round_trip(command).await?)
            }
            Err(e) => {
                self.stream = None;
                Err(e.into())
            }
        }
    }

    async fn round_trip(&mut self, command: &str) -> io::Result<String> {
        if self.stream.is_none() {
            self.stream = Some(TcpStream::connect(&self.address).await?);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };

        stream.write_all(command.as_bytes()).await?;

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let read = timeout(self.reply_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "no reply from server"))??;
        if read == 0 {
            self.stream = None;
            return Err(io::ErrorKind::UnexpectedEof.into());
        }

        Ok(String::from_utf8_lossy(&buf[..read]).into_owned())
    }
}

fn is_connection_lost(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_send_returns_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let read = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..read], b"PAUSE PING");
            stream.write_all(b"Command executed").await.unwrap();
        });

        let mut client = ControlClient::connect(address).await.unwrap();
        assert_eq!(client.send("PAUSE PING").await.unwrap(), "Command executed");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_reconnects_after_server_closed_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            // First connection is dropped without a reply
            let (first, _) = listener.accept().await.unwrap();
            drop(first);

            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let read = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..read], b"RESUME DNS");
            stream.write_all(b"Command executed").await.unwrap();
        });

        let mut client = ControlClient::connect(address).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.send("RESUME DNS").await.unwrap(), "Command executed");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_ascii_commands() {
        let mut client = ControlClient::new("127.0.0.1:9");
        assert!(client.send("PAUSE PÍNG").await.is_err());
        assert!(!client.is_connected());
    }
}
