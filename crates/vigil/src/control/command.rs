//! Wire format of the control channel.
//!
//! A request is one ASCII string `<ACTION> <TARGET>[ <TARGET>...]`, a reply
//! is one of three fixed ASCII strings. There is no framing beyond one read
//! per command.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Pause,
    Resume,
    Shutdown,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Pause => "PAUSE",
            Action::Resume => "RESUME",
            Action::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PAUSE" => Ok(Action::Pause),
            "RESUME" => Ok(Action::Resume),
            "SHUTDOWN" => Ok(Action::Shutdown),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }
}

/// A parsed request. Targets are upper-cased; `SHUTDOWN` ignores them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub targets: Vec<String>,
}

impl Command {
    pub fn new<I, S>(action: Action, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            action,
            targets: targets.into_iter().map(|t| t.as_ref().to_ascii_uppercase()).collect(),
        }
    }

    /// Parse a decoded request.
    ///
    /// `PAUSE` and `RESUME` need at least one target. `SHUTDOWN` is accepted
    /// on its own as it always applies to every task.
    pub fn parse(input: &str) -> Result<Self, ProtocolError> {
        let mut tokens = input.split_whitespace();
        let action: Action = tokens.next().ok_or(ProtocolError::Empty)?.parse()?;
        let command = Self::new(action, tokens);

        if command.targets.is_empty() && action != Action::Shutdown {
            return Err(ProtocolError::MissingTargets(action.to_string()));
        }
        Ok(command)
    }

    /// Decode raw bytes from the socket, rejecting anything that is not ASCII.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if !bytes.is_ascii() {
            return Err(ProtocolError::NotAscii);
        }
        // ASCII is always valid UTF-8
        let input = std::str::from_utf8(bytes).map_err(|_| ProtocolError::NotAscii)?;
        Self::parse(input)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action.as_str())?;
        for target in &self.targets {
            write!(f, " {target}")?;
        }
        Ok(())
    }
}

/// The three replies the server ever sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Executed,
    ShuttingDown,
    Invalid,
}

impl Reply {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reply::Executed => "Command executed",
            Reply::ShuttingDown => "Server shutting down",
            Reply::Invalid => "Invalid command",
        }
    }

    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    /// Recognize a reply read back by a client.
    pub fn from_wire(reply: &str) -> Option<Self> {
        match reply.trim() {
            "Command executed" => Some(Reply::Executed),
            "Server shutting down" => Some(Reply::ShuttingDown),
            "Invalid command" => Some(Reply::Invalid),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
