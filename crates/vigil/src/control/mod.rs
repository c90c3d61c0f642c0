//! Plaintext control channel: command protocol, server and client.

pub mod client;
pub mod command;
pub mod server;

pub use client::ControlClient;
pub use command::{Action, Command, Reply};
pub use server::{CommandServer, dispatch};
