#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logger::init_tracing_with_level;
use tracing::level_filters::LevelFilter;
use vigil::ControlClient;

mod console;
mod control;
mod manage;

#[derive(Debug, Parser)]
#[command(version, about = "Pause, resume or shut down vigil probes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Mode>,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Interactive prompt against a single server (default)
    Control {
        #[arg(long, default_value = "127.0.0.1", env = "VIGIL_HOST")]
        host: String,
        #[arg(short, long, default_value_t = vigil::config::DEFAULT_PORT, env = "VIGIL_PORT")]
        port: u16,
    },
    /// Send one command and print the reply, e.g. `send PAUSE PING HTTP`
    Send {
        #[arg(long, default_value = "127.0.0.1", env = "VIGIL_HOST")]
        host: String,
        #[arg(short, long, default_value_t = vigil::config::DEFAULT_PORT, env = "VIGIL_PORT")]
        port: u16,
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Console over every service listed in the `[services]` config table
    Manage {
        #[arg(short, long, env = "VIGIL_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Prompts own the terminal; only surface warnings from the library
    init_tracing_with_level(LevelFilter::WARN);

    let mode = Cli::parse()
        .command
        .unwrap_or(Mode::Control { host: "127.0.0.1".into(), port: vigil::config::DEFAULT_PORT });

    match mode {
        Mode::Control { host, port } => control::run(format!("{host}:{port}")).await,
        Mode::Send { host, port, words } => {
            let mut client = ControlClient::connect(format!("{host}:{port}")).await?;
            let reply = client.send(&control::expand_all(&words.join(" "))).await?;
            println!("Server response: {reply}");
            Ok(())
        }
        Mode::Manage { config } => manage::run(config.as_deref()).await,
    }
}
