#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use vigil::{CommandServer, Config, TaskRegistry};

mod error;

use error::AppError;
use logger::init_tracing;

/// Run the probes and serve the control socket until SHUTDOWN or Ctrl-C.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file, created with defaults when missing
    #[arg(short, long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the control socket bind address
    #[arg(long, env = "VIGIL_BIND")]
    bind: Option<String>,

    /// Override the control socket port
    #[arg(short, long, env = "VIGIL_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!("\n{config}");

    run_server(config).await
}

fn load_config(args: &Args) -> Result<Config, AppError> {
    let mut config = Config::from_config(args.config.as_deref())?;

    if let Some(bind) = &args.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    config.validate()?;
    Ok(config)
}

async fn run_server(config: Config) -> Result<(), AppError> {
    let registry = Arc::new(TaskRegistry::from_config(&config.probes)?);
    info!(tasks = ?registry.names().collect::<Vec<_>>(), "Probes started");

    let server = CommandServer::bind(config.server.socket_addr()?, registry.clone()).await?;
    server.run_until(shutdown_signal()).await?;

    // Wait for in-flight checks to finish before exiting
    tokio::task::spawn_blocking(move || registry.join_all()).await??;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C, only SHUTDOWN will stop the server: {}", e);
        std::future::pending::<()>().await;
    }
}
