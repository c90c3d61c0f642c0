use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use vigil::{Config, ControlClient};

use crate::console::Console;

/// Connect to every configured service; unreachable ones are retried on first use.
async fn connect_all(services: &BTreeMap<String, String>) -> BTreeMap<String, ControlClient> {
    let mut clients = BTreeMap::new();
    for (id, address) in services {
        match ControlClient::connect(address.clone()).await {
            Ok(client) => {
                println!("Connected to {id} at {address}");
                clients.insert(id.clone(), client);
            }
            Err(e) => {
                println!("Could not connect to {id}: {e:#}");
                clients.insert(id.clone(), ControlClient::new(address.clone()));
            }
        }
    }
    clients
}

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::from_config(config_path)?;
    if config.services.is_empty() {
        println!("No services configured under [services].");
        return Ok(());
    }

    let mut clients = connect_all(&config.services).await;
    let mut console = Console::new();

    loop {
        let Some(service_id) = console.ask("Enter service ID (or 'EXIT' to quit): ").await? else {
            break;
        };
        if service_id.eq_ignore_ascii_case("EXIT") {
            println!("Exiting client.");
            break;
        }

        let Some(client) = clients.get_mut(&service_id) else {
            let known: Vec<&str> = clients.keys().map(String::as_str).collect();
            println!("Unknown service {service_id}. Known services: {}", known.join(", "));
            continue;
        };

        let Some(command) = console.ask("Enter command (PAUSE, RESUME, SHUTDOWN): ").await? else {
            break;
        };

        match client.send(&crate::control::expand_all(&command)).await {
            Ok(reply) => println!("{service_id} response: {reply}"),
            Err(e) => println!("Connection lost with {service_id}: {e:#}"),
        }
    }

    Ok(())
}
