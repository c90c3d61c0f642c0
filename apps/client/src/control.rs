use anyhow::Result;
use vigil::task::registry::KNOWN_TARGETS;
use vigil::{Action, Command, ControlClient, Reply};

use crate::console::Console;

const INVALID_ACTION: &str = "Invalid action. Please enter one of PAUSE, RESUME, SHUTDOWN, or EXIT.";

/// Build a command from the two prompts, validating targets client-side.
///
/// `ALL` expands to every known target. Targets are optional for `SHUTDOWN`.
pub fn build_command(action: &str, targets: &str) -> Result<Command, String> {
    let action: Action = action.parse().map_err(|_| INVALID_ACTION.to_string())?;

    let targets: Vec<String> = if targets.trim().eq_ignore_ascii_case("ALL") {
        KNOWN_TARGETS.iter().map(|t| (*t).to_string()).collect()
    } else {
        targets.split_whitespace().map(str::to_ascii_uppercase).collect()
    };

    let all_known = targets.iter().all(|t| KNOWN_TARGETS.contains(&t.as_str()));
    if !all_known || (targets.is_empty() && action != Action::Shutdown) {
        return Err(format!("Invalid target(s). Valid targets are: {}", KNOWN_TARGETS.join(", ")));
    }

    Ok(Command::new(action, targets))
}

/// Expand a trailing `ALL` in a raw command line.
pub fn expand_all(line: &str) -> String {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(action), Some(all), None) if all.eq_ignore_ascii_case("ALL") => {
            format!("{} {}", action.to_ascii_uppercase(), KNOWN_TARGETS.join(" "))
        }
        _ => line.to_ascii_uppercase(),
    }
}

pub async fn run(address: String) -> Result<()> {
    let mut console = Console::new();
    let mut client = ControlClient::connect(address).await?;

    loop {
        let Some(action) = console
            .ask("Enter action (PAUSE, RESUME, SHUTDOWN, or EXIT to quit): ")
            .await?
        else {
            break;
        };
        if action.eq_ignore_ascii_case("EXIT") {
            println!("Exiting client.");
            break;
        }
        if action.parse::<Action>().is_err() {
            println!("{INVALID_ACTION}");
            continue;
        }

        let prompt = format!(
            "Enter target(s) ({}), separated by space, or ALL for every target: ",
            KNOWN_TARGETS.join(", ")
        );
        let Some(targets) = console.ask(&prompt).await? else {
            break;
        };

        let command = match build_command(&action, &targets) {
            Ok(command) => command,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match client.send_command(&command).await {
            Ok(reply) => {
                println!("Server response: {reply}");
                if Reply::from_wire(&reply) == Some(Reply::ShuttingDown) {
                    break;
                }
            }
            Err(e) => println!("Failed to send command: {e:#}"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_named_targets() {
        let command = build_command("pause", "ping http").unwrap();
        assert_eq!(command.to_string(), "PAUSE PING HTTP");
    }

    #[test]
    fn test_all_expands_client_side() {
        let command = build_command("RESUME", "all").unwrap();
        assert_eq!(command.to_string(), "RESUME PING HTTP HTTPS DNS");
    }

    #[test]
    fn test_unknown_or_missing_targets_are_rejected() {
        assert!(build_command("PAUSE", "PING FOO").is_err());
        assert!(build_command("PAUSE", "").is_err());
        assert!(build_command("JUMP", "PING").is_err());
    }

    #[test]
    fn test_shutdown_needs_no_targets() {
        assert_eq!(build_command("shutdown", "").unwrap().to_string(), "SHUTDOWN");
    }

    #[test]
    fn test_expand_all() {
        assert_eq!(expand_all("pause all"), "PAUSE PING HTTP HTTPS DNS");
        assert_eq!(expand_all("pause ping"), "PAUSE PING");
        assert_eq!(expand_all("shutdown"), "SHUTDOWN");
    }
}
