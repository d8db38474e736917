//! Interactive control menu.

use crate::commands;
use colored::Colorize;
use pinlink_client::Client;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::net::SocketAddr;

const HELP_TEXT: &str = r#"
Available commands:
  help                Show this help
  status              Show connection state and last pattern
  sequence, seq       Run the scripted output test sequence
  pattern <bits>      Set the raw bit-pattern (decimal, 0b... or 0x...)
  on <index>          Turn one output on
  off <index>         Turn one output off
  all-off, clear      Turn every output off
  reconnect           Close and re-establish the connection
  quit, exit          Exit
"#;

pub async fn run(client: Client, addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "pinlink control".bold().cyan());
    println!("Connecting to {}...", addr);

    client.connect().await?;
    println!("{}", "Connected!".green());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".pinlink_history"))
        .unwrap_or_else(|_| ".pinlink_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "pinlink>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&client, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break, // Exit command
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    client: &Client,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "status" => Ok(Some(format!(
            "connected: {}, last pattern: {:#06b}",
            if client.is_connected() {
                "yes".green()
            } else {
                "no".red()
            },
            client.last_pattern()
        ))),

        "sequence" | "seq" => {
            commands::run_sequence(client).await?;
            Ok(Some(String::new()))
        }

        "pattern" | "p" => {
            if args.is_empty() {
                return Ok(Some("Usage: pattern <bits>".to_string()));
            }
            let pattern = crate::parse_pattern(args[0])?;
            client.set_pattern_with_retry(pattern).await?;
            Ok(Some(format!("{} pattern {:#06b}", "applied".green(), pattern)))
        }

        "on" => {
            if args.is_empty() {
                return Ok(Some("Usage: on <index>".to_string()));
            }
            let index: u8 = args[0].parse()?;
            let pattern = client.last_pattern() | 1u32 << index;
            client.set_pattern_with_retry(pattern).await?;
            Ok(Some(format!("{} output {}", "on".green(), index)))
        }

        "off" => {
            if args.is_empty() {
                return Ok(Some("Usage: off <index>".to_string()));
            }
            let index: u8 = args[0].parse()?;
            let pattern = client.last_pattern() & !(1u32 << index);
            client.set_pattern_with_retry(pattern).await?;
            Ok(Some(format!("{} output {}", "off".yellow(), index)))
        }

        "all-off" | "clear" => {
            client.set_pattern_with_retry(0).await?;
            Ok(Some(format!("{}", "all outputs off".yellow())))
        }

        "reconnect" => {
            client.close().await;
            client.connect().await?;
            Ok(Some("Reconnected.".green().to_string()))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}
