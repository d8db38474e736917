//! One-shot command execution.

use crate::Commands;
use colored::Colorize;
use pinlink_client::{Client, ClientError};
use std::time::Duration;

/// The scripted output test, in the order the patterns are applied.
const TEST_SEQUENCE: &[(u32, &str)] = &[
    (0b00, "all outputs off"),
    (0b01, "output 0 on"),
    (0b10, "output 1 on"),
    (0b11, "both outputs on"),
];

/// Executes a one-shot command against a connected client.
pub async fn execute(client: &Client, command: Commands) -> Result<(), ClientError> {
    match command {
        Commands::Pattern { bits } => set_pattern(client, bits).await,
        Commands::On { index } => {
            let pattern = client.last_pattern() | 1u32 << index;
            set_pattern(client, pattern).await
        }
        Commands::Off { index } => {
            let pattern = client.last_pattern() & !(1u32 << index);
            set_pattern(client, pattern).await
        }
        Commands::AllOff => set_pattern(client, 0).await,
        Commands::Sequence => run_sequence(client).await,
        Commands::Menu => unreachable!("menu is handled in main"),
    }
}

/// Sends one pattern with reconnect-on-failure and reports the outcome.
pub async fn set_pattern(client: &Client, pattern: u32) -> Result<(), ClientError> {
    client.set_pattern_with_retry(pattern).await?;
    println!("{} pattern {:#06b}", "applied".green(), pattern);
    Ok(())
}

/// Runs the scripted test sequence, one pattern per second.
pub async fn run_sequence(client: &Client) -> Result<(), ClientError> {
    for &(pattern, description) in TEST_SEQUENCE {
        println!("{} {}", "testing:".cyan(), description);
        client.set_pattern_with_retry(pattern).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    println!("{}", "sequence complete".green());
    Ok(())
}
