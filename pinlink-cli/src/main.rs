//! pinlink-cli - Command-line control client for pinlink
//!
//! Provides both one-shot commands and an interactive menu.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use pinlink_client::{Client, ConnectionConfig, RetryPolicy};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pinlink-cli")]
#[command(about = "Command-line control client for the pinlink output server")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:50002", env = "PINLINK_SERVER")]
    server: SocketAddr,

    /// Maximum reconnect attempts for a failed send
    #[arg(long, default_value_t = 3, env = "PINLINK_RETRIES")]
    retries: u32,

    /// Delay between reconnect attempts, in milliseconds
    #[arg(long, default_value_t = 1000, env = "PINLINK_RETRY_DELAY_MS")]
    retry_delay_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive menu
    Menu,

    /// Set the raw output bit-pattern (bit i drives output i, LSB first)
    Pattern {
        /// Pattern value; decimal, or binary/hex with 0b/0x prefix
        #[arg(value_parser = parse_pattern)]
        bits: u32,
    },

    /// Turn one output on
    On {
        /// Output index, 0-based
        index: u8,
    },

    /// Turn one output off
    Off {
        /// Output index, 0-based
        index: u8,
    },

    /// Turn every output off
    AllOff,

    /// Run the scripted output test sequence
    Sequence,
}

/// Parses a pattern in decimal, or binary/hex with a 0b/0x prefix.
fn parse_pattern(s: &str) -> Result<u32, String> {
    let parsed = if let Some(bits) = s.strip_prefix("0b") {
        u32::from_str_radix(bits, 2)
    } else if let Some(hex) = s.strip_prefix("0x") {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid pattern {:?}: {}", s, e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConnectionConfig::new(cli.server).with_retry(RetryPolicy {
        max_attempts: cli.retries,
        delay: Duration::from_millis(cli.retry_delay_ms),
    });
    let client = Client::new(config);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => repl::run(client, cli.server).await?,
        command => {
            client.connect().await?;
            commands::execute(&client, command).await?;
            client.close().await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern() {
        assert_eq!(parse_pattern("3").unwrap(), 3);
        assert_eq!(parse_pattern("0b11").unwrap(), 0b11);
        assert_eq!(parse_pattern("0x0f").unwrap(), 15);
        assert!(parse_pattern("0bxyz").is_err());
        assert!(parse_pattern("banana").is_err());
    }
}
