//! Subcommand implementations

use anyhow::{Context, Result};
use parley_common::{ParleyConfig, Reply, Resolver};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// The remote backend's blocking HTTP client must be built outside the
/// async runtime, so resolvers are created before entering it.
pub fn build_resolver(config: &ParleyConfig) -> Result<Resolver> {
    Resolver::from_config(config).context("Failed to initialize the response engine")
}

pub fn show_config(config: &ParleyConfig) -> Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_reply(reply: &Reply) {
    println!("{}", reply.text);
    if let Some(sentiment) = reply.sentiment {
        println!("   [{}]", sentiment.label());
    }
}

pub async fn ask(resolver: &Resolver, message: &str, sender: &str, json: bool) -> Result<()> {
    let reply = resolver.handle(message, sender).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        print_reply(&reply);
    }
    Ok(())
}

pub async fn chat(resolver: &Resolver, sender: &str) -> Result<()> {
    println!("Parley v{} ({}). Type 'exit' to quit.", crate::VERSION, resolver.mode());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            println!();
            break;
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let reply = resolver.handle(message, sender).await;
        debug!("Reply source: {}", reply.source.as_str());
        print_reply(&reply);
    }

    Ok(())
}
