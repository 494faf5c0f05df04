mod args;

use args::{Cli, Commands};
use clap::Parser;
use kubo_plugin::{LifecycleEvent, OutputMode, PluginConfig, PluginServer, Router};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = PluginConfig::load()?;
    init_tracing(&config.log_level);

    let command = cli.command.unwrap_or(Commands::Serve);
    // One-shot runs exit right after spawning, so nothing would be left to drain pipes.
    let output = match command {
        Commands::Serve => OutputMode::Capture,
        _ => OutputMode::Inherit,
    };
    let router = Router::from_config(&config, output)?;

    match command {
        Commands::Serve => PluginServer::new(Arc::new(router)).run_stdio().await?,
        Commands::Manifest => {
            println!("{}", serde_json::to_string_pretty(&router.manifest())?);
        }
        Commands::Hook { event, args } => {
            let event = LifecycleEvent::parse(&event, args)?;
            router.handle_event(&event).await?;
        }
        Commands::Command { name, args } => router.execute_command(&name, &args).await?,
        Commands::Resolve => router.resolve().await?,
    }

    Ok(())
}

/// Logs go to stderr; stdout carries protocol frames.
fn init_tracing(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
