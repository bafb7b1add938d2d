use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{prelude::*, reload, EnvFilter};

use gembridge_core::config::{load_config, LoggingConfig};

mod cli;

use cli::{Cli, Commands};

/// `RUST_LOG` wins over the `[logging]` section
fn env_directives() -> Option<String> {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn config_filter(logging: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_new(logging.filter_directives())
        .with_context(|| format!("Invalid [logging] level {:?}", logging.level))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging with defaults so config loading is visible, then
    // apply the [logging] section once it is known.
    let env_override = env_directives();
    let startup = match &env_override {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {} value {:?}", EnvFilter::DEFAULT_ENV, directives))?,
        None => config_filter(&LoggingConfig::default())?,
    };
    let (filter, reload_handle) = reload::Layer::new(startup);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let loaded = load_config(cli.config)?;
    if env_override.is_none() {
        reload_handle.reload(config_filter(&loaded.config.logging)?)?;
    }

    match cli.command {
        Commands::Start { port } => {
            cli::commands::start::run(loaded.config, port).await?;
        }
        Commands::Status => {
            cli::commands::status::run(&loaded).await?;
        }
        Commands::Translate { file, model, stream } => {
            cli::commands::translate::run(&loaded.config, file, model, stream)?;
        }
    }

    Ok(())
}
