pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gembridge")]
#[command(author, version, about = "Gemini API bridge - serve Gemini clients from an OpenAI-compatible backend")]
pub struct Cli {
    /// Path to config file (checked in order: local config.toml, ~/.config/gembridge/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Start {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show proxy status
    Status,

    /// Print the backend payload a Gemini request file translates to
    Translate {
        /// Path to a generateContent request body (JSON)
        file: PathBuf,

        /// Client-facing model name
        #[arg(short, long, default_value = "gemini-2.5-pro")]
        model: String,

        /// Translate as streamGenerateContent
        #[arg(long)]
        stream: bool,
    },
}
