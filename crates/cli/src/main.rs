//! gdpilot CLI: the main entry point.
//!
//! Commands:
//! - `chat`    : Interactive chat or single-message mode
//! - `config`  : Show, query and edit settings
//! - `tools`   : List the tools offered to the model
//! - `doctor`  : Diagnose the setup

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "gdpilot",
    about = "gdpilot: an LLM assistant for Godot projects",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Attach an image (png, jpg, webp, gif) to the first message
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List the tools offered to the model
    Tools,

    /// Diagnose configuration and project health
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Print one setting
    Get { key: String },
    /// Change one setting and save
    Set { key: String, value: String },
    /// Write a default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message, image } => commands::chat::run(message, image).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Path => commands::config_cmd::path()?,
            ConfigAction::Get { key } => commands::config_cmd::get(&key)?,
            ConfigAction::Set { key, value } => commands::config_cmd::set(&key, &value)?,
            ConfigAction::Init => commands::config_cmd::init()?,
        },
        Commands::Tools => commands::tools::run()?,
        Commands::Doctor => commands::doctor::run()?,
    }

    Ok(())
}
