//! captag CLI - batch image captioning with a tag classifier and a
//! vision-language model.
//!
//! captag walks a file or directory of images and writes one caption file
//! per image per model: a comma-separated tag list from a WD tagger and/or a
//! natural-language caption from an Ollama or OpenAI-compatible server.
//!
//! # Usage
//!
//! ```bash
//! # Tag a directory
//! captag run ./images
//!
//! # Tag, then caption with the tags in the prompt
//! captag run ./images --method both --provider ollama
//!
//! # Manage models
//! captag models download
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// captag - batch image captioning with tagger and vision-language models.
#[derive(Parser, Debug)]
#[command(name = "captag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "CAPTAG_CONFIG")]
    config: Option<PathBuf>,

    /// Also write the run log to a timestamped file
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Tag and/or caption images
    Run(cli::run::RunArgs),

    /// Manage tagger models (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(captag_core::Config::default_path);

    // Logging isn't initialized yet, so use eprintln for config warnings.
    // A broken config is fatal when it was asked for explicitly or when
    // images are about to be written.
    let strict = cli.config.is_some() || matches!(cli.command, Commands::Run(_));
    let loaded = if config_path.exists() {
        captag_core::Config::load_from(&config_path)
    } else if cli.config.is_some() && !matches!(cli.command, Commands::Config(_)) {
        anyhow::bail!("Config file not found: {}", config_path.display());
    } else {
        Ok(captag_core::Config::default())
    };
    let config = match loaded {
        Ok(config) => config,
        Err(e) if strict => {
            return Err(e).with_context(|| format!("Failed to load {}", config_path.display()));
        }
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `captag config path`."
            );
            captag_core::Config::default()
        }
    };

    let log_file = match &cli.command {
        Commands::Run(args) if cli.log_file || config.logging.save_logs => {
            let caption_dir = args.caption_dir.clone().or_else(|| config.caption_dir());
            Some(logging::log_file_path(
                &args.input,
                &[config.logging.log_dir.as_deref(), caption_dir.as_deref()],
                &logging::log_timestamp(),
            ))
        }
        _ => None,
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs, log_file.as_deref())?;

    tracing::debug!("captag v{}", captag_core::VERSION);

    match cli.command {
        Commands::Run(args) => cli::run::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, &config_path).await,
    }
}
