//! CLI entry point for ragchat.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use dotenvy::dotenv;

mod client;
mod commands;
mod config;
mod error_taxonomy;
mod logging;
mod models;
mod session;
mod transcript;
mod ui;
mod utils;

use crate::client::RagClient;
use crate::config::Config;
use crate::session::Session;

#[derive(Parser, Debug)]
#[command(
    name = "ragchat",
    author,
    version,
    about = "Chat with a retrieval-augmented DeepSeek-R1 service",
    long_about = "Terminal client for a RAG chat service.\n\n\
        Run 'ragchat' to start chatting, or 'ragchat upload <file.pdf>' to give the \
        service a document to answer from."
)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Send a one-shot prompt (non-interactive)
    #[arg(short, long)]
    prompt: Option<String>,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Config profile name
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Model to start with (must be one of the configured models)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Base URL of the RAG service
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Upload a PDF document to the service
    Upload {
        /// PDF file to upload
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List configured models
    Models,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Some(Commands::Completions { shell }) = cli.command {
        generate_completions(shell);
        return Ok(());
    }

    let config = load_config_from_cli(&cli)?;

    match cli.command.clone() {
        Some(Commands::Models) => {
            let catalog = config.catalog()?;
            ui::print_models(&catalog, &catalog.default_model());
            Ok(())
        }
        Some(Commands::Upload { file }) => {
            let session = build_session(&config)?;
            ui::run_upload(session, &utils::expand_path(&file.to_string_lossy())).await
        }
        Some(Commands::Completions { .. }) => Ok(()),
        None => {
            let session = build_session(&config)?;
            match cli.prompt.as_deref() {
                Some(prompt) => ui::run_prompt(session, prompt).await,
                None => ui::run_interactive(session, &config.base_url()).await,
            }
        }
    }
}

fn load_config_from_cli(cli: &Cli) -> Result<Config> {
    let profile = cli
        .profile
        .clone()
        .or_else(|| std::env::var("RAGCHAT_PROFILE").ok());
    Config::load(cli.config.clone(), profile.as_deref())?
        .with_overrides(cli.base_url.clone(), cli.model.clone())
}

fn build_session(config: &Config) -> Result<Session> {
    let client = RagClient::new(&config.client_settings())?;
    Ok(Session::new(Arc::new(client), config.session_settings()?))
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
