use anyhow::Result;
use clap::{Parser, Subcommand};
use lectern::api::{ChatClient, HttpBackend, RetryPolicy};
use lectern::commands;
use lectern::config::Config;
use lectern::ui;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lectern")]
#[command(version)]
#[command(about = "Chat with the AI teaching assistant from your terminal", long_about = None)]
struct Cli {
    /// Backend base URL (overrides config and LECTERN_BACKEND_URL)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Config file to use instead of ~/.lectern/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive chat (default)
    Chat,
    /// List past conversations
    List,
    /// Print a conversation transcript
    Show { id: String },
    /// Start a new conversation with a question
    Ask { text: String },
    /// Send a message to an existing conversation
    Send { id: String, text: String },
    /// Delete a conversation
    Delete { id: String },
    /// Show the effective configuration
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,
    },
}

/// Logs go to a file so they never draw over the chat screen. One-shot
/// commands fall back to stderr when the file cannot be opened.
fn init_logging(config: &Config, interactive: bool) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file = config.log_file().ok().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    match file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        None if !interactive => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
        None => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let mut config = Config::load(Some(&config_path))?;
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    let command = cli.command.unwrap_or(Commands::Chat);
    init_logging(&config, matches!(command, Commands::Chat));
    info!(backend = %config.backend_base(), "lectern starting");

    let backend = HttpBackend::new(&config)?;
    let client = ChatClient::new(Arc::new(backend), RetryPolicy::from(&config.retry));
    let mut out = io::stdout();

    match command {
        Commands::Chat => ui::run_chat(client, config.ui.clone()).await?,
        Commands::List => commands::list_conversations(&client, &mut out).await?,
        Commands::Show { id } => commands::show_conversation(&client, &id, &mut out).await?,
        Commands::Ask { text } => commands::ask(&client, &text, &mut out).await?,
        Commands::Send { id, text } => commands::send(&client, &id, &text, &mut out).await?,
        Commands::Delete { id } => commands::delete(&client, &id, &mut out).await?,
        Commands::Config { init } => commands::config(&config, &config_path, init, &mut out)?,
    }

    Ok(())
}
