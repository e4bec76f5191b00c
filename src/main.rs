// ABOUTME: Entry point for cofounder, a terminal client for the AI co-founder chat service.
// ABOUTME: Parses CLI args, loads env files and config, sets up file logging, and launches the app.

use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cofounder::app::{App, LaunchOptions};
use cofounder::config::{BASE_URL_ENV, Config, DASHBOARD_URL_ENV};

/// Environment variable controlling the log filter (e.g. `debug`, `cofounder=trace`).
const LOG_ENV: &str = "COFOUNDER_LOG";

/// AI Co-founder: your startup success partner, in the terminal.
#[derive(Parser)]
#[command(name = "cofounder", version)]
#[command(about = "Chat with the AI co-founder through a seven-step startup roadmap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Launch URL carrying a `sid` query parameter
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Session id to exchange for tokens (replaces any stored one)
    #[arg(long)]
    sid: Option<String>,

    /// Backend base URL
    #[arg(long, value_name = "URL", env = BASE_URL_ENV)]
    base_url: Option<String>,

    /// Dashboard to send users to when no session can be established
    #[arg(long, value_name = "URL", env = DASHBOARD_URL_ENV)]
    dashboard_url: Option<String>,

    /// Keep credentials and the draft in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat (default if no command specified)
    Chat,
    /// Forget stored tokens and session id
    Logout,
}

fn init_logging() {
    let path = Config::log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    // The TUI owns the terminal, so logs only go to the file.
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load local .env if present, then the user's secrets file.
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(Config::secrets_env_path());

    // Parse after the env files so clap's `env` fallbacks can see them.
    let cli = Cli::parse();
    init_logging();

    let mut config = Config::load()?;
    config.apply_env();
    config.apply_overrides(cli.base_url, cli.dashboard_url);

    let app = App::new(
        config,
        LaunchOptions {
            launch_url: cli.url,
            sid: cli.sid,
            ephemeral: cli.ephemeral,
        },
    );

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => app.run().await,
        Commands::Logout => app.logout(),
    }
}
