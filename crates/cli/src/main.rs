mod config_commands;
mod memory_commands;
mod run;
mod subscriber_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "parlor", about = "Parlor, a character agent for group chats")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery in ./ and ~/.config/parlor/).
    #[arg(long, global = true, env = "PARLOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the configured channels and answer messages (default).
    Run,
    /// Inspect stored conversation memory.
    Memory {
        #[command(subcommand)]
        action: memory_commands::MemoryAction,
    },
    /// Manage show subscribers.
    Subscribers {
        #[command(subcommand)]
        action: subscriber_commands::SubscriberAction,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "parlor starting");

    let config = parlor_config::load(cli.config.as_deref())?;

    match cli.command {
        None | Some(Commands::Run) => run::run(config).await,
        Some(Commands::Memory { action }) => memory_commands::handle_memory(action, &config).await,
        Some(Commands::Subscribers { action }) => {
            subscriber_commands::handle_subscribers(action, &config).await
        },
        Some(Commands::Config { action }) => {
            config_commands::handle_config(action, cli.config.as_deref(), &config)
        },
    }
}
