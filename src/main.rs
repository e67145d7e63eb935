mod dashboard;
mod render;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use litedesk_core::api::admin::AdminAction;
use litedesk_core::config::{self, Config};
use litedesk_core::desk::Desk;

#[derive(Parser)]
#[command(
    name = "litedesk",
    about = format!("{} litedesk - LiteLLM admin, chat and balance console", litedesk_core::LOGO),
    version = litedesk_core::VERSION,
)]
struct Cli {
    /// Read defaults from this JSON file instead of ~/.litedesk/config.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive dashboard (default)
    Dashboard,
    /// Show the effective configuration
    Status,
    /// Look up or create users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Manage API keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },
    /// Log in to the billing endpoint and show the balance
    Login,
    /// Show the balance using the cached token
    Balance,
    /// Send one chat message
    Chat {
        /// Message to send
        message: Vec<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Dashboard => "dashboard",
            Commands::Status => "status",
            Commands::User { .. } => "user",
            Commands::Key { .. } => "key",
            Commands::Login => "login",
            Commands::Balance => "balance",
            Commands::Chat { .. } => "chat",
        }
    }
}

#[derive(Subcommand)]
enum UserCommands {
    /// Check that a user exists
    Info { user_id: String },
    /// Create a user in the default team
    Create {
        user_id: String,
        /// Display alias
        #[arg(short, long, default_value = "")]
        alias: String,
        /// Budget in USD (default from config)
        #[arg(short, long)]
        max_budget: Option<f64>,
    },
}

#[derive(Subcommand)]
enum KeyCommands {
    /// List a user's keys
    List { user_id: String },
    /// Generate a key for a user
    Generate {
        user_id: String,
        /// Key alias (default from config)
        #[arg(short, long)]
        alias: Option<String>,
        /// Budget in USD (default from config)
        #[arg(short, long)]
        max_budget: Option<f64>,
    },
    /// Disable a key
    Disable { key: String },
    /// Delete a key
    Delete { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("litedesk=info".parse()?)
                .add_directive("litedesk_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::get_config_path);
    let cfg = config::load_config_from_env(Some(config_path.as_path()));

    let command = cli.command.unwrap_or(Commands::Dashboard);
    info!(command = command.name(), proxy = %cfg.connection.base_url, "Starting litedesk");

    match command {
        Commands::Dashboard => dashboard::run(Desk::new(cfg)).await?,
        Commands::Status => cmd_status(&cfg, &config_path),
        Commands::User { command } => {
            let action = match command {
                UserCommands::Info { user_id } => AdminAction::CheckUser { user_id },
                UserCommands::Create {
                    user_id,
                    alias,
                    max_budget,
                } => AdminAction::CreateUser {
                    user_id,
                    user_alias: alias,
                    max_budget: max_budget.unwrap_or(cfg.admin.user_budget),
                },
            };
            cmd_admin(cfg, action).await;
        }
        Commands::Key { command } => {
            let action = match command {
                KeyCommands::List { user_id } => AdminAction::ListKeys { user_id },
                KeyCommands::Generate {
                    user_id,
                    alias,
                    max_budget,
                } => AdminAction::GenerateKey {
                    user_id,
                    key_alias: alias.unwrap_or_else(|| cfg.admin.key_alias.clone()),
                    max_budget: max_budget.unwrap_or(cfg.admin.key_budget),
                },
                KeyCommands::Disable { key } => AdminAction::DisableKey { key },
                KeyCommands::Delete { key } => AdminAction::DeleteKey { key },
            };
            cmd_admin(cfg, action).await;
        }
        Commands::Login => cmd_login(cfg).await,
        Commands::Balance => cmd_balance(cfg).await,
        Commands::Chat { message } => cmd_chat(cfg, message.join(" ")).await,
    }

    Ok(())
}

// ====== Commands ======

async fn cmd_admin(cfg: Config, action: AdminAction) {
    let desk = Desk::new(cfg);
    dashboard::handle_admin(&desk, &action).await;
}

async fn cmd_login(cfg: Config) {
    let mut desk = Desk::new(cfg);
    dashboard::handle(&mut desk, dashboard::Command::Login).await;
}

async fn cmd_balance(cfg: Config) {
    let mut desk = Desk::new(cfg);
    match render::with_spinner("Loading balance", desk.start()).await {
        Some(outcome) => render::balance_outcome(&outcome),
        None => render::warning("No token cached. Run `litedesk login` or set BALANCE_TOKEN."),
    }
}

async fn cmd_chat(cfg: Config, message: String) {
    let mut desk = Desk::new(cfg);
    dashboard::handle(&mut desk, dashboard::Command::Chat(message)).await;

    if desk.has_pending_refresh() {
        if let Some(outcome) = render::with_spinner("Refreshing balance", desk.wait_refresh()).await {
            render::balance_outcome(&outcome);
        }
    }
}

fn cmd_status(cfg: &Config, config_path: &Path) {
    println!("{} litedesk status\n", litedesk_core::LOGO);

    println!(
        "Config file: {} {}\n",
        config_path.display(),
        if config_path.exists() { "✓" } else { "✗" }
    );
    render::config(cfg);
}
