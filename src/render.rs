//! Terminal output: responses, balance lines, transcript and spinners.

use std::future::Future;
use std::time::Duration;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};

use litedesk_core::api::ApiResponse;
use litedesk_core::config::Config;
use litedesk_core::desk::BalanceOutcome;
use litedesk_core::error::{BalanceError, ChatError, DeskError};
use litedesk_core::session::{Speaker, Transcript, BALANCE_ERROR};
use litedesk_core::util::mask_secret;

/// Run `fut` while a spinner with `message` ticks on stderr.
pub async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    let output = fut.await;
    bar.finish_and_clear();
    output
}

pub fn response(resp: &ApiResponse) {
    let status = format!("Status: {}", resp.status);
    if resp.is_success() {
        println!("{}", status.green().bold());
    } else {
        println!("{}", status.red().bold());
    }
    println!("{}", resp.body_text());
}

/// One-line, user-facing description of a failed action.
pub fn describe(err: &DeskError) -> String {
    match err {
        DeskError::MissingField(field) => format!("Fill in {field} first."),
        DeskError::Transport(e) => format!("Request failed: {e}"),
        DeskError::Chat(ChatError::Auth(msg)) => {
            format!("Authentication error: check the API token ({msg})")
        }
        DeskError::Chat(e @ ChatError::Api { .. }) => e.to_string(),
        DeskError::Chat(ChatError::Other(msg)) => format!("Unexpected error: {msg}"),
        DeskError::Balance(BalanceError::TokenNotFound) => {
            "Login failed: token not found in the response".to_string()
        }
        other => other.to_string(),
    }
}

pub fn error(err: &DeskError) {
    eprintln!("{} {}", "✗".red(), describe(err).red());
}

pub fn warning(message: &str) {
    eprintln!("{}", message.yellow());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn balance_outcome(outcome: &BalanceOutcome) {
    match outcome {
        Ok(display) => println!("{}", display.as_str().green().bold()),
        Err(e) => {
            println!("{}", BALANCE_ERROR.red().bold());
            eprintln!("  {}", e.to_string().red());
        }
    }
}

pub fn bot_reply(reply: &str) {
    println!("\n{} {}\n", litedesk_core::LOGO, reply);
}

pub fn transcript(transcript: &Transcript) {
    if transcript.is_empty() {
        println!("No messages yet.");
        return;
    }
    for entry in transcript.entries() {
        let time = entry.timestamp.format("%H:%M:%S").to_string();
        let tag = match entry.speaker {
            Speaker::User => "You".cyan().bold(),
            Speaker::Bot => "Bot".magenta().bold(),
        };
        println!("{} {}: {}", time.dark_grey(), tag, entry.text);
    }
}

pub fn config(cfg: &Config) {
    let row = |name: &str, value: &str| println!("  {:<12} {}", name.blue(), value);

    println!("{}", "Connection".bold());
    row("base_url", &cfg.connection.base_url);
    row("api_token", &mask_secret(&cfg.connection.auth_token));
    row("model", &cfg.chat.model);

    println!("{}", "Balance".bold());
    row("balance_url", or_unset(&cfg.balance.balance_url));
    row("login_url", or_unset(&cfg.balance.login_url));
    row("username", or_unset(&cfg.balance.username));
    row("password", &mask_secret(&cfg.balance.password));
    row(
        "token",
        &mask_secret(cfg.balance.token.as_deref().unwrap_or_default()),
    );
    row("user_agent", &cfg.balance.user_agent);
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "not set"
    } else {
        value
    }
}

const HELP_ROWS: &[(&str, &str)] = &[
    ("/check <user_id>", "Check that a user exists"),
    ("/create <user_id> [alias] [budget]", "Create a user"),
    ("/keys <user_id>", "List a user's keys"),
    ("/genkey <user_id> [alias] [budget]", "Generate a key"),
    ("/disable <key>", "Disable a key"),
    ("/delete <key>", "Delete a key"),
    ("/login", "Log in to the billing endpoint"),
    ("/balance", "Reload the balance"),
    ("/transcript", "Show this session's chat"),
    ("/set <field> <value>", "Change a setting"),
    ("/config", "Show current settings"),
    ("/help", "Show this help"),
    ("/quit", "Leave the dashboard"),
];

/// A trailing number on /create and /genkey is always read as the budget.
const BUDGET_NOTE: &str = "A trailing number on /create or /genkey is the budget, \
    so a numeric alias needs a budget after it (/create u1 2024 10).";

pub fn help() {
    println!("\n{}", "Available Commands:".bold());
    for &(usage, text) in HELP_ROWS {
        println!("{:<38} - {}", usage.blue(), text);
    }
    println!("{}", BUDGET_NOTE.dark_grey());
    println!("Anything else is sent to the chat model.\n");
}
