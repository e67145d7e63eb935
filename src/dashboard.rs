//! Interactive dashboard: one line in, one action out.

use std::io::Write;

use anyhow::Result;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use litedesk_core::api::admin::AdminAction;
use litedesk_core::config::AdminDefaults;
use litedesk_core::desk::Desk;

use crate::render;

/// A parsed dashboard line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Config,
    Set { field: String, value: String },
    Admin(AdminAction),
    Login,
    Balance,
    Transcript,
    Quit,
    Chat(String),
}

impl Command {
    /// Short name for logs. Never includes arguments, which may carry secrets.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Config => "config",
            Command::Set { .. } => "set",
            Command::Admin(action) => action.name(),
            Command::Login => "login",
            Command::Balance => "balance",
            Command::Transcript => "transcript",
            Command::Quit => "quit",
            Command::Chat(_) => "chat",
        }
    }
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str, defaults: &AdminDefaults) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Chat(line.to_string())));
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();
    let first = args.first().map(|s| s.to_string()).unwrap_or_default();

    let command = match name.as_str() {
        "help" | "?" => Command::Help,
        "config" => Command::Config,
        "set" => {
            if args.is_empty() {
                return Err("Usage: /set <field> <value>".to_string());
            }
            Command::Set {
                field: first,
                value: args[1..].join(" "),
            }
        }
        "check" => Command::Admin(AdminAction::CheckUser { user_id: first }),
        "create" => {
            let (alias, budget) = alias_and_budget(&args)?;
            Command::Admin(AdminAction::CreateUser {
                user_id: first,
                user_alias: alias.unwrap_or_default(),
                max_budget: budget.unwrap_or(defaults.user_budget),
            })
        }
        "keys" => Command::Admin(AdminAction::ListKeys { user_id: first }),
        "genkey" => {
            let (alias, budget) = alias_and_budget(&args)?;
            Command::Admin(AdminAction::GenerateKey {
                user_id: first,
                key_alias: alias.unwrap_or_else(|| defaults.key_alias.clone()),
                max_budget: budget.unwrap_or(defaults.key_budget),
            })
        }
        "disable" => Command::Admin(AdminAction::DisableKey { key: first }),
        "delete" => Command::Admin(AdminAction::DeleteKey { key: first }),
        "login" => Command::Login,
        "balance" => Command::Balance,
        "transcript" | "history" => Command::Transcript,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command /{other}. Type /help for help")),
    };
    Ok(Some(command))
}

/// Split `<id> [alias words...] [budget]`. A trailing number is the budget.
fn alias_and_budget(args: &[&str]) -> Result<(Option<String>, Option<f64>), String> {
    let mut rest = args.get(1..).unwrap_or_default();
    let mut budget = None;
    if let Some(last) = rest.last() {
        if let Ok(value) = last.parse::<f64>() {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("Budget must be a non-negative number, got {last}"));
            }
            budget = Some(value);
            rest = &rest[..rest.len() - 1];
        }
    }
    let alias = (!rest.is_empty()).then(|| rest.join(" "));
    Ok((alias, budget))
}

/// Run the dashboard until `/quit` or end of input.
pub async fn run(mut desk: Desk) -> Result<()> {
    println!(
        "{} litedesk dashboard (type {} for commands, Ctrl+D to exit)",
        litedesk_core::LOGO,
        "/help".blue()
    );
    println!("  Session: {}", desk.session().id);
    println!("  Proxy:   {}\n", desk.config().connection.base_url);

    if let Some(outcome) = render::with_spinner("Loading balance", desk.start()).await {
        render::balance_outcome(&outcome);
    } else {
        println!("{}", desk.session().balance.display().dark_grey());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">>".blue());
        std::io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                match parse(&line, &desk.config().admin) {
                    Ok(None) => continue,
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => handle(&mut desk, command).await,
                    Err(msg) => render::warning(&msg),
                }
            }
            Some(outcome) = desk.wait_refresh(), if desk.has_pending_refresh() => {
                println!();
                render::balance_outcome(&outcome);
            }
        }
    }

    info!(
        session = %desk.session().id,
        exchanges = desk.session().transcript.len() / 2,
        "Dashboard closed"
    );
    Ok(())
}

/// Execute one command against the desk and print its outcome.
pub async fn handle(desk: &mut Desk, command: Command) {
    debug!(command = command.name(), "Dashboard command");
    match command {
        Command::Help => render::help(),
        Command::Config => render::config(desk.config()),
        Command::Set { field, value } => match desk.set(&field, &value) {
            Ok(name) => render::success(&format!("{name} updated")),
            Err(e) => render::error(&e),
        },
        Command::Admin(action) => handle_admin(desk, &action).await,
        Command::Login => match render::with_spinner("Logging in", desk.login()).await {
            Ok(outcome) => {
                render::success("Logged in");
                render::balance_outcome(&outcome);
            }
            Err(e) => render::error(&e),
        },
        Command::Balance => {
            let outcome = render::with_spinner("Loading balance", desk.refresh_balance()).await;
            render::balance_outcome(&outcome);
        }
        Command::Transcript => render::transcript(&desk.session().transcript),
        Command::Chat(message) => {
            match render::with_spinner("Waiting for the model", desk.send_chat(&message)).await {
                Ok(reply) => {
                    render::bot_reply(&reply);
                    if desk.has_pending_refresh() {
                        println!("{}", "Balance will refresh shortly.".dark_grey());
                    }
                }
                Err(e) => render::error(&e),
            }
        }
        Command::Quit => {}
    }
}

/// Run one admin action and print the raw answer.
pub async fn handle_admin(desk: &Desk, action: &AdminAction) {
    let label = format!("Running {}", action.name());
    match render::with_spinner(&label, desk.admin(action)).await {
        Ok(resp) => render::response(&resp),
        Err(e) => render::error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(line: &str) -> Command {
        parse(line, &AdminDefaults::default()).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse("   ", &AdminDefaults::default()), Ok(None));
    }

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(parse_ok("hello there"), Command::Chat("hello there".into()));
    }

    #[test]
    fn test_create_user_defaults() {
        assert_eq!(
            parse_ok("/create u1"),
            Command::Admin(AdminAction::CreateUser {
                user_id: "u1".into(),
                user_alias: String::new(),
                max_budget: 10.0,
            })
        );
    }

    #[test]
    fn test_create_user_alias_and_budget() {
        assert_eq!(
            parse_ok("/create u1 Alice Smith 25"),
            Command::Admin(AdminAction::CreateUser {
                user_id: "u1".into(),
                user_alias: "Alice Smith".into(),
                max_budget: 25.0,
            })
        );
    }

    #[test]
    fn test_genkey_defaults() {
        assert_eq!(
            parse_ok("/genkey u1"),
            Command::Admin(AdminAction::GenerateKey {
                user_id: "u1".into(),
                key_alias: "default-key".into(),
                max_budget: 5.0,
            })
        );
    }

    #[test]
    fn test_missing_argument_reaches_guard() {
        assert_eq!(
            parse_ok("/disable"),
            Command::Admin(AdminAction::DisableKey { key: String::new() })
        );
    }

    #[test]
    fn test_negative_budget_rejected() {
        assert!(parse("/genkey u1 -3", &AdminDefaults::default()).is_err());
    }

    #[test]
    fn test_set_joins_value() {
        assert_eq!(
            parse_ok("/set model gpt-4o mini"),
            Command::Set {
                field: "model".into(),
                value: "gpt-4o mini".into(),
            }
        );
        assert!(parse("/set", &AdminDefaults::default()).is_err());
    }

    #[test]
    fn test_numeric_alias_needs_explicit_budget() {
        assert_eq!(
            parse_ok("/create u1 2024"),
            Command::Admin(AdminAction::CreateUser {
                user_id: "u1".into(),
                user_alias: String::new(),
                max_budget: 2024.0,
            })
        );
        assert_eq!(
            parse_ok("/create u1 2024 10"),
            Command::Admin(AdminAction::CreateUser {
                user_id: "u1".into(),
                user_alias: "2024".into(),
                max_budget: 10.0,
            })
        );
    }

    #[test]
    fn test_command_name_hides_arguments() {
        let set = parse_ok("/set token sk-secret");
        assert_eq!(set.name(), "set");
        assert_eq!(parse_ok("/genkey u1").name(), "generate key");
        assert_eq!(parse_ok("hello").name(), "chat");
    }

    #[test]
    fn test_unknown_command() {
        let err = parse("/frobnicate", &AdminDefaults::default()).unwrap_err();
        assert!(err.contains("/frobnicate"));
    }
}
