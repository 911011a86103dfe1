//! Command-line interface

use std::io::BufRead;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use waiterdesk_app::config::{default_config_dir, init_config_dir, resolve_settings};
use waiterdesk_app::{AppContext, Environment};
use waiterdesk_core::prelude::*;
use waiterdesk_core::{Credentials, WaiterCall};

use crate::headless;

/// waiterdesk - waiter calls, dishes, tables and staff from the terminal
#[derive(Parser, Debug)]
#[command(name = "waiterdesk", version)]
#[command(about = "Restaurant floor client for the waiterdesk backend", long_about = None)]
pub struct Args {
    /// Backend environment (dev, staging, prod); overrides WAITERDESK_ENV
    #[arg(long, global = true, value_parser = parse_environment)]
    pub env: Option<Environment>,

    /// Directory holding config.toml
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a commented default config.toml
    Init,

    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Ask the server instead of reading the stored session
        #[arg(long)]
        remote: bool,
    },

    /// Waiter calls
    Calls {
        #[command(subcommand)]
        action: CallsCommand,
    },

    /// Follow waiter calls live, printing NDJSON events
    Watch {
        /// Defaults to the signed-in user's restaurant
        #[arg(long)]
        restaurant: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CallsCommand {
    /// List the current calls
    List {
        #[arg(long)]
        restaurant: Option<String>,
    },

    /// Acknowledge a call
    Ack { call_id: String },

    /// Resolve a call
    Resolve { call_id: String },
}

fn parse_environment(raw: &str) -> std::result::Result<Environment, String> {
    raw.parse().map_err(|e: Error| e.to_string())
}

/// Execute one parsed command line.
pub async fn run(args: Args) -> Result<()> {
    let config_dir = args.config_dir.unwrap_or_else(default_config_dir);

    if let Command::Init = args.command {
        let path = init_config_dir(&config_dir)?;
        println!("Config: {}", path.display());
        return Ok(());
    }

    let settings = resolve_settings(&config_dir, args.env)?;
    let ctx = AppContext::from_settings(settings)?;

    match args.command {
        Command::Init => Ok(()),
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let session = ctx.auth.login(&Credentials::new(email, password)).await?;
            println!(
                "Signed in as {} <{}> ({})",
                session.user.name,
                session.user.email,
                role_label(&session.user.role)
            );
            Ok(())
        }
        Command::Logout => {
            ctx.auth.logout()?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami { remote } => {
            let user = if remote {
                Some(ctx.auth.current_user().await?)
            } else {
                ctx.auth.stored_session()?.map(|session| session.user)
            };
            match user {
                Some(user) => println!(
                    "{} <{}> ({}) restaurant {}",
                    user.name,
                    user.email,
                    role_label(&user.role),
                    user.restaurant_id.as_deref().unwrap_or("-")
                ),
                None => println!("Not signed in"),
            }
            Ok(())
        }
        Command::Calls { action } => run_calls(&ctx, action).await,
        Command::Watch { restaurant } => {
            let restaurant_id = restaurant_or_session(&ctx, restaurant)?;
            headless::run_headless(&ctx, &restaurant_id).await
        }
    }
}

async fn run_calls(ctx: &AppContext, action: CallsCommand) -> Result<()> {
    match action {
        CallsCommand::List { restaurant } => {
            let restaurant_id = restaurant_or_session(ctx, restaurant)?;
            let sync = ctx.call_sync(&restaurant_id);
            sync.load().await?;
            let list = sync.snapshot();
            if list.is_empty() {
                println!("No waiter calls");
            }
            let now = chrono::Utc::now();
            for call in &list {
                println!("{}", format_call(call, now));
            }
            Ok(())
        }
        CallsCommand::Ack { call_id } => {
            let record = ctx.waiter_calls.acknowledge(&call_id).await?;
            info!("Acknowledged {}", record.call_id);
            println!("{} acknowledged", call_id);
            Ok(())
        }
        CallsCommand::Resolve { call_id } => {
            ctx.waiter_calls.resolve(&call_id).await?;
            println!("{} resolved", call_id);
            Ok(())
        }
    }
}

fn restaurant_or_session(ctx: &AppContext, restaurant: Option<String>) -> Result<String> {
    match restaurant {
        Some(id) => Ok(id),
        None => ctx.session_restaurant()?.ok_or_else(|| {
            Error::validation(
                "restaurant",
                "pass --restaurant or sign in as a user with a restaurant",
            )
        }),
    }
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn role_label(role: &waiterdesk_core::UserRole) -> String {
    serde_json::to_value(role)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{role:?}"))
}

/// One line of `calls list`.
pub fn format_call(call: &WaiterCall, now: chrono::DateTime<chrono::Utc>) -> String {
    let mut line = format!(
        "{}  {:<12}  table {:<6}  {:>3} min  {}  [{}]",
        call.created_label(),
        call.status.as_str(),
        call.table_label(),
        call.waiting_minutes(now),
        call.customer_name,
        call.call_id
    );
    if !call.message.is_empty() {
        line.push_str(&format!("  \"{}\"", call.message));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use waiterdesk_core::CallStatus;

    #[test]
    fn test_parse_watch_with_globals() {
        let args = Args::try_parse_from([
            "waiterdesk",
            "watch",
            "--restaurant",
            "r1",
            "--env",
            "prod",
        ])
        .unwrap();
        assert_eq!(args.env, Some(Environment::Prod));
        assert!(matches!(
            args.command,
            Command::Watch { restaurant: Some(ref r) } if r == "r1"
        ));
    }

    #[test]
    fn test_parse_calls_ack() {
        let args =
            Args::try_parse_from(["waiterdesk", "--config-dir", "/tmp/wd", "calls", "ack", "c9"])
                .unwrap();
        assert_eq!(args.config_dir, Some(PathBuf::from("/tmp/wd")));
        assert!(matches!(
            args.command,
            Command::Calls { action: CallsCommand::Ack { ref call_id } } if call_id == "c9"
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_env() {
        assert!(Args::try_parse_from(["waiterdesk", "--env", "moon", "logout"]).is_err());
    }

    #[test]
    fn test_format_call() {
        let call = WaiterCall {
            call_id: "c1".into(),
            restaurant_id: "r1".into(),
            table_id: "t1".into(),
            table_name: "7".into(),
            customer_name: "Bob".into(),
            message: "Check please".into(),
            status: CallStatus::Pending,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 20, 0, 0).unwrap(),
            acknowledged_at: None,
            resolved_at: None,
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 20, 12, 0).unwrap();

        let line = format_call(&call, now);
        assert!(line.contains("pending"));
        assert!(line.contains("table 7"));
        assert!(line.contains(" 12 min"));
        assert!(line.ends_with("[c1]  \"Check please\""));
    }

    #[test]
    fn test_role_label() {
        assert_eq!(role_label(&waiterdesk_core::UserRole::Waiter), "waiter");
    }
}
