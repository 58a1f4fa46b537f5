//! Command handlers for CLI operations
//!
//! - start: run the Telegram bot until Ctrl-C
//! - setup: store the bot token in the keychain
//! - doctor: validate configuration, database and token
//! - users: print the hierarchy
//! - tasks: print every open task

use anyhow::{Context, Result};
use chrono::Utc;
use sdk::{DozioErrorExt, EngineError, ReminderPolicy, Role};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::bot::telegram::TelegramBot;
use crate::config::Config;
use crate::conversation::InMemorySessionStore;
use crate::db::{ActiveTask, Database, User};
use crate::router::Router;
use crate::secrets::SecretManager;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// A manager with the members that report to them
#[derive(Debug, Clone, Serialize)]
pub struct TeamNode {
    pub manager: User,
    pub members: Vec<User>,
}

/// The whole hierarchy as stored
#[derive(Debug, Clone, Serialize)]
pub struct Hierarchy {
    pub admin: Option<User>,
    pub teams: Vec<TeamNode>,
    /// Members whose manager is gone or was never set
    pub unassigned: Vec<User>,
}

async fn open_database(config: &Config) -> Result<Database> {
    let path = config.database_path();
    Database::with_max_connections(&path, config.storage.max_connections)
        .await
        .with_context(|| format!("Failed to open database at {:?}", path))
}

fn reminder_text(reminder: &ReminderPolicy) -> String {
    match reminder {
        ReminderPolicy::None => "deadline day only".to_string(),
        ReminderPolicy::Hourly(n) => format!("every {} hours", n),
        ReminderPolicy::Daily(n) => format!("every {} days", n),
    }
}

fn handle_label(user: &User) -> String {
    match (user.telegram_id, user.username.as_deref()) {
        (Some(id), _) => id.to_string(),
        (None, Some(username)) => format!("@{} (pending /start)", username),
        (None, None) => "-".to_string(),
    }
}

/// Load admin, managers and teams from the Directory
pub async fn load_hierarchy(db: &Database) -> Result<Hierarchy> {
    let users = db.users();
    let admin = users.list_by_role(Role::Admin).await?.into_iter().next();

    let mut teams = Vec::new();
    for manager in users.list_by_role(Role::Manager).await? {
        let members = users.team_of(manager.id).await?;
        teams.push(TeamNode { manager, members });
    }

    let unassigned = users
        .list_by_role(Role::Member)
        .await?
        .into_iter()
        .filter(|m| {
            !teams
                .iter()
                .any(|t| Some(t.manager.id) == m.supervisor_id)
        })
        .collect();

    Ok(Hierarchy {
        admin,
        teams,
        unassigned,
    })
}

/// Plain-text tree of the hierarchy
pub fn render_hierarchy(hierarchy: &Hierarchy) -> String {
    let mut out = String::new();

    match &hierarchy.admin {
        Some(admin) => out.push_str(&format!("{} [admin] {}\n", admin.name, handle_label(admin))),
        None => out.push_str("(no admin yet: the first /start becomes admin)\n"),
    }

    for team in &hierarchy.teams {
        out.push_str(&format!(
            "  {} [manager] {}\n",
            team.manager.name,
            handle_label(&team.manager)
        ));
        for member in &team.members {
            out.push_str(&format!("    {} {}\n", member.name, handle_label(member)));
        }
    }

    if !hierarchy.unassigned.is_empty() {
        out.push_str("  (no manager)\n");
        for member in &hierarchy.unassigned {
            out.push_str(&format!("    {} {}\n", member.name, handle_label(member)));
        }
    }

    out
}

/// Plain-text list of open tasks
pub fn render_active_tasks(tasks: &[ActiveTask]) -> String {
    if tasks.is_empty() {
        return "No active tasks\n".to_string();
    }

    let mut out = String::new();
    for active in tasks {
        let task = &active.task;
        out.push_str(&format!("#{} {}\n", task.id, task.title));
        if !task.description.is_empty() {
            out.push_str(&format!("  {}\n", task.description));
        }
        out.push_str(&format!(
            "  assignee: {} ({})\n",
            active.assignee_name,
            active
                .assignee_telegram_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        ));
        out.push_str(&format!(
            "  deadline: {}  reminder: {}\n",
            task.deadline.format("%Y-%m-%d"),
            reminder_text(&task.reminder)
        ));
    }
    out
}

/// Run the bot until Ctrl-C
pub async fn handle_start(config: &Config) -> Result<()> {
    let secrets = SecretManager::default();
    let (token, source) = match secrets.resolve_token() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("{}\nHint: {}", e, e.user_hint());
            return Err(e.into());
        }
    };
    tracing::info!("Bot token loaded from {}", source);

    let db = open_database(config).await?;
    let router = Router::new(&db, Arc::new(InMemorySessionStore::new()));
    let bot = Arc::new(TelegramBot::new(token, &config.telegram));

    match bot.get_me().await {
        Ok(me) => tracing::info!(
            "Connected as @{}",
            me.username.as_deref().unwrap_or(me.first_name.as_str())
        ),
        Err(e) => tracing::warn!(
            "Could not verify bot identity: {}",
            secrets.scrub(&format!("{:#}", e))
        ),
    }

    println!("Dozio is running. Press Ctrl-C to stop.");

    let outcome = tokio::select! {
        result = Arc::clone(&bot).run(router) => result,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Shutdown requested");
            Ok(())
        }
    };

    db.close().await.context("Failed to close database")?;
    if let Err(e) = outcome {
        if let Some(err) = e.downcast_ref::<EngineError>() {
            eprintln!("{}\nHint: {}", err, err.user_hint());
        }
        return Err(e);
    }
    println!("Dozio stopped.");
    Ok(())
}

/// Prompt for the bot token and store it in the keychain
pub async fn handle_setup() -> Result<()> {
    let secrets = SecretManager::default();

    println!("=== Dozio Setup ===");
    println!();
    println!("Create a bot with @BotFather and paste its token below.");

    if secrets.has_secret(crate::secrets::TOKEN_KEY) {
        println!("A token is already stored; entering a new one replaces it.");
    }

    let token = secrets.prompt_for_token().map_err(|e| {
        anyhow::anyhow!("{} ({})", e, e.user_hint())
    })?;
    secrets
        .store_token(&token)
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.user_hint()))?;

    println!("Token stored in the system keychain.");
    println!("Run 'dozio start' and send /start to the bot: the first person to do so becomes admin.");
    Ok(())
}

/// Validate configuration, database and token
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues: Vec<String> = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    if config.core.data_dir.is_dir() {
        checks.push(("Data directory", config.core.data_dir.display().to_string()));
    } else {
        checks.push(("Data directory", "Missing".to_string()));
        issues.push(format!(
            "Data directory does not exist: {:?}",
            config.core.data_dir
        ));
    }

    match open_database(config).await {
        Ok(db) => {
            checks.push(("Database", "OK".to_string()));
            match db.users().has_admin().await {
                Ok(true) => checks.push(("Admin", "Bootstrapped".to_string())),
                Ok(false) => {
                    checks.push(("Admin", "Not yet".to_string()));
                    issues.push(
                        "No admin yet. The first person to send /start becomes admin."
                            .to_string(),
                    );
                }
                Err(e) => {
                    checks.push(("Admin", "Error".to_string()));
                    issues.push(format!("Cannot query users: {:#}", e));
                }
            }
            db.close().await.ok();
        }
        Err(e) => {
            checks.push(("Database", "Failed".to_string()));
            issues.push(format!("{:#}", e));
        }
    }

    let secrets = SecretManager::default();
    match secrets.resolve_token() {
        Ok((token, source)) => {
            checks.push(("Bot token", format!("Found ({})", source)));
            let bot = TelegramBot::new(token, &config.telegram);
            match bot.get_me().await {
                Ok(me) => checks.push((
                    "Telegram API",
                    format!("OK (@{})", me.username.unwrap_or(me.first_name)),
                )),
                Err(e) => {
                    checks.push(("Telegram API", "Unreachable".to_string()));
                    issues.push(secrets.scrub(&format!("Telegram getMe failed: {:#}", e)));
                }
            }
        }
        Err(e @ EngineError::MissingToken) => {
            checks.push(("Bot token", "Not configured".to_string()));
            issues.push(e.user_hint().to_string());
        }
        Err(e) => {
            checks.push(("Bot token", "Error".to_string()));
            issues.push(format!("{} ({})", e, e.user_hint()));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Dozio Diagnostics");
            println!("=================");
            println!();

            for (check, status) in &checks {
                println!("  {:<16} {}", format!("{}:", check), status);
            }
            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty(),
                "checked_at": Utc::now().to_rfc3339(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the hierarchy
pub async fn handle_users(config: &Config, format: OutputFormat) -> Result<()> {
    let db = open_database(config).await?;
    let hierarchy = load_hierarchy(&db).await?;
    db.close().await.ok();

    match format {
        OutputFormat::Text => print!("{}", render_hierarchy(&hierarchy)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&hierarchy)?),
    }
    Ok(())
}

/// Print every open task
pub async fn handle_tasks(config: &Config, format: OutputFormat) -> Result<()> {
    let db = open_database(config).await?;
    let tasks = db.tasks().all_active().await?;
    db.close().await.ok();

    match format {
        OutputFormat::Text => print!("{}", render_active_tasks(&tasks)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
    }
    Ok(())
}
