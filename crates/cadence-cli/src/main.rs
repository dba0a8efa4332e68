//! Cadence CLI - Recurring spending detector
//!
//! Usage:
//!   cadence init                   Initialize database
//!   cadence import --file CSV      Import transactions and detect patterns
//!   cadence recurring              Review detected patterns
//!   cadence stats --unpaid         Spending totals
//!   cadence serve --port 3000      Start web server

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cadence_core::{AppConfig, DetectionTrigger};
use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(db) = &cli.db {
        config.db_path = db.display().to_string();
    }
    debug!(db = %config.db_path, "Configuration loaded");

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Import {
            file,
            name,
            no_detect,
        } => {
            let db = commands::open_db(&config)?;
            let trigger = DetectionTrigger::new(db.clone(), config.detection.clone());
            commands::cmd_import(&db, &trigger, &file, name.as_deref(), no_detect)
        }
        Commands::Files { action } => {
            let db = commands::open_db(&config)?;
            match action {
                None | Some(FilesAction::List) => commands::cmd_files_list(&db),
                Some(FilesAction::Remove { id }) => {
                    let trigger = DetectionTrigger::new(db.clone(), config.detection.clone());
                    commands::cmd_files_remove(&db, &trigger, id)
                }
            }
        }
        Commands::Transactions {
            source,
            category,
            filter,
            limit,
        } => {
            let db = commands::open_db(&config)?;
            let mut filter = filter.to_filter();
            if let Some((source, category)) = source.as_deref().zip(category.as_deref()) {
                filter = filter.key(source, category);
            }
            commands::cmd_transactions_list(&db, &filter, limit)
        }
        Commands::Stats { filter } => {
            let db = commands::open_db(&config)?;
            commands::cmd_stats(&db, &filter.to_filter())
        }
        Commands::Detect => {
            let db = commands::open_db(&config)?;
            let trigger = DetectionTrigger::new(db.clone(), config.detection.clone());
            commands::cmd_detect(&trigger)
        }
        Commands::Recurring { action } => {
            let db = commands::open_db(&config)?;
            match action {
                None => commands::cmd_recurring_list(&db, &Default::default()),
                Some(RecurringAction::List {
                    min_confidence,
                    confirmed_only,
                    include_rejected,
                }) => commands::cmd_recurring_list(
                    &db,
                    &cadence_core::models::PatternFilter {
                        min_confidence,
                        confirmed_only,
                        include_rejected,
                    },
                ),
                Some(RecurringAction::Show { id }) => commands::cmd_recurring_show(&db, id),
                Some(RecurringAction::Confirm { id, label }) => {
                    commands::cmd_recurring_confirm(&db, id, label.as_deref())
                }
                Some(RecurringAction::Reject { id }) => commands::cmd_recurring_reject(&db, id),
                Some(RecurringAction::Label { id, text }) => {
                    commands::cmd_recurring_label(&db, id, &text)
                }
                Some(RecurringAction::History { limit }) => {
                    commands::cmd_recurring_history(&db, limit)
                }
            }
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            static_dir,
        } => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            commands::cmd_serve(&config, &host, port, no_auth, static_dir.as_deref()).await
        }
    }
}
