//! SubHub CLI - Subscription tracker with payment reminders
//!
//! Usage:
//!   subhub init                          Initialize database
//!   subhub subscriptions add NAME ...    Track a subscription
//!   subhub remind --days 7               Send payment reminders
//!   subhub serve --port 3000             Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

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

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Serve {
            port,
            host,
            no_auth,
            allowed_origins,
            no_reminders,
        } => {
            commands::cmd_serve(
                &cli.db,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                allowed_origins,
                no_reminders,
            )
            .await
        }
        Commands::Dashboard => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let user = commands::current_user(&db, &cli.user)?;
            commands::cmd_dashboard(&db, &user)
        }
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(UsersAction::List) => commands::cmd_users_list(&db),
                Some(UsersAction::Add { email, name }) => {
                    commands::cmd_users_add(&db, &email, name.as_deref())
                }
                Some(UsersAction::Delete { email }) => commands::cmd_users_delete(&db, &email),
            }
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let user = commands::current_user(&db, &cli.user)?;
            match action {
                None => commands::cmd_subscriptions_list(&db, &user, false, false),
                Some(SubscriptionsAction::List { reconcile, json }) => {
                    commands::cmd_subscriptions_list(&db, &user, reconcile, json)
                }
                Some(SubscriptionsAction::Add {
                    name,
                    cost,
                    cycle,
                    due,
                    category,
                    payment_url,
                }) => commands::cmd_subscriptions_add(
                    &db,
                    &user,
                    &name,
                    cost,
                    &cycle,
                    due.as_deref(),
                    category.as_deref(),
                    payment_url.as_deref(),
                ),
                Some(SubscriptionsAction::Cancel { id, status }) => {
                    commands::cmd_subscriptions_cancel(&db, &user, id, status.as_deref())
                }
                Some(SubscriptionsAction::Upgrade {
                    id,
                    cycle,
                    cost,
                    due,
                }) => {
                    commands::cmd_subscriptions_upgrade(&db, &user, id, &cycle, cost, due.as_deref())
                }
                Some(SubscriptionsAction::Delete { id }) => {
                    commands::cmd_subscriptions_delete(&db, &user, id)
                }
                Some(SubscriptionsAction::Reconcile) => commands::cmd_subscriptions_reconcile(&db),
            }
        }
        Commands::Remind { days } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_remind(&db, days).await
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let user = commands::current_user(&db, &cli.user)?;
            match report_type {
                ReportType::Analytics { period, json } => {
                    commands::cmd_report_analytics(&db, &user, &period, json)
                }
                ReportType::Spending { view, json } => {
                    commands::cmd_report_spending(&db, &user, &view, json)
                }
            }
        }
    }
}
