//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SubHub - Track subscriptions and never miss a payment
#[derive(Parser)]
#[command(name = "subhub")]
#[command(about = "Self-hosted subscription tracker with payment reminders", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "subhub.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SUBHUB_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Email of the user whose subscriptions to manage
    #[arg(long, env = "SUBHUB_USER", default_value = "local-dev", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires an authenticating proxy header or API key.
        #[arg(long)]
        no_auth: bool,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,

        /// Do not run the daily reminder scheduler
        #[arg(long)]
        no_reminders: bool,
    },

    /// Show dashboard summary
    Dashboard,

    /// Manage users (list, add, delete)
    Users {
        #[command(subcommand)]
        action: Option<UsersAction>,
    },

    /// Manage subscriptions (list, add, cancel, upgrade, delete, reconcile)
    Subscriptions {
        #[command(subcommand)]
        action: Option<SubscriptionsAction>,
    },

    /// Send payment reminders for subscriptions due soon
    Remind {
        /// Remind about payments due within this many days
        #[arg(short, long, default_value = "7")]
        days: u32,
    },

    /// Generate spending reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// List all users
    List,

    /// Add a user (sets the display name if they have none)
    Add {
        /// Email address used for reminders
        email: String,

        /// Display name used in reminder greetings
        #[arg(long)]
        name: Option<String>,
    },

    /// Delete a user and all of their subscriptions
    Delete {
        /// Email address of the user
        email: String,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// List subscriptions with their effective status
    List {
        /// Persist status changes before listing
        #[arg(long)]
        reconcile: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a subscription
    Add {
        /// Subscription name
        name: String,

        /// Cost per billing cycle (ignored for free plans)
        #[arg(long, default_value = "0")]
        cost: f64,

        /// Billing cycle: monthly, quarterly, yearly, free
        #[arg(long, default_value = "monthly")]
        cycle: String,

        /// Next due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Category (default: Other)
        #[arg(long)]
        category: Option<String>,

        /// Link included in reminder emails
        #[arg(long)]
        payment_url: Option<String>,
    },

    /// Cancel a subscription (or set another explicit status)
    Cancel {
        /// Subscription ID
        id: i64,

        /// Target status: cancelled, inactive, active
        #[arg(long)]
        status: Option<String>,
    },

    /// Upgrade a free subscription to a paid plan
    Upgrade {
        /// Subscription ID
        id: i64,

        /// Billing cycle: monthly, quarterly, yearly
        #[arg(long, default_value = "monthly")]
        cycle: String,

        /// Cost per billing cycle
        #[arg(long, default_value = "0")]
        cost: f64,

        /// Next due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: i64,
    },

    /// Persist resolved statuses for every user
    Reconcile,
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Spend over a lookback period, by category, month and subscription
    Analytics {
        /// Period: 3months, 6months, 12months
        #[arg(short, long, default_value = "6months")]
        period: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Current spend normalized to one billing cycle
    Spending {
        /// View: monthly, quarterly, yearly
        #[arg(long, default_value = "monthly")]
        view: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
