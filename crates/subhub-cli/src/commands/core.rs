//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `current_user` - Resolve the `--user` identity to a stored user
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use subhub_core::db::Database;
use subhub_core::models::{parse_due_date, User};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Look up (or provision) the user the CLI is acting as
pub fn current_user(db: &Database, email: &str) -> Result<User> {
    db.upsert_user(email, None)
        .with_context(|| format!("Failed to load user {}", email))
}

/// Parse a `--due` argument
pub fn parse_due_arg(s: &str) -> Result<DateTime<Utc>> {
    parse_due_date(s)
        .with_context(|| format!("Invalid date: {} (use YYYY-MM-DD)", s))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add yourself: subhub users add you@example.com --name \"Your Name\"");
    println!("  2. Track a subscription: subhub --user you@example.com subscriptions add Netflix --cost 15.99 --due 2024-07-01");
    println!("  3. Start web API: subhub serve");

    Ok(())
}
