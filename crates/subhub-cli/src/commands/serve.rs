//! Server command implementation

use std::path::Path;

use anyhow::Result;
use subhub_server::{ReminderScheduleConfig, ServerConfig};

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    allowed_origins: Vec<String>,
    no_reminders: bool,
) -> Result<()> {
    println!("🚀 Starting SubHub web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    // Parse API keys from environment (comma-separated)
    let api_keys =
        ServerConfig::parse_api_keys(&std::env::var("SUBHUB_API_KEYS").unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!(
            "   🔒 Authentication: proxy header ({})",
            subhub_server::USER_HEADER
        );
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (SUBHUB_API_KEYS)",
                api_keys.len()
            );
        }
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 CORS origins: {}", allowed_origins.join(", "));
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }

    let reminders = if no_reminders {
        None
    } else {
        ReminderScheduleConfig::from_env()
    };
    match &reminders {
        Some(schedule) => println!(
            "   📬 Reminders: daily at {:02}:00 UTC, {} days ahead",
            schedule.hour, schedule.days_before
        ),
        None => println!("   📭 Reminders: disabled"),
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys,
    };

    subhub_server::serve_with_config(db, host, port, config, reminders).await?;

    Ok(())
}
