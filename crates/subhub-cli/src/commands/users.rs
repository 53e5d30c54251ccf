//! User command implementations

use anyhow::Result;
use subhub_core::db::Database;

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Add one with:");
        println!("  subhub users add you@example.com");
        return Ok(());
    }

    println!();
    println!("👥 Users");
    println!("   ─────────────────────────────────────────────────────────────");
    for user in users {
        println!(
            "   {:>4} │ {:30} │ {}",
            user.id,
            user.email,
            user.name.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub fn cmd_users_add(db: &Database, email: &str, name: Option<&str>) -> Result<()> {
    let user = db.upsert_user(email, name)?;
    println!("✅ User {} ready (ID: {})", user.email, user.id);
    Ok(())
}

pub fn cmd_users_delete(db: &Database, email: &str) -> Result<()> {
    let user = db
        .get_user_by_email(email)?
        .ok_or_else(|| anyhow::anyhow!("User not found: {}", email))?;

    db.delete_user(user.id)?;
    println!("🗑️  Deleted user {} and their subscriptions", user.email);
    Ok(())
}
