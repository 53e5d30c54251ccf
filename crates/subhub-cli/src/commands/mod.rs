//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, current_user)
//! - `reminders` - Manual reminder runs
//! - `reports` - Analytics and spending reports
//! - `serve` - Web server command
//! - `status` - Dashboard summary
//! - `subscriptions` - Subscription management commands
//! - `users` - User management commands

pub mod core;
pub mod reminders;
pub mod reports;
pub mod serve;
pub mod status;
pub mod subscriptions;
pub mod users;

// Re-export command functions for main.rs
pub use core::*;
pub use reminders::*;
pub use reports::*;
pub use serve::*;
pub use status::*;
pub use subscriptions::*;
pub use users::*;

use subhub_core::models::SubscriptionStatus;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Icon shown next to a subscription's status
pub fn status_icon(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "✅",
        SubscriptionStatus::Inactive => "💤",
        SubscriptionStatus::Cancelled => "❌",
    }
}
