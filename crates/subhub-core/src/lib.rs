//! SubHub Core Library
//!
//! Shared functionality for the SubHub subscription tracker:
//! - Database access and migrations
//! - Billing-cycle cost normalization
//! - Effective status resolution and reconciliation
//! - Reminder windows and the reminder dispatcher
//! - Pluggable notification transports (SMTP, log, mock)
//! - Spend analytics

pub mod analytics;
pub mod clock;
pub mod cost;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod reminders;
pub mod status;
pub mod store;

/// Test utilities including an in-memory subscription store
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use analytics::{analytics_report, spending_view};
pub use clock::{Clock, FixedClock, SystemClock};
pub use db::Database;
pub use error::{Error, Result};
pub use notify::{LogTransport, MockTransport, NotificationTransport, Notifier, SmtpTransport};
pub use reminders::{reminder_window, ReminderDispatcher, ReminderWindow};
pub use status::resolve_status;
pub use store::SubscriptionStore;
