//! Subscription persistence seam
//!
//! The reminder dispatcher and status reconciliation only need this narrow
//! view of storage. [`crate::Database`] implements it against SQLite; tests
//! can substitute an in-memory store.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ReminderCandidate, Subscription, SubscriptionStatus};

pub trait SubscriptionStore: Send + Sync {
    /// All subscriptions owned by a user
    fn find_by_owner(&self, user_id: i64) -> Result<Vec<Subscription>>;

    fn find_by_id(&self, id: i64) -> Result<Option<Subscription>>;

    /// Non-Free subscriptions with the given stored status whose due date lies
    /// in `[start, end]`, joined with the owner's contact info
    fn find_due_within_window(
        &self,
        status: SubscriptionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>>;

    /// Persist every mutable field of an existing subscription
    fn save(&self, subscription: &Subscription) -> Result<()>;

    /// Set only the reminder marker, leaving concurrent edits intact
    ///
    /// Returns false if the subscription no longer exists.
    fn mark_reminded(&self, id: i64, at: DateTime<Utc>) -> Result<bool>;

    /// Returns false if nothing was deleted
    fn delete_by_id(&self, id: i64) -> Result<bool>;
}
