//! Test utilities for subhub-core
//!
//! An in-memory [`SubscriptionStore`] for driving the reminder dispatcher
//! without SQLite, plus fixtures for seeding a real [`Database`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    BillingCycle, NewSubscription, ReminderCandidate, Subscription, SubscriptionStatus, User,
};
use crate::store::SubscriptionStore;

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    subscriptions: BTreeMap<i64, Subscription>,
    fail_selection: bool,
}

/// Subscription store backed by maps
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.state.lock().unwrap().users.insert(user.id, user);
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.state
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub fn get(&self, id: i64) -> Option<Subscription> {
        self.state.lock().unwrap().subscriptions.get(&id).cloned()
    }

    /// Make `find_due_within_window` return an error
    pub fn fail_selection(&self) {
        self.state.lock().unwrap().fail_selection = true;
    }
}

impl SubscriptionStore for MemoryStore {
    fn find_by_owner(&self, user_id: i64) -> Result<Vec<Subscription>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Subscription>> {
        Ok(self.get(id))
    }

    fn find_due_within_window(
        &self,
        status: SubscriptionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>> {
        let state = self.state.lock().unwrap();
        if state.fail_selection {
            return Err(Error::InvalidData("selection unavailable".to_string()));
        }
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.status == status && s.billing_cycle != BillingCycle::Free)
            .filter(|s| s.next_due_date.is_some_and(|due| start <= due && due <= end))
            .map(|s| ReminderCandidate {
                subscription: s.clone(),
                owner: state.users.get(&s.user_id).cloned(),
            })
            .collect())
    }

    fn save(&self, subscription: &Subscription) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match state.subscriptions.get_mut(&subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("subscription {}", subscription.id))),
        }
    }

    fn mark_reminded(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(match state.subscriptions.get_mut(&id) {
            Some(existing) => {
                existing.last_reminder_sent = Some(at);
                true
            }
            None => false,
        })
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        Ok(self.state.lock().unwrap().subscriptions.remove(&id).is_some())
    }
}

/// A paid subscription input with the given cycle and due date
pub fn new_subscription(
    name: &str,
    cost: f64,
    cycle: BillingCycle,
    due: Option<DateTime<Utc>>,
) -> NewSubscription {
    NewSubscription {
        name: name.to_string(),
        cost,
        billing_cycle: Some(cycle),
        next_due_date: due,
        ..Default::default()
    }
}

/// Create a user and return it
pub fn seed_user(db: &Database, email: &str) -> User {
    db.upsert_user(email, Some("Test User")).unwrap()
}
