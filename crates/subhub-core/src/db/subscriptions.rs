//! Subscription operations

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{debug, info};

use super::{format_datetime, parse_datetime, parse_datetime_opt, Database};
use crate::error::{Error, Result};
use crate::models::{
    BillingCycle, NewSubscription, ReconcileResult, ReminderCandidate, Subscription,
    SubscriptionMetadata, SubscriptionStatus, SubscriptionUpdate, SubscriptionUpgrade, User,
};
use crate::status::statuses_to_reconcile;
use crate::store::SubscriptionStore;

const SUBSCRIPTION_COLUMNS: &str = r#"
    s.id, s.user_id, s.name, s.cost, s.billing_cycle, s.next_due_date, s.category,
    s.status, s.last_reminder_sent, s.description, s.logo_url, s.payment_url,
    s.manage_url, s.account_url, s.notes, s.created_at, s.updated_at
"#;

fn row_to_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let cycle_str: String = row.get(4)?;
    let due_str: Option<String> = row.get(5)?;
    let status_str: String = row.get(7)?;
    let reminded_str: Option<String> = row.get(8)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    Ok(Subscription {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        cost: row.get(3)?,
        billing_cycle: cycle_str.parse().unwrap_or(BillingCycle::Monthly),
        next_due_date: due_str.as_deref().and_then(parse_datetime_opt),
        category: row.get(6)?,
        status: status_str.parse().unwrap_or(SubscriptionStatus::Active),
        last_reminder_sent: reminded_str.as_deref().and_then(parse_datetime_opt),
        metadata: SubscriptionMetadata {
            description: row.get(9)?,
            logo_url: row.get(10)?,
            payment_url: row.get(11)?,
            manage_url: row.get(12)?,
            account_url: row.get(13)?,
            notes: row.get(14)?,
        },
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

/// Map a subscription row with the owner's columns appended (LEFT JOIN)
fn row_to_candidate(row: &Row<'_>) -> rusqlite::Result<ReminderCandidate> {
    let subscription = row_to_subscription(row)?;
    let owner_id: Option<i64> = row.get(17)?;
    let owner = match owner_id {
        Some(id) => {
            let created_at_str: Option<String> = row.get(20)?;
            Some(User {
                id,
                email: row.get::<_, Option<String>>(18)?.unwrap_or_default(),
                name: row.get(19)?,
                created_at: created_at_str
                    .as_deref()
                    .map(parse_datetime)
                    .unwrap_or_else(Utc::now),
            })
        }
        None => None,
    };
    Ok(ReminderCandidate {
        subscription,
        owner,
    })
}

impl Database {
    /// Create a subscription for a user
    ///
    /// Status is Active unless an explicit status is supplied. Free
    /// subscriptions are stored with zero cost.
    pub fn create_subscription(&self, user_id: i64, new: &NewSubscription) -> Result<Subscription> {
        new.validate()?;

        let conn = self.conn()?;
        let cycle = new.cycle();
        let status = new.status.unwrap_or(SubscriptionStatus::Active);

        conn.execute(
            r#"
            INSERT INTO subscriptions (
                user_id, name, cost, billing_cycle, next_due_date, category, status,
                description, logo_url, payment_url, manage_url, account_url, notes
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                new.name.trim(),
                new.effective_cost(),
                cycle.as_str(),
                new.next_due_date.map(format_datetime),
                new.category(),
                status.as_str(),
                new.metadata.description,
                new.metadata.logo_url,
                new.metadata.payment_url,
                new.metadata.manage_url,
                new.metadata.account_url,
                new.metadata.notes,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        debug!(id, user_id, name = %new.name, "Created subscription");
        self.find_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("subscription {}", id)))
    }

    /// Apply a partial update; returns None if the subscription does not exist
    pub fn update_subscription(
        &self,
        id: i64,
        update: SubscriptionUpdate,
    ) -> Result<Option<Subscription>> {
        let Some(mut subscription) = self.find_by_id(id)? else {
            return Ok(None);
        };
        subscription.apply_update(update)?;
        self.save(&subscription)?;
        self.find_by_id(id)
    }

    /// Explicit status transition, Cancelled unless another status is given
    pub fn cancel_subscription(
        &self,
        id: i64,
        status: Option<SubscriptionStatus>,
    ) -> Result<Option<Subscription>> {
        let status = status.unwrap_or(SubscriptionStatus::Cancelled);
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE subscriptions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), id],
        )?;
        drop(conn);

        if changed == 0 {
            return Ok(None);
        }
        info!(id, status = %status, "Subscription status changed");
        self.find_by_id(id)
    }

    /// Move a Free subscription onto a paid cycle and reactivate it
    pub fn upgrade_subscription(
        &self,
        id: i64,
        upgrade: &SubscriptionUpgrade,
    ) -> Result<Option<Subscription>> {
        let Some(mut subscription) = self.find_by_id(id)? else {
            return Ok(None);
        };

        if subscription.billing_cycle != BillingCycle::Free {
            return Err(Error::InvalidData(
                "Only free subscriptions can be upgraded".to_string(),
            ));
        }
        let cycle = upgrade.billing_cycle.unwrap_or(BillingCycle::Monthly);
        if cycle == BillingCycle::Free {
            return Err(Error::InvalidData(
                "Upgrade target must be a paid billing cycle".to_string(),
            ));
        }
        let cost = upgrade.cost.unwrap_or(0.0);
        if !cost.is_finite() || cost < 0.0 {
            return Err(Error::InvalidData(
                "Cost cannot be negative".to_string(),
            ));
        }

        subscription.billing_cycle = cycle;
        subscription.cost = cost;
        subscription.next_due_date = upgrade.next_due_date;
        subscription.status = SubscriptionStatus::Active;
        self.save(&subscription)?;

        info!(id, cycle = %cycle, "Subscription upgraded");
        self.find_by_id(id)
    }

    /// All subscriptions across every user
    pub fn list_all_subscriptions(&self) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s ORDER BY s.id"
        ))?;
        let subscriptions = stmt
            .query_map([], row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subscriptions)
    }

    /// Write resolved statuses back where they diverge from the stored value
    ///
    /// Scoped to one user, or every subscription when `user_id` is None. A row
    /// is only rewritten if its stored status is still the one that was read,
    /// so a concurrent explicit change is never clobbered.
    pub fn reconcile_statuses(
        &self,
        user_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileResult> {
        let subscriptions = match user_id {
            Some(uid) => self.find_by_owner(uid)?,
            None => self.list_all_subscriptions()?,
        };
        let changes = statuses_to_reconcile(&subscriptions, now);

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut updated = 0;
        for (id, resolved) in &changes {
            let stored = subscriptions
                .iter()
                .find(|s| s.id == *id)
                .map(|s| s.status.as_str());
            updated += tx.execute(
                r#"
                UPDATE subscriptions SET status = ?, updated_at = CURRENT_TIMESTAMP
                WHERE id = ? AND status = ?
                "#,
                params![resolved.as_str(), id, stored],
            )?;
        }
        tx.commit()?;

        if updated > 0 {
            info!(updated, checked = subscriptions.len(), "Reconciled subscription statuses");
        }
        Ok(ReconcileResult {
            checked: subscriptions.len(),
            updated,
        })
    }
}

impl SubscriptionStore for Database {
    fn find_by_owner(&self, user_id: i64) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions s
            WHERE s.user_id = ?
            ORDER BY s.next_due_date IS NULL, s.next_due_date, s.name
            "#
        ))?;
        let subscriptions = stmt
            .query_map(params![user_id], row_to_subscription)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subscriptions)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let subscription = conn
            .query_row(
                &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions s WHERE s.id = ?"),
                params![id],
                row_to_subscription,
            )
            .optional()?;
        Ok(subscription)
    }

    fn find_due_within_window(
        &self,
        status: SubscriptionStatus,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ReminderCandidate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}, u.id, u.email, u.name, u.created_at
            FROM subscriptions s
            LEFT JOIN users u ON u.id = s.user_id
            WHERE s.status = ?
              AND s.billing_cycle != 'free'
              AND s.next_due_date IS NOT NULL
              AND s.next_due_date BETWEEN ? AND ?
            ORDER BY s.next_due_date
            "#
        ))?;
        let candidates = stmt
            .query_map(
                params![status.as_str(), format_datetime(start), format_datetime(end)],
                row_to_candidate,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    fn save(&self, subscription: &Subscription) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            r#"
            UPDATE subscriptions SET
                name = ?, cost = ?, billing_cycle = ?, next_due_date = ?, category = ?,
                status = ?, last_reminder_sent = ?, description = ?, logo_url = ?,
                payment_url = ?, manage_url = ?, account_url = ?, notes = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
            params![
                subscription.name,
                subscription.cost,
                subscription.billing_cycle.as_str(),
                subscription.next_due_date.map(format_datetime),
                subscription.category,
                subscription.status.as_str(),
                subscription.last_reminder_sent.map(format_datetime),
                subscription.metadata.description,
                subscription.metadata.logo_url,
                subscription.metadata.payment_url,
                subscription.metadata.manage_url,
                subscription.metadata.account_url,
                subscription.metadata.notes,
                subscription.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("subscription {}", subscription.id)));
        }
        Ok(())
    }

    fn mark_reminded(&self, id: i64, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE subscriptions SET last_reminder_sent = ? WHERE id = ?",
            params![format_datetime(at), id],
        )?;
        Ok(changed > 0)
    }

    fn delete_by_id(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }
}
