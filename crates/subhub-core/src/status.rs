//! Effective status resolution
//!
//! The stored status of a subscription can go stale as due dates pass. Reads
//! use [`resolve_status`] to compute the current status without touching the
//! store; persisting the result is a separate, explicit step
//! ([`statuses_to_reconcile`] feeding `Database::reconcile_statuses`).

use chrono::{DateTime, Utc};

use crate::models::{BillingCycle, ResolvedSubscription, Subscription, SubscriptionStatus};

/// Compute the effective status of a subscription at `now`
///
/// Rules, first match wins:
/// 1. Cancelled stays Cancelled
/// 2. Free is always Active
/// 3. No due date keeps the stored status
/// 4. Due strictly before `now` is Inactive
/// 5. Otherwise Active
pub fn resolve_status(subscription: &Subscription, now: DateTime<Utc>) -> SubscriptionStatus {
    if subscription.status == SubscriptionStatus::Cancelled {
        return SubscriptionStatus::Cancelled;
    }
    if subscription.billing_cycle == BillingCycle::Free {
        return SubscriptionStatus::Active;
    }
    match subscription.next_due_date {
        None => subscription.status,
        Some(due) if due < now => SubscriptionStatus::Inactive,
        Some(_) => SubscriptionStatus::Active,
    }
}

/// Annotate subscriptions with their effective status
pub fn resolve_all(
    subscriptions: Vec<Subscription>,
    now: DateTime<Utc>,
) -> Vec<ResolvedSubscription> {
    subscriptions
        .into_iter()
        .map(|subscription| {
            let effective_status = resolve_status(&subscription, now);
            ResolvedSubscription {
                subscription,
                effective_status,
            }
        })
        .collect()
}

/// Subscriptions whose stored status differs from the effective one
///
/// Returns `(id, resolved)` pairs to write back.
pub fn statuses_to_reconcile(
    subscriptions: &[Subscription],
    now: DateTime<Utc>,
) -> Vec<(i64, SubscriptionStatus)> {
    subscriptions
        .iter()
        .filter_map(|s| {
            let resolved = resolve_status(s, now);
            (resolved != s.status).then_some((s.id, resolved))
        })
        .collect()
}

/// Order for status listings: soonest due first, undated last, then by name
pub fn sort_for_listing(items: &mut [ResolvedSubscription]) {
    items.sort_by(|a, b| {
        let a = &a.subscription;
        let b = &b.subscription;
        match (a.next_due_date, b.next_due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SubscriptionMetadata;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn sub(
        cycle: BillingCycle,
        status: SubscriptionStatus,
        due: Option<DateTime<Utc>>,
    ) -> Subscription {
        Subscription {
            id: 1,
            user_id: 1,
            name: "Netflix".to_string(),
            cost: 15.49,
            billing_cycle: cycle,
            next_due_date: due,
            category: "Entertainment".to_string(),
            status,
            last_reminder_sent: None,
            metadata: SubscriptionMetadata::default(),
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_free_always_active() {
        let past = Some(now() - Duration::days(30));
        for status in [SubscriptionStatus::Active, SubscriptionStatus::Inactive] {
            for due in [None, past, Some(now() + Duration::days(3))] {
                let s = sub(BillingCycle::Free, status, due);
                assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Active);
            }
        }
    }

    #[test]
    fn test_past_due_is_inactive() {
        let s = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            Some(now() - Duration::seconds(1)),
        );
        assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Inactive);
    }

    #[test]
    fn test_due_exactly_now_is_active() {
        let s = sub(BillingCycle::Yearly, SubscriptionStatus::Inactive, Some(now()));
        assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Active);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for cycle in [BillingCycle::Free, BillingCycle::Monthly] {
            for due in [None, Some(now() - Duration::days(2)), Some(now() + Duration::days(2))] {
                let s = sub(cycle, SubscriptionStatus::Cancelled, due);
                assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Cancelled);
            }
        }
    }

    #[test]
    fn test_missing_due_keeps_stored_status() {
        let s = sub(BillingCycle::Quarterly, SubscriptionStatus::Inactive, None);
        assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Inactive);
        let s = sub(BillingCycle::Quarterly, SubscriptionStatus::Active, None);
        assert_eq!(resolve_status(&s, now()), SubscriptionStatus::Active);
    }

    #[test]
    fn test_statuses_to_reconcile_only_divergent() {
        let mut stale = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            Some(now() - Duration::days(1)),
        );
        stale.id = 10;
        let mut fine = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            Some(now() + Duration::days(1)),
        );
        fine.id = 11;
        let mut cancelled = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Cancelled,
            Some(now() - Duration::days(1)),
        );
        cancelled.id = 12;

        let changes = statuses_to_reconcile(&[stale, fine, cancelled], now());
        assert_eq!(changes, vec![(10, SubscriptionStatus::Inactive)]);
    }

    #[test]
    fn test_sort_for_listing_undated_last() {
        let mut a = sub(BillingCycle::Monthly, SubscriptionStatus::Active, None);
        a.name = "Zeta".to_string();
        let mut b = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            Some(now() + Duration::days(5)),
        );
        b.name = "Beta".to_string();
        let mut c = sub(
            BillingCycle::Monthly,
            SubscriptionStatus::Active,
            Some(now() + Duration::days(1)),
        );
        c.name = "Gamma".to_string();

        let mut items = resolve_all(vec![a, b, c], now());
        sort_for_listing(&mut items);
        let names: Vec<_> = items.iter().map(|r| r.subscription.name.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Zeta"]);
    }
}
