//! Payment reminders
//!
//! A reminder run selects Active subscriptions due within a rolling window of
//! UTC days, skips any already reminded today, and hands one message per
//! subscription to a [`NotificationTransport`]. The `last_reminder_sent`
//! marker makes repeated runs on the same day harmless.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{ReminderRunResult, Subscription, SubscriptionStatus, User};
use crate::notify::NotificationTransport;
use crate::store::SubscriptionStore;

/// Default lead time in days
pub const DEFAULT_DAYS_BEFORE: u32 = 7;

/// Closed interval of instants a due date must fall in to get a reminder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReminderWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReminderWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Window from the start of `now`'s UTC day to the last millisecond of the
/// day `days_before` days later
///
/// Very long lead times saturate at the end of year 9999, the last instant
/// the store can represent.
pub fn reminder_window(now: DateTime<Utc>, days_before: u32) -> ReminderWindow {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let latest = latest_window_end();
    let end = start
        .checked_add_signed(Duration::days(i64::from(days_before)))
        .and_then(|day| day.checked_add_signed(Duration::milliseconds(86_399_999)))
        .map_or(latest, |end| end.min(latest));
    ReminderWindow { start, end }
}

fn latest_window_end() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|day| day.and_hms_milli_opt(23, 59, 59, 999))
        .map_or(DateTime::<Utc>::MAX_UTC, |end| end.and_utc())
}

/// Whole UTC calendar days from the window start to the due date
///
/// 0 when due today. Due dates are date-like (midnight), where this equals
/// rounding the elapsed time up to whole days.
pub fn days_until_due(due: DateTime<Utc>, window_start: DateTime<Utc>) -> i64 {
    (due.date_naive() - window_start.date_naive()).num_days().max(0)
}

/// True if a reminder already went out on the window's start day
pub fn already_reminded(subscription: &Subscription, window_start: DateTime<Utc>) -> bool {
    subscription
        .last_reminder_sent
        .is_some_and(|sent| sent.date_naive() == window_start.date_naive())
}

/// True for `local@domain` shaped identities
///
/// Placeholder identities such as `local-dev` or `api-key` own subscriptions
/// but cannot receive mail.
pub fn is_email_address(identity: &str) -> bool {
    identity
        .trim()
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@')
        })
}

/// A rendered reminder message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Reminder {
    pub fn build(
        owner: &User,
        subscription: &Subscription,
        due: DateTime<Utc>,
        days_left: i64,
    ) -> Self {
        let days = if days_left == 1 { "day" } else { "days" };
        let subject = format!(
            "Upcoming payment for {} in {} {}",
            subscription.name, days_left, days
        );

        let greeting = owner
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("there");
        let mut body = format!(
            "Hi {},\n\n\
             This is a reminder that your subscription for \"{}\" (${:.2}, {}) is due on {}, \
             in {} {}.\n",
            greeting,
            subscription.name,
            subscription.cost,
            subscription.billing_cycle.label().to_lowercase(),
            due.format("%A, %B %-d, %Y"),
            days_left,
            days,
        );
        let link = subscription
            .metadata
            .payment_url
            .as_deref()
            .or(subscription.metadata.manage_url.as_deref());
        if let Some(link) = link {
            body.push_str(&format!("\nManage it here: {}\n", link));
        }
        body.push_str("\nThe SubHub Team\n");

        Self {
            recipient: owner.email.trim().to_string(),
            subject,
            body,
        }
    }
}

/// Runs one reminder pass against a store and transport
pub struct ReminderDispatcher<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    transport: &'a T,
    clock: &'a dyn Clock,
}

impl<'a, S, T> ReminderDispatcher<'a, S, T>
where
    S: SubscriptionStore + ?Sized,
    T: NotificationTransport + ?Sized,
{
    pub fn new(store: &'a S, transport: &'a T, clock: &'a dyn Clock) -> Self {
        Self {
            store,
            transport,
            clock,
        }
    }

    /// Send reminders for subscriptions due within `days_before` days
    ///
    /// Only the reminder marker is written back, so edits made while a message
    /// is in flight survive. Per-subscription send or save failures are
    /// logged and skipped. A
    /// failure to select candidates aborts the run.
    pub async fn dispatch(&self, days_before: u32) -> Result<ReminderRunResult> {
        let now = self.clock.now();
        let window = reminder_window(now, days_before);

        let candidates = self.store.find_due_within_window(
            SubscriptionStatus::Active,
            window.start,
            window.end,
        )?;

        let mut result = ReminderRunResult::default();
        for candidate in candidates {
            result.checked += 1;
            let subscription = candidate.subscription;

            let Some(owner) = candidate
                .owner
                .filter(|owner| is_email_address(&owner.email))
            else {
                debug!(id = subscription.id, "Skipping reminder: owner has no contact address");
                continue;
            };
            let Some(due) = subscription.next_due_date else {
                continue;
            };
            if already_reminded(&subscription, window.start) {
                debug!(id = subscription.id, "Skipping reminder: already sent today");
                continue;
            }

            let days_left = days_until_due(due, window.start);
            let reminder = Reminder::build(&owner, &subscription, due, days_left);

            if let Err(e) = self
                .transport
                .send(&reminder.recipient, &reminder.subject, &reminder.body)
                .await
            {
                warn!(
                    id = subscription.id,
                    transport = self.transport.name(),
                    error = %e,
                    "Failed to send reminder"
                );
                continue;
            }

            match self.store.mark_reminded(subscription.id, now) {
                Ok(true) => result.sent += 1,
                Ok(false) => {
                    warn!(id = subscription.id, "Reminder sent but subscription was deleted");
                }
                Err(e) => {
                    warn!(id = subscription.id, error = %e, "Reminder sent but marker not saved");
                }
            }
        }

        info!(
            checked = result.checked,
            sent = result.sent,
            days_before,
            "Reminder run complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{BillingCycle, SubscriptionMetadata};
    use crate::notify::MockTransport;
    use crate::test_utils::MemoryStore;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn user(id: i64, email: &str) -> User {
        User {
            id,
            email: email.to_string(),
            name: Some("Sam".to_string()),
            created_at: at(2024, 1, 1, 0, 0),
        }
    }

    fn monthly(id: i64, user_id: i64, due: DateTime<Utc>) -> Subscription {
        Subscription {
            id,
            user_id,
            name: format!("Service {}", id),
            cost: 10.0,
            billing_cycle: BillingCycle::Monthly,
            next_due_date: Some(due),
            category: "Other".to_string(),
            status: SubscriptionStatus::Active,
            last_reminder_sent: None,
            metadata: SubscriptionMetadata::default(),
            created_at: at(2024, 1, 1, 0, 0),
            updated_at: at(2024, 1, 1, 0, 0),
        }
    }

    #[test]
    fn test_window_bounds() {
        let now = at(2024, 6, 15, 14, 30);
        let window = reminder_window(now, 7);
        assert_eq!(window.start, at(2024, 6, 15, 0, 0));
        assert_eq!(
            window.end,
            Utc.with_ymd_and_hms(2024, 6, 22, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + Duration::milliseconds(1)));
    }

    #[test]
    fn test_window_zero_days_is_today() {
        let now = at(2024, 12, 31, 23, 0);
        let window = reminder_window(now, 0);
        assert_eq!(window.start, at(2024, 12, 31, 0, 0));
        assert_eq!(window.end.date_naive(), now.date_naive());
    }

    #[test]
    fn test_window_saturates_for_long_lead_times() {
        let now = at(2024, 6, 15, 9, 0);
        let window = reminder_window(now, 200_000_000);
        assert_eq!(window.start, at(2024, 6, 15, 0, 0));
        assert_eq!(window.end, latest_window_end());
        assert!(window.contains(at(9999, 12, 31, 0, 0)));

        let window = reminder_window(now, u32::MAX);
        assert_eq!(window.end, latest_window_end());
    }

    #[test]
    fn test_days_until_due() {
        let start = at(2024, 6, 15, 0, 0);
        assert_eq!(days_until_due(at(2024, 6, 15, 0, 0), start), 0);
        assert_eq!(days_until_due(at(2024, 6, 20, 0, 0), start), 5);
        assert_eq!(days_until_due(at(2024, 6, 22, 23, 59), start), 7);
    }

    #[test]
    fn test_is_email_address() {
        assert!(is_email_address("sam@example.com"));
        assert!(is_email_address("  sam@example.com "));
        assert!(!is_email_address("local-dev"));
        assert!(!is_email_address("api-key"));
        assert!(!is_email_address("@example.com"));
        assert!(!is_email_address("sam@"));
        assert!(!is_email_address("a@b@c"));
        assert!(!is_email_address("   "));
    }

    #[test]
    fn test_reminder_text() {
        let owner = user(1, "sam@example.com");
        let mut sub = monthly(1, 1, at(2024, 6, 20, 0, 0));
        sub.name = "Netflix".to_string();
        sub.metadata.manage_url = Some("https://netflix.com/account".to_string());

        let reminder = Reminder::build(&owner, &sub, at(2024, 6, 20, 0, 0), 1);
        assert_eq!(reminder.recipient, "sam@example.com");
        assert_eq!(reminder.subject, "Upcoming payment for Netflix in 1 day");
        assert!(reminder.body.starts_with("Hi Sam,"));
        assert!(reminder.body.contains("$10.00"));
        assert!(reminder.body.contains("Thursday, June 20, 2024"));
        assert!(reminder.body.contains("https://netflix.com/account"));
    }

    #[tokio::test]
    async fn test_dispatch_sends_and_marks() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "sam@example.com"));
        store.add_subscription(monthly(1, 1, now + Duration::days(5)));

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult { checked: 1, sent: 1 });
        let sent = transport.sent();
        assert_eq!(sent[0].subject, "Upcoming payment for Service 1 in 5 days");
        assert_eq!(store.get(1).unwrap().last_reminder_sent, Some(now));
    }

    #[tokio::test]
    async fn test_dispatch_same_day_dedup() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "sam@example.com"));
        let mut sub = monthly(1, 1, now + Duration::days(2));
        sub.last_reminder_sent = Some(at(2024, 6, 15, 0, 5));
        store.add_subscription(sub);

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult { checked: 1, sent: 0 });
        assert_eq!(transport.send_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_twice_same_day_sends_once() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "sam@example.com"));
        store.add_subscription(monthly(1, 1, now + Duration::days(1)));

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let dispatcher = ReminderDispatcher::new(&store, &transport, &clock);
        assert_eq!(dispatcher.dispatch(7).await.unwrap().sent, 1);

        clock.advance(Duration::hours(3));
        assert_eq!(dispatcher.dispatch(7).await.unwrap().sent, 0);

        clock.advance(Duration::days(1));
        assert_eq!(dispatcher.dispatch(7).await.unwrap().sent, 1);
        assert_eq!(transport.send_count(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_isolates_failures() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "broken@example.com"));
        store.add_user(user(2, "ok@example.com"));
        store.add_subscription(monthly(1, 1, now + Duration::days(1)));
        store.add_subscription(monthly(2, 2, now + Duration::days(2)));

        let transport = MockTransport::new();
        transport.fail_for("broken@example.com");
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult { checked: 2, sent: 1 });
        assert_eq!(store.get(1).unwrap().last_reminder_sent, None);
        assert_eq!(store.get(2).unwrap().last_reminder_sent, Some(now));
    }

    #[tokio::test]
    async fn test_dispatch_skips_missing_owner_and_email() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(2, "  "));
        store.add_user(user(3, "api-key"));
        store.add_subscription(monthly(1, 99, now + Duration::days(1)));
        store.add_subscription(monthly(2, 2, now + Duration::days(1)));
        store.add_subscription(monthly(3, 3, now + Duration::days(1)));

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult { checked: 3, sent: 0 });
        assert_eq!(transport.send_count(), 0);
        assert_eq!(store.get(3).unwrap().last_reminder_sent, None);
    }

    #[tokio::test]
    async fn test_dispatch_window_edges() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "sam@example.com"));
        // Earlier today still counts; the window starts at midnight
        store.add_subscription(monthly(1, 1, at(2024, 6, 15, 1, 0)));
        store.add_subscription(monthly(2, 1, at(2024, 6, 22, 23, 59)));
        store.add_subscription(monthly(3, 1, at(2024, 6, 23, 0, 0)));
        store.add_subscription(monthly(4, 1, at(2024, 6, 14, 23, 59)));

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult { checked: 2, sent: 2 });
        let subjects: Vec<_> = transport.sent().into_iter().map(|m| m.subject).collect();
        assert!(subjects.contains(&"Upcoming payment for Service 1 in 0 days".to_string()));
        assert!(subjects.contains(&"Upcoming payment for Service 2 in 7 days".to_string()));
    }

    #[tokio::test]
    async fn test_dispatch_ignores_free_and_inactive() {
        let now = at(2024, 6, 15, 9, 0);
        let store = MemoryStore::new();
        store.add_user(user(1, "sam@example.com"));
        let mut free = monthly(1, 1, now + Duration::days(1));
        free.billing_cycle = BillingCycle::Free;
        free.cost = 0.0;
        let mut cancelled = monthly(2, 1, now + Duration::days(1));
        cancelled.status = SubscriptionStatus::Cancelled;
        store.add_subscription(free);
        store.add_subscription(cancelled);

        let transport = MockTransport::new();
        let clock = FixedClock::new(now);
        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await
            .unwrap();

        assert_eq!(result, ReminderRunResult::default());
    }

    #[tokio::test]
    async fn test_dispatch_selection_failure_propagates() {
        let store = MemoryStore::new();
        store.fail_selection();
        let transport = MockTransport::new();
        let clock = FixedClock::new(at(2024, 6, 15, 9, 0));

        let result = ReminderDispatcher::new(&store, &transport, &clock)
            .dispatch(7)
            .await;
        assert!(result.is_err());
    }
}
