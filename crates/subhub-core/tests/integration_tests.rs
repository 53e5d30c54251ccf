//! Integration tests for subhub-core
//!
//! These tests exercise the create → remind → reconcile → report workflow
//! against a real SQLite store.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use subhub_core::{
    analytics::{analytics_report, spending_view},
    clock::FixedClock,
    db::Database,
    models::{BillingCycle, NewSubscription, ReportPeriod, SubscriptionStatus},
    notify::{MockTransport, NotificationTransport},
    status::resolve_all,
    ReminderDispatcher, SubscriptionStore,
};

fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
}

fn paid(name: &str, cost: f64, cycle: BillingCycle, due: DateTime<Utc>) -> NewSubscription {
    NewSubscription {
        name: name.to_string(),
        cost,
        billing_cycle: Some(cycle),
        next_due_date: Some(due),
        category: Some("Entertainment".to_string()),
        ..Default::default()
    }
}

// =============================================================================
// Reminder Workflow
// =============================================================================

#[tokio::test]
async fn test_reminder_run_against_database() {
    let db = Database::in_memory().expect("Failed to create test database");
    let user = db
        .upsert_user("sam@example.com", Some("Sam"))
        .expect("Failed to create user");

    let due_soon = db
        .create_subscription(
            user.id,
            &paid("Netflix", 10.0, BillingCycle::Monthly, run_time() + Duration::days(5)),
        )
        .unwrap();
    db.create_subscription(
        user.id,
        &paid("Far Away", 10.0, BillingCycle::Monthly, run_time() + Duration::days(20)),
    )
    .unwrap();
    db.create_subscription(
        user.id,
        &NewSubscription {
            name: "Free Tier".to_string(),
            billing_cycle: Some(BillingCycle::Free),
            next_due_date: Some(run_time() + Duration::days(1)),
            ..Default::default()
        },
    )
    .unwrap();

    let transport = MockTransport::new();
    let clock = FixedClock::new(run_time());
    let dispatcher = ReminderDispatcher::new(&db, &transport, &clock);

    let result = dispatcher.dispatch(7).await.expect("Reminder run failed");
    assert_eq!(result.checked, 1);
    assert_eq!(result.sent, 1);

    let sent = transport.sent();
    assert_eq!(sent[0].recipient, "sam@example.com");
    assert_eq!(sent[0].subject, "Upcoming payment for Netflix in 5 days");
    assert!(sent[0].body.contains("Hi Sam,"));

    let stored = db.find_by_id(due_soon.id).unwrap().unwrap();
    assert_eq!(stored.last_reminder_sent, Some(run_time()));

    // A second run the same day is a no-op
    clock.advance(Duration::hours(6));
    let again = dispatcher.dispatch(7).await.unwrap();
    assert_eq!(again.checked, 1);
    assert_eq!(again.sent, 0);
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_reminder_failure_leaves_marker_unset() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("bounce@example.com", None).unwrap();
    let sub = db
        .create_subscription(
            user.id,
            &paid("Gym", 30.0, BillingCycle::Monthly, run_time() + Duration::days(2)),
        )
        .unwrap();

    let transport = MockTransport::new();
    transport.fail_for("bounce@example.com");
    let clock = FixedClock::new(run_time());

    let result = ReminderDispatcher::new(&db, &transport, &clock)
        .dispatch(7)
        .await
        .unwrap();
    assert_eq!(result.checked, 1);
    assert_eq!(result.sent, 0);
    assert_eq!(
        db.find_by_id(sub.id).unwrap().unwrap().last_reminder_sent,
        None
    );
}

/// Cancels a subscription while its reminder is being delivered
struct CancelWhileSending {
    db: Database,
    id: i64,
}

#[async_trait]
impl NotificationTransport for CancelWhileSending {
    async fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> subhub_core::Result<()> {
        self.db.cancel_subscription(self.id, None)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cancel-while-sending"
    }
}

#[tokio::test]
async fn test_cancel_during_send_survives_marker_write() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("sam@example.com", None).unwrap();
    let sub = db
        .create_subscription(
            user.id,
            &paid("Gym", 30.0, BillingCycle::Monthly, run_time() + Duration::days(2)),
        )
        .unwrap();

    let transport = CancelWhileSending {
        db: db.clone(),
        id: sub.id,
    };
    let clock = FixedClock::new(run_time());
    let result = ReminderDispatcher::new(&db, &transport, &clock)
        .dispatch(7)
        .await
        .unwrap();
    assert_eq!(result.sent, 1);

    let stored = db.find_by_id(sub.id).unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Cancelled);
    assert_eq!(stored.last_reminder_sent, Some(run_time()));
}

// =============================================================================
// Status + Analytics
// =============================================================================

#[test]
fn test_status_listing_and_reconcile() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("sam@example.com", None).unwrap();
    let now = run_time();

    db.create_subscription(
        user.id,
        &paid("Lapsed", 12.0, BillingCycle::Monthly, now - Duration::days(10)),
    )
    .unwrap();
    db.create_subscription(
        user.id,
        &paid("Current", 120.0, BillingCycle::Yearly, now + Duration::days(10)),
    )
    .unwrap();

    // Reading never writes
    let listed = resolve_all(db.find_by_owner(user.id).unwrap(), now);
    let lapsed = listed
        .iter()
        .find(|r| r.subscription.name == "Lapsed")
        .unwrap();
    assert_eq!(lapsed.effective_status, SubscriptionStatus::Inactive);
    assert_eq!(lapsed.subscription.status, SubscriptionStatus::Active);

    let reconciled = db.reconcile_statuses(Some(user.id), now).unwrap();
    assert_eq!(reconciled.updated, 1);
    let stored = db.find_by_id(lapsed.subscription.id).unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Inactive);
}

#[test]
fn test_reports_from_database() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("sam@example.com", None).unwrap();
    let now = run_time();

    db.create_subscription(
        user.id,
        &paid("Gym", 12.0, BillingCycle::Monthly, now + Duration::days(3)),
    )
    .unwrap();
    db.create_subscription(
        user.id,
        &paid("Cloud", 120.0, BillingCycle::Yearly, now + Duration::days(40)),
    )
    .unwrap();
    db.create_subscription(
        user.id,
        &paid("Old Paper", 20.0, BillingCycle::Monthly, now - Duration::days(20)),
    )
    .unwrap();

    let subscriptions = db.find_by_owner(user.id).unwrap();

    let view = spending_view(&subscriptions, BillingCycle::Monthly, now);
    assert_eq!(view.active_count, 2);
    assert!((view.total - 22.0).abs() < 1e-9);
    assert!((view.savings.inactive - 20.0).abs() < 1e-9);
    assert_eq!(view.upcoming.len(), 1);
    assert_eq!(view.upcoming[0].name, "Gym");

    let report = analytics_report(&subscriptions, ReportPeriod::ThreeMonths, now);
    assert_eq!(report.summary.top_subscription, "Old Paper");
    assert_eq!(report.summary.active_categories, 1);
    assert!((report.summary.total_spent - 20.0).abs() < 1e-9);
}
