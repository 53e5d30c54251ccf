//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use subhub_core::db::Database;
use subhub_core::models::{BillingCycle, SubscriptionStatus, User};
use subhub_core::test_utils::{new_subscription, seed_user};
use subhub_core::{FixedClock, MockTransport, SubscriptionStore};
use tempfile::TempDir;

use crate::cli::{Cli, Commands, ReportType, SubscriptionsAction};
use crate::commands::{self, truncate};

fn setup_test_db() -> (Database, User) {
    let db = Database::in_memory().unwrap();
    let user = seed_user(&db, "cli@example.com");
    (db, user)
}

// ========== Database Setup Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("subhub.db");

    commands::cmd_init(&path, true).unwrap();
    assert!(path.exists());

    // Reopening an initialized database is fine
    let db = commands::open_db(&path, true).unwrap();
    assert!(db.list_users().unwrap().is_empty());
}

#[test]
fn test_current_user_provisions_once() {
    let (db, _) = setup_test_db();
    let first = commands::current_user(&db, "new@example.com").unwrap();
    let second = commands::current_user(&db, "NEW@example.com").unwrap();
    assert_eq!(first.id, second.id);

    assert!(commands::current_user(&db, "  ").is_err());
}

// ========== Users Command Tests ==========

#[test]
fn test_cmd_users_add_list_delete() {
    let (db, _) = setup_test_db();

    commands::cmd_users_add(&db, "sam@example.com", Some("Sam")).unwrap();
    commands::cmd_users_list(&db).unwrap();

    let sam = db.get_user_by_email("sam@example.com").unwrap().unwrap();
    assert_eq!(sam.name.as_deref(), Some("Sam"));
    db.create_subscription(
        sam.id,
        &new_subscription("Music", 9.99, BillingCycle::Monthly, None),
    )
    .unwrap();

    commands::cmd_users_delete(&db, "sam@example.com").unwrap();
    assert!(db.get_user_by_email("sam@example.com").unwrap().is_none());
    assert!(db.find_by_owner(sam.id).unwrap().is_empty());

    let result = commands::cmd_users_delete(&db, "sam@example.com");
    assert!(result.unwrap_err().to_string().contains("not found"));
}

// ========== Subscriptions Command Tests ==========

#[test]
fn test_cmd_subscriptions_add() {
    let (db, user) = setup_test_db();

    commands::cmd_subscriptions_add(
        &db,
        &user,
        "Netflix",
        15.99,
        "monthly",
        Some("2030-01-15"),
        Some("Entertainment"),
        Some("https://netflix.example/pay"),
    )
    .unwrap();

    let subs = db.find_by_owner(user.id).unwrap();
    assert_eq!(subs.len(), 1);
    let sub = &subs[0];
    assert_eq!(sub.name, "Netflix");
    assert_eq!(sub.billing_cycle, BillingCycle::Monthly);
    assert_eq!(sub.category, "Entertainment");
    assert_eq!(sub.status, SubscriptionStatus::Active);
    assert_eq!(
        sub.next_due_date,
        Some(Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap())
    );
    assert_eq!(
        sub.metadata.payment_url.as_deref(),
        Some("https://netflix.example/pay")
    );
}

#[test]
fn test_cmd_subscriptions_add_rejects_bad_input() {
    let (db, user) = setup_test_db();

    let result =
        commands::cmd_subscriptions_add(&db, &user, "Weekly", 1.0, "weekly", None, None, None);
    assert!(result.is_err());

    let result = commands::cmd_subscriptions_add(
        &db,
        &user,
        "Bad Date",
        1.0,
        "monthly",
        Some("next tuesday"),
        None,
        None,
    );
    assert!(result.unwrap_err().to_string().contains("Invalid date"));

    let result =
        commands::cmd_subscriptions_add(&db, &user, "Negative", -5.0, "monthly", None, None, None);
    assert!(result.is_err());

    assert!(db.find_by_owner(user.id).unwrap().is_empty());
}

#[test]
fn test_cmd_subscriptions_list() {
    let (db, user) = setup_test_db();
    let past = Utc::now() - Duration::days(3);
    let lapsed = db
        .create_subscription(
            user.id,
            &new_subscription("Lapsed", 5.0, BillingCycle::Monthly, Some(past)),
        )
        .unwrap();

    commands::cmd_subscriptions_list(&db, &user, false, false).unwrap();
    commands::cmd_subscriptions_list(&db, &user, false, true).unwrap();
    assert_eq!(
        db.find_by_id(lapsed.id).unwrap().unwrap().status,
        SubscriptionStatus::Active
    );

    commands::cmd_subscriptions_list(&db, &user, true, false).unwrap();
    assert_eq!(
        db.find_by_id(lapsed.id).unwrap().unwrap().status,
        SubscriptionStatus::Inactive
    );
}

#[test]
fn test_cmd_subscriptions_cancel() {
    let (db, user) = setup_test_db();
    let sub = db
        .create_subscription(
            user.id,
            &new_subscription("Gym", 30.0, BillingCycle::Monthly, None),
        )
        .unwrap();

    commands::cmd_subscriptions_cancel(&db, &user, sub.id, None).unwrap();
    assert_eq!(
        db.find_by_id(sub.id).unwrap().unwrap().status,
        SubscriptionStatus::Cancelled
    );

    commands::cmd_subscriptions_cancel(&db, &user, sub.id, Some("active")).unwrap();
    assert_eq!(
        db.find_by_id(sub.id).unwrap().unwrap().status,
        SubscriptionStatus::Active
    );

    assert!(commands::cmd_subscriptions_cancel(&db, &user, sub.id, Some("paused")).is_err());
    assert!(commands::cmd_subscriptions_cancel(&db, &user, 9999, None).is_err());
}

#[test]
fn test_cmd_subscriptions_other_user_rejected() {
    let (db, owner) = setup_test_db();
    let other = seed_user(&db, "other@example.com");
    let sub = db
        .create_subscription(
            owner.id,
            &new_subscription("Private", 10.0, BillingCycle::Yearly, None),
        )
        .unwrap();

    let result = commands::cmd_subscriptions_delete(&db, &other, sub.id);
    assert!(result.unwrap_err().to_string().contains("does not belong"));
    assert!(db.find_by_id(sub.id).unwrap().is_some());

    commands::cmd_subscriptions_delete(&db, &owner, sub.id).unwrap();
    assert!(db.find_by_id(sub.id).unwrap().is_none());
}

#[test]
fn test_cmd_subscriptions_upgrade() {
    let (db, user) = setup_test_db();
    let free = db
        .create_subscription(
            user.id,
            &new_subscription("Notes", 0.0, BillingCycle::Free, None),
        )
        .unwrap();

    commands::cmd_subscriptions_upgrade(&db, &user, free.id, "yearly", 48.0, Some("2030-03-01"))
        .unwrap();
    let upgraded = db.find_by_id(free.id).unwrap().unwrap();
    assert_eq!(upgraded.billing_cycle, BillingCycle::Yearly);
    assert_eq!(upgraded.cost, 48.0);

    // Already paid
    let result = commands::cmd_subscriptions_upgrade(&db, &user, free.id, "monthly", 5.0, None);
    assert!(result.is_err());
}

#[test]
fn test_cmd_subscriptions_reconcile() {
    let (db, user) = setup_test_db();
    let other = seed_user(&db, "other@example.com");
    let past = Some(Utc::now() - Duration::days(10));
    for owner in [&user, &other] {
        db.create_subscription(
            owner.id,
            &new_subscription("Old", 5.0, BillingCycle::Monthly, past),
        )
        .unwrap();
    }

    commands::cmd_subscriptions_reconcile(&db).unwrap();
    for owner in [&user, &other] {
        let subs = db.find_by_owner(owner.id).unwrap();
        assert_eq!(subs[0].status, SubscriptionStatus::Inactive);
    }
}

// ========== Reminder Command Tests ==========

#[tokio::test]
async fn test_run_reminders_with_mock_transport() {
    let (db, user) = setup_test_db();
    let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
    db.create_subscription(
        user.id,
        &new_subscription("Cloud", 3.0, BillingCycle::Monthly, Some(now + Duration::days(1))),
    )
    .unwrap();

    let transport = MockTransport::new();
    let clock = FixedClock::new(now);

    let result = commands::run_reminders(&db, &transport, &clock, 7)
        .await
        .unwrap();
    assert_eq!(result.sent, 1);
    assert_eq!(
        transport.sent()[0].subject,
        "Upcoming payment for Cloud in 1 day"
    );

    assert!(commands::run_reminders(&db, &transport, &clock, 0)
        .await
        .is_err());
}

// ========== Report Command Tests ==========

#[test]
fn test_cmd_reports_empty() {
    let (db, user) = setup_test_db();
    commands::cmd_report_analytics(&db, &user, "6months", false).unwrap();
    commands::cmd_report_spending(&db, &user, "monthly", false).unwrap();
    commands::cmd_dashboard(&db, &user).unwrap();
}

#[test]
fn test_cmd_reports_with_data() {
    let (db, user) = setup_test_db();
    let now = Utc::now();
    db.create_subscription(
        user.id,
        &new_subscription("Soon", 12.0, BillingCycle::Monthly, Some(now + Duration::days(2))),
    )
    .unwrap();
    db.create_subscription(
        user.id,
        &new_subscription("Lapsed", 20.0, BillingCycle::Monthly, Some(now - Duration::days(5))),
    )
    .unwrap();

    commands::cmd_report_analytics(&db, &user, "3months", false).unwrap();
    commands::cmd_report_analytics(&db, &user, "12months", true).unwrap();
    commands::cmd_report_spending(&db, &user, "yearly", false).unwrap();
    commands::cmd_report_spending(&db, &user, "quarterly", true).unwrap();
    commands::cmd_dashboard(&db, &user).unwrap();
}

#[test]
fn test_cmd_reports_reject_unknown_options() {
    let (db, user) = setup_test_db();
    assert!(commands::cmd_report_analytics(&db, &user, "2weeks", false).is_err());
    assert!(commands::cmd_report_spending(&db, &user, "free", false).is_err());
    assert!(commands::cmd_report_spending(&db, &user, "daily", false).is_err());
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_subscriptions_add_args() {
    let cli = Cli::try_parse_from([
        "subhub",
        "--user",
        "sam@example.com",
        "subscriptions",
        "add",
        "Netflix",
        "--cost",
        "15.99",
        "--due",
        "2024-07-01",
    ])
    .unwrap();

    assert_eq!(cli.user, "sam@example.com");
    match cli.command {
        Commands::Subscriptions {
            action:
                Some(SubscriptionsAction::Add {
                    name, cost, cycle, ..
                }),
        } => {
            assert_eq!(name, "Netflix");
            assert_eq!(cost, 15.99);
            assert_eq!(cycle, "monthly");
        }
        _ => panic!("expected subscriptions add"),
    }
}

#[test]
fn test_parse_report_defaults() {
    let cli = Cli::try_parse_from(["subhub", "report", "analytics"]).unwrap();
    match cli.command {
        Commands::Report {
            report_type: ReportType::Analytics { period, json },
        } => {
            assert_eq!(period, "6months");
            assert!(!json);
        }
        _ => panic!("expected report analytics"),
    }
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long subscription name", 10), "a very ...");
    assert_eq!(truncate("Café Crème Deluxe", 8), "Café ...");
}
