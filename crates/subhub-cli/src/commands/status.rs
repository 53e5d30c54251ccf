//! Dashboard command implementation

use anyhow::Result;
use chrono::{Duration, Utc};
use subhub_core::analytics::UPCOMING_DAYS;
use subhub_core::db::Database;
use subhub_core::models::{BillingCycle, SubscriptionStatus, User};
use subhub_core::status::resolve_all;
use subhub_core::{spending_view, SubscriptionStore};

use super::truncate;

pub fn cmd_dashboard(db: &Database, user: &User) -> Result<()> {
    let now = Utc::now();
    let subscriptions = db.find_by_owner(user.id)?;
    let resolved = resolve_all(subscriptions.clone(), now);
    let spending = spending_view(&subscriptions, BillingCycle::Monthly, now);

    let count = |status: SubscriptionStatus| {
        resolved
            .iter()
            .filter(|r| r.effective_status == status)
            .count()
    };

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│          📋 SubHub Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  User:            {}", user.email);
    println!("  Active:          {}", count(SubscriptionStatus::Active));
    println!("  Lapsed:          {}", count(SubscriptionStatus::Inactive));
    println!("  Cancelled:       {}", count(SubscriptionStatus::Cancelled));
    println!();
    println!("  Monthly spend:   ${:.2}", spending.monthly_total);
    println!("  Annual spend:    ${:.2}", spending.annual_total);

    if spending.upcoming.is_empty() {
        println!();
        println!("  ✅ Nothing due in the next {} days", UPCOMING_DAYS);
    } else {
        println!();
        println!("  📅 Due in the next {} days:", UPCOMING_DAYS);
        for payment in &spending.upcoming {
            let days = (payment.next_due_date.date_naive() - now.date_naive()).num_days();
            let when = match days {
                0 => "today".to_string(),
                1 => "tomorrow".to_string(),
                n => format!("in {} days", n),
            };
            println!(
                "     {:20} ${:>8.2}  {}",
                truncate(&payment.name, 20),
                payment.cost,
                when
            );
        }
    }

    let overdue: Vec<_> = resolved
        .iter()
        .filter(|r| r.effective_status == SubscriptionStatus::Inactive)
        .filter(|r| {
            r.subscription
                .next_due_date
                .is_some_and(|d| d > now - Duration::days(30))
        })
        .collect();
    if !overdue.is_empty() {
        println!();
        println!("  ⚠️  Recently lapsed (renew or cancel):");
        for r in overdue {
            println!("     {} (ID: {})", r.subscription.name, r.subscription.id);
        }
    }

    if spending.savings.total > 0.0 {
        println!();
        println!(
            "  💡 Run 'subhub report spending' to see ${:.2} in potential savings",
            spending.savings.total
        );
    }
    println!();

    Ok(())
}
