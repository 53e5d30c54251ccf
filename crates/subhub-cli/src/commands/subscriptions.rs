//! Subscription command implementations

use anyhow::{bail, Result};
use chrono::Utc;
use subhub_core::db::Database;
use subhub_core::models::{
    BillingCycle, NewSubscription, Subscription, SubscriptionMetadata, SubscriptionStatus,
    SubscriptionUpgrade, User,
};
use subhub_core::status::{resolve_all, sort_for_listing};
use subhub_core::SubscriptionStore;

use super::{parse_due_arg, status_icon, truncate};

fn parse_cycle(s: &str) -> Result<BillingCycle> {
    s.parse().map_err(|e: String| anyhow::anyhow!(e))
}

/// Load a subscription owned by `user`
fn owned_subscription(db: &Database, user: &User, id: i64) -> Result<Subscription> {
    let subscription = db
        .find_by_id(id)?
        .ok_or_else(|| anyhow::anyhow!("Subscription not found: {}", id))?;
    if subscription.user_id != user.id {
        bail!("Subscription {} does not belong to {}", id, user.email);
    }
    Ok(subscription)
}

pub fn cmd_subscriptions_list(
    db: &Database,
    user: &User,
    reconcile: bool,
    json: bool,
) -> Result<()> {
    let now = Utc::now();
    if reconcile {
        let result = db.reconcile_statuses(Some(user.id), now)?;
        if result.updated > 0 && !json {
            println!("🔄 Updated {} subscription status(es)", result.updated);
        }
    }

    let mut subscriptions = resolve_all(db.find_by_owner(user.id)?, now);
    sort_for_listing(&mut subscriptions);

    if json {
        println!("{}", serde_json::to_string_pretty(&subscriptions)?);
        return Ok(());
    }

    if subscriptions.is_empty() {
        println!("No subscriptions for {} yet. Add one with:", user.email);
        println!("  subhub subscriptions add Netflix --cost 15.99 --due 2024-07-01");
        return Ok(());
    }

    println!();
    println!("📋 Subscriptions for {}", user.email);
    println!("   ─────────────────────────────────────────────────────────────");

    for resolved in subscriptions {
        let sub = &resolved.subscription;
        let due_str = sub
            .next_due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "   {} {:>4} {:20} │ {:>8}/{:<9} │ due {:10} │ {}",
            status_icon(resolved.effective_status),
            sub.id,
            truncate(&sub.name, 20),
            format!("${:.2}", sub.cost),
            sub.billing_cycle.as_str(),
            due_str,
            sub.category
        );
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_subscriptions_add(
    db: &Database,
    user: &User,
    name: &str,
    cost: f64,
    cycle: &str,
    due: Option<&str>,
    category: Option<&str>,
    payment_url: Option<&str>,
) -> Result<()> {
    let new = NewSubscription {
        name: name.to_string(),
        cost,
        billing_cycle: Some(parse_cycle(cycle)?),
        next_due_date: due.map(parse_due_arg).transpose()?,
        category: category.map(str::to_string),
        status: None,
        metadata: SubscriptionMetadata {
            payment_url: payment_url.map(str::to_string),
            ..Default::default()
        },
    };

    let subscription = db.create_subscription(user.id, &new)?;
    println!(
        "✅ Added {} (ID: {}) at ${:.2} {}",
        subscription.name,
        subscription.id,
        subscription.cost,
        subscription.billing_cycle.as_str()
    );
    Ok(())
}

pub fn cmd_subscriptions_cancel(
    db: &Database,
    user: &User,
    id: i64,
    status: Option<&str>,
) -> Result<()> {
    owned_subscription(db, user, id)?;
    let status = status
        .map(|s| s.parse::<SubscriptionStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let subscription = db
        .cancel_subscription(id, status)?
        .ok_or_else(|| anyhow::anyhow!("Subscription not found: {}", id))?;

    println!(
        "{} {} is now {}",
        status_icon(subscription.status),
        subscription.name,
        subscription.status
    );
    Ok(())
}

pub fn cmd_subscriptions_upgrade(
    db: &Database,
    user: &User,
    id: i64,
    cycle: &str,
    cost: f64,
    due: Option<&str>,
) -> Result<()> {
    owned_subscription(db, user, id)?;
    let upgrade = SubscriptionUpgrade {
        billing_cycle: Some(parse_cycle(cycle)?),
        cost: Some(cost),
        next_due_date: due.map(parse_due_arg).transpose()?,
    };

    let subscription = db
        .upgrade_subscription(id, &upgrade)?
        .ok_or_else(|| anyhow::anyhow!("Subscription not found: {}", id))?;

    println!(
        "⬆️  Upgraded {} to ${:.2} {}",
        subscription.name,
        subscription.cost,
        subscription.billing_cycle.as_str()
    );
    Ok(())
}

pub fn cmd_subscriptions_delete(db: &Database, user: &User, id: i64) -> Result<()> {
    let subscription = owned_subscription(db, user, id)?;
    db.delete_by_id(id)?;
    println!("🗑️  Deleted {} (ID: {})", subscription.name, id);
    Ok(())
}

/// Persist resolved statuses across every user
pub fn cmd_subscriptions_reconcile(db: &Database) -> Result<()> {
    let result = db.reconcile_statuses(None, Utc::now())?;
    println!(
        "🔄 Checked {} subscription(s), updated {}",
        result.checked, result.updated
    );
    Ok(())
}
