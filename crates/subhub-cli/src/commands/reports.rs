//! Report command implementations

use anyhow::{bail, Result};
use chrono::Utc;
use subhub_core::db::Database;
use subhub_core::models::{BillingCycle, ReportPeriod, User};
use subhub_core::{analytics_report, spending_view, SubscriptionStore};

use super::truncate;

pub fn cmd_report_analytics(db: &Database, user: &User, period: &str, json: bool) -> Result<()> {
    let period: ReportPeriod = period.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let subscriptions = db.find_by_owner(user.id)?;
    let report = analytics_report(&subscriptions, period, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "📊 Spending Report: {} to {}",
        report.start_date.format("%Y-%m-%d"),
        report.end_date.format("%Y-%m-%d")
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total spent:        ${:.2}", report.summary.total_spent);
    println!("   Active categories:  {}", report.summary.active_categories);
    println!("   Top subscription:   {}", report.summary.top_subscription);

    if !report.charts.category_breakdown.is_empty() {
        println!();
        println!("   By category:");
        for entry in &report.charts.category_breakdown {
            println!(
                "   {:20} │ ${:>9.2} │ {} payment(s)",
                truncate(&entry.category, 20),
                entry.total_spent,
                entry.count
            );
        }
    }

    if !report.charts.monthly_trend.is_empty() {
        println!();
        println!("   By month:");
        for point in &report.charts.monthly_trend {
            println!("   {:20} │ ${:>9.2}", point.month, point.total_spent);
        }
    }

    if !report.charts.top_subscriptions.is_empty() {
        println!();
        println!("   Top subscriptions:");
        for (i, top) in report.charts.top_subscriptions.iter().enumerate() {
            println!(
                "   {}. {:17} │ ${:>9.2}",
                i + 1,
                truncate(&top.name, 17),
                top.total_spent
            );
        }
    }

    Ok(())
}

pub fn cmd_report_spending(db: &Database, user: &User, view: &str, json: bool) -> Result<()> {
    let view: BillingCycle = view.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    if view == BillingCycle::Free {
        bail!("View must be monthly, quarterly or yearly");
    }

    let subscriptions = db.find_by_owner(user.id)?;
    let spending = spending_view(&subscriptions, view, Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&spending)?);
        return Ok(());
    }

    println!();
    println!("💰 Spending ({} view)", view.as_str());
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Active subscriptions: {}", spending.active_count);
    println!("   Total per cycle:      ${:.2}", spending.total);
    println!("   Monthly equivalent:   ${:.2}", spending.monthly_total);
    println!("   Annual equivalent:    ${:.2}", spending.annual_total);

    if !spending.categories.is_empty() {
        println!();
        println!("   By category:");
        for entry in &spending.categories {
            println!("   {:20} │ ${:>9.2}", truncate(&entry.category, 20), entry.cost);
        }
    }

    if !spending.upcoming.is_empty() {
        println!();
        println!("   Due this week:");
        for payment in &spending.upcoming {
            println!(
                "   {} │ {:20} │ ${:.2}",
                payment.next_due_date.format("%Y-%m-%d"),
                truncate(&payment.name, 20),
                payment.cost
            );
        }
    }

    println!();
    println!("   💡 Potential savings");
    println!("      Lapsed subscriptions:  ${:.2}/month", spending.savings.inactive);
    println!(
        "      Switching to yearly:   ${:.2}/year",
        spending.savings.switch_to_yearly
    );

    Ok(())
}
