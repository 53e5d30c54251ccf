//! Spend analytics
//!
//! Two reports over a user's subscriptions:
//! - [`analytics_report`]: raw costs of payments falling due inside a lookback
//!   period, broken down by category, month and subscription
//! - [`spending_view`]: current active subscriptions normalized to one cadence,
//!   with savings estimates and upcoming payments

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Months, Utc};

use crate::cost::{monthly_equivalent, normalize};
use crate::models::{
    AnalyticsCharts, AnalyticsReport, AnalyticsSummary, BillingCycle, CategoryBreakdown,
    CategoryCost, CycleCount, MonthlyTrendPoint, ReportPeriod, SavingsEstimate, SpendingView,
    Subscription, SubscriptionStatus, TopSubscription, UpcomingPayment,
};
use crate::status::resolve_status;

/// Number of entries in the top subscriptions chart
pub const TOP_SUBSCRIPTIONS_LIMIT: usize = 5;

/// Reported when there is no top subscription
pub const NO_TOP_SUBSCRIPTION: &str = "N/A";

/// Modeled discount for paying yearly instead of monthly
pub const MONTHLY_TO_YEARLY_DISCOUNT: f64 = 0.15;

/// Modeled discount for paying yearly instead of quarterly
pub const QUARTERLY_TO_YEARLY_DISCOUNT: f64 = 0.05;

/// How far ahead the spending view lists upcoming payments
pub const UPCOMING_DAYS: i64 = 7;

/// Start of the lookback window for a period ending at `now`
pub fn period_start(period: ReportPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(period.months()))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Build the period report from a user's subscriptions
///
/// Only subscriptions whose due date falls in `[now - period, now]` count.
/// Costs are summed as stored, without cadence normalization.
pub fn analytics_report(
    subscriptions: &[Subscription],
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> AnalyticsReport {
    let start = period_start(period, now);
    let in_window: Vec<(&Subscription, DateTime<Utc>)> = subscriptions
        .iter()
        .filter_map(|s| s.next_due_date.map(|due| (s, due)))
        .filter(|(_, due)| start <= *due && *due <= now)
        .collect();

    // Category breakdown
    let mut by_category: HashMap<&str, (f64, usize)> = HashMap::new();
    for (s, _) in &in_window {
        let entry = by_category.entry(s.category.as_str()).or_insert((0.0, 0));
        entry.0 += s.cost;
        entry.1 += 1;
    }
    let mut category_breakdown: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, (total_spent, count))| CategoryBreakdown {
            category: category.to_string(),
            total_spent,
            count,
        })
        .collect();
    category_breakdown.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.category.cmp(&b.category))
    });

    // Monthly trend, keys sort chronologically
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for (s, due) in &in_window {
        *by_month.entry(due.format("%Y-%m").to_string()).or_default() += s.cost;
    }
    let monthly_trend = by_month
        .into_iter()
        .map(|(month, total_spent)| MonthlyTrendPoint { month, total_spent })
        .collect();

    // Top subscriptions by name
    let mut by_name: HashMap<&str, (f64, usize)> = HashMap::new();
    for (s, _) in &in_window {
        let entry = by_name.entry(s.name.as_str()).or_insert((0.0, 0));
        entry.0 += s.cost;
        entry.1 += 1;
    }
    let mut top_subscriptions: Vec<TopSubscription> = by_name
        .into_iter()
        .map(|(name, (total_spent, occurrences))| TopSubscription {
            name: name.to_string(),
            total_spent,
            occurrences,
        })
        .collect();
    top_subscriptions.sort_by(|a, b| {
        b.total_spent
            .total_cmp(&a.total_spent)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_subscriptions.truncate(TOP_SUBSCRIPTIONS_LIMIT);

    let summary = AnalyticsSummary {
        total_spent: category_breakdown.iter().map(|c| c.total_spent).sum(),
        active_categories: category_breakdown.len(),
        top_subscription: top_subscriptions
            .first()
            .map(|t| t.name.clone())
            .unwrap_or_else(|| NO_TOP_SUBSCRIPTION.to_string()),
    };

    AnalyticsReport {
        period,
        start_date: start,
        end_date: now,
        summary,
        charts: AnalyticsCharts {
            category_breakdown,
            monthly_trend,
            top_subscriptions,
        },
    }
}

/// Build the cadence-normalized spending view
///
/// Counts subscriptions that resolve Active with a due date that is not yet
/// past; undated subscriptions have no billing to project. Every cost
/// is expressed per `view` cycle; a Free view leaves costs as stored.
pub fn spending_view(
    subscriptions: &[Subscription],
    view: BillingCycle,
    now: DateTime<Utc>,
) -> SpendingView {
    let (current, lapsed): (Vec<&Subscription>, Vec<&Subscription>) = subscriptions
        .iter()
        .filter(|s| resolve_status(s, now) != SubscriptionStatus::Cancelled)
        .partition(|s| resolve_status(s, now) == SubscriptionStatus::Active);
    let current: Vec<&Subscription> = current
        .into_iter()
        .filter(|s| s.next_due_date.is_some_and(|due| due >= now))
        .collect();

    let mut by_category: HashMap<&str, f64> = HashMap::new();
    for s in &current {
        *by_category.entry(s.category.as_str()).or_default() +=
            normalize(s.cost, s.billing_cycle, view);
    }
    let mut categories: Vec<CategoryCost> = by_category
        .into_iter()
        .map(|(category, cost)| CategoryCost {
            category: category.to_string(),
            cost,
        })
        .collect();
    categories.sort_by(|a, b| {
        b.cost
            .total_cmp(&a.cost)
            .then_with(|| a.category.cmp(&b.category))
    });

    let monthly_total: f64 = current
        .iter()
        .map(|s| monthly_equivalent(s.cost, s.billing_cycle))
        .sum();

    let billing_cycles = BillingCycle::PAID
        .iter()
        .map(|cycle| CycleCount {
            billing_cycle: *cycle,
            count: current.iter().filter(|s| s.billing_cycle == *cycle).count(),
        })
        .collect();

    let horizon = now + Duration::days(UPCOMING_DAYS);
    let mut upcoming: Vec<UpcomingPayment> = current
        .iter()
        .filter_map(|s| {
            let due = s.next_due_date?;
            (due <= horizon).then(|| UpcomingPayment {
                id: s.id,
                name: s.name.clone(),
                cost: s.cost,
                billing_cycle: s.billing_cycle,
                next_due_date: due,
            })
        })
        .collect();
    upcoming.sort_by(|a, b| a.next_due_date.cmp(&b.next_due_date));

    SpendingView {
        view,
        active_count: current.len(),
        total: categories.iter().map(|c| c.cost).sum(),
        monthly_total,
        annual_total: monthly_total * 12.0,
        categories,
        billing_cycles,
        upcoming,
        savings: savings_estimate(&current, &lapsed),
    }
}

fn savings_estimate(current: &[&Subscription], lapsed: &[&Subscription]) -> SavingsEstimate {
    let inactive: f64 = lapsed
        .iter()
        .map(|s| monthly_equivalent(s.cost, s.billing_cycle))
        .sum();

    let switch_to_yearly: f64 = current
        .iter()
        .map(|s| match s.billing_cycle {
            BillingCycle::Monthly => s.cost * 12.0 * MONTHLY_TO_YEARLY_DISCOUNT,
            BillingCycle::Quarterly => s.cost * 4.0 * QUARTERLY_TO_YEARLY_DISCOUNT,
            BillingCycle::Yearly | BillingCycle::Free => 0.0,
        })
        .sum();

    SavingsEstimate {
        inactive,
        switch_to_yearly,
        total: inactive + switch_to_yearly,
    }
}
