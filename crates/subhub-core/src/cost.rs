//! Billing-cycle cost normalization
//!
//! Converts a per-cycle cost into the equivalent cost over another cycle so
//! subscriptions on different cadences can be summed. Conversions scale by the
//! ratio of cycle lengths in months (monthly 1, quarterly 3, yearly 12).
//!
//! Nothing here rounds; presentation code decides how many decimals to show.

use crate::models::BillingCycle;

/// Convert `cost` billed every `source` cycle into the cost over one `target` cycle
///
/// Free sources have no recurring cost and normalize to zero. Free is not a
/// meaningful target, so the cost is returned unchanged.
pub fn normalize(cost: f64, source: BillingCycle, target: BillingCycle) -> f64 {
    let Some(target_months) = target.months() else {
        return cost;
    };
    match source.months() {
        None => 0.0,
        Some(source_months) if source_months == target_months => cost,
        Some(source_months) => cost * f64::from(target_months) / f64::from(source_months),
    }
}

/// Normalize using raw cycle names
///
/// Unrecognized names leave the cost as-is instead of failing.
pub fn normalize_str(cost: f64, source: &str, target: &str) -> f64 {
    match (source.parse::<BillingCycle>(), target.parse::<BillingCycle>()) {
        (Ok(source), Ok(target)) => normalize(cost, source, target),
        _ => cost,
    }
}

/// Monthly cost; the common baseline for comparing subscriptions
pub fn monthly_equivalent(cost: f64, cycle: BillingCycle) -> f64 {
    normalize(cost, cycle, BillingCycle::Monthly)
}

/// Yearly cost
pub fn annual_equivalent(cost: f64, cycle: BillingCycle) -> f64 {
    normalize(cost, cycle, BillingCycle::Yearly)
}
