//! Analytics handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser};
use subhub_core::models::{AnalyticsReport, BillingCycle, ReportPeriod, SpendingView};
use subhub_core::{analytics_report, spending_view, SubscriptionStore};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    /// 3months, 6months or 12months
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpendingQuery {
    /// monthly, quarterly or yearly
    pub view: Option<String>,
}

/// GET /api/analytics - Spend report over a lookback period (default: 6 months)
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>, AppError> {
    let period = match params.period.as_deref() {
        Some(p) => p
            .parse::<ReportPeriod>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => ReportPeriod::default(),
    };

    let subscriptions = state.db.find_by_owner(current.user.id)?;
    let report = analytics_report(&subscriptions, period, state.clock.now());

    state.db.log_audit(
        &current.user.email,
        "view",
        Some("analytics"),
        None,
        Some(&format!("period={}", period.as_str())),
    )?;

    Ok(Json(report))
}

/// GET /api/analytics/spending - Active spend normalized to one cadence (default: monthly)
pub async fn get_spending(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<SpendingQuery>,
) -> Result<Json<SpendingView>, AppError> {
    let view = match params.view.as_deref() {
        Some(v) => v
            .parse::<BillingCycle>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => BillingCycle::Monthly,
    };
    if view == BillingCycle::Free {
        return Err(AppError::bad_request(
            "View must be monthly, quarterly or yearly",
        ));
    }

    let subscriptions = state.db.find_by_owner(current.user.id)?;
    let spending = spending_view(&subscriptions, view, state.clock.now());

    state.db.log_audit(
        &current.user.email,
        "view",
        Some("spending"),
        None,
        Some(&format!("view={}", view.as_str())),
    )?;

    Ok(Json(spending))
}
