//! Subscription management handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{AppError, AppState, CurrentUser, SuccessResponse};
use subhub_core::models::{
    parse_due_date, BillingCycle, NewSubscription, ReconcileResult, ResolvedSubscription,
    Subscription, SubscriptionMetadata, SubscriptionStatus, SubscriptionUpdate,
    SubscriptionUpgrade, User,
};
use subhub_core::status::{resolve_all, resolve_status, sort_for_listing};
use subhub_core::SubscriptionStore;

/// Query params for listing subscriptions
#[derive(Debug, Deserialize)]
pub struct ListSubscriptionsQuery {
    /// Persist resolved statuses before listing
    #[serde(default)]
    pub reconcile: bool,
}

/// Request body for creating a subscription
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub name: Option<String>,
    pub cost: Option<f64>,
    pub billing_cycle: Option<String>,
    pub next_due_date: Option<String>,
    pub category: Option<String>,
    /// Ignored unless it names a valid status
    pub status: Option<String>,
    #[serde(flatten)]
    pub metadata: SubscriptionMetadata,
}

/// Request body for updating a subscription (all fields optional)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub name: Option<String>,
    pub cost: Option<f64>,
    pub billing_cycle: Option<String>,
    /// Empty string removes the due date
    pub next_due_date: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    #[serde(flatten)]
    pub metadata: SubscriptionMetadata,
}

/// Request body for cancelling a subscription
#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    /// Target status (default: cancelled)
    pub status: Option<String>,
}

/// Request body for upgrading a free subscription
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub billing_cycle: Option<String>,
    pub cost: Option<f64>,
    pub next_due_date: Option<String>,
}

fn parse_cycle(s: &str) -> Result<BillingCycle, AppError> {
    s.parse().map_err(|e: String| AppError::bad_request(&e))
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, AppError> {
    s.parse().map_err(|e: String| AppError::bad_request(&e))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, AppError> {
    parse_due_date(s).ok_or_else(|| {
        AppError::bad_request(&format!(
            "Invalid date: {} (expected YYYY-MM-DD or RFC 3339)",
            s
        ))
    })
}

/// Parse a JSON body that may be absent entirely
fn parse_optional_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request(&format!("Invalid JSON body: {}", e)))
}

/// Load a subscription the caller owns
///
/// Missing records are 404; records owned by someone else are 403.
fn load_owned(state: &AppState, id: i64, user: &User) -> Result<Subscription, AppError> {
    let subscription = state
        .db
        .find_by_id(id)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    if subscription.user_id != user.id {
        tracing::warn!(
            user = %user.email,
            subscription_id = id,
            "Rejected access to another user's subscription"
        );
        return Err(AppError::forbidden("Not authorized to access this subscription"));
    }
    Ok(subscription)
}

impl CreateSubscriptionRequest {
    fn into_new_subscription(self) -> Result<NewSubscription, AppError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| AppError::bad_request("Subscription must have a name"))?;
        let billing_cycle = self.billing_cycle.as_deref().map(parse_cycle).transpose()?;
        let cost = match (self.cost, billing_cycle) {
            (Some(cost), _) => cost,
            (None, Some(BillingCycle::Free)) => 0.0,
            (None, _) => return Err(AppError::bad_request("Subscription must have a cost")),
        };
        let next_due_date = self.next_due_date.as_deref().map(parse_date).transpose()?;
        // An unrecognized status falls back to the Active default
        let status = self.status.as_deref().and_then(|s| s.parse().ok());

        Ok(NewSubscription {
            name,
            cost,
            billing_cycle,
            next_due_date,
            category: self.category,
            status,
            metadata: self.metadata,
        })
    }
}

impl UpdateSubscriptionRequest {
    fn into_update(self) -> Result<SubscriptionUpdate, AppError> {
        let (next_due_date, clear_next_due_date) = match self.next_due_date.as_deref() {
            Some(s) if s.trim().is_empty() => (None, true),
            Some(s) => (Some(parse_date(s)?), false),
            None => (None, false),
        };
        Ok(SubscriptionUpdate {
            name: self.name,
            cost: self.cost,
            billing_cycle: self.billing_cycle.as_deref().map(parse_cycle).transpose()?,
            next_due_date,
            clear_next_due_date,
            category: self.category,
            status: self.status.as_deref().map(parse_status).transpose()?,
            metadata: self.metadata,
        })
    }
}

/// GET /api/subscriptions - List the caller's subscriptions with effective status
///
/// Pass `?reconcile=true` to persist any status changes first.
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListSubscriptionsQuery>,
) -> Result<Json<Vec<ResolvedSubscription>>, AppError> {
    let user = &current.user;
    let now = state.clock.now();

    let updated = if query.reconcile {
        state.db.reconcile_statuses(Some(user.id), now)?.updated
    } else {
        0
    };

    let mut subscriptions = resolve_all(state.db.find_by_owner(user.id)?, now);
    sort_for_listing(&mut subscriptions);

    // Audit log - read access
    state.db.log_audit(
        &user.email,
        "list",
        Some("subscription"),
        None,
        Some(&format!(
            "count={}, reconciled={}",
            subscriptions.len(),
            updated
        )),
    )?;

    Ok(Json(subscriptions))
}

/// POST /api/subscriptions - Create a subscription
pub async fn create_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let new = request.into_new_subscription()?;
    let subscription = state
        .db
        .create_subscription(current.user.id, &new)
        .map_err(AppError::from_core)?;

    state.db.log_audit(
        &current.user.email,
        "create",
        Some("subscription"),
        Some(subscription.id),
        Some(&format!("name={}", subscription.name)),
    )?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

/// GET /api/subscriptions/:id - Get one subscription with effective status
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ResolvedSubscription>, AppError> {
    let subscription = load_owned(&state, id, &current.user)?;
    let effective_status = resolve_status(&subscription, state.clock.now());

    state.db.log_audit(
        &current.user.email,
        "view",
        Some("subscription"),
        Some(id),
        None,
    )?;

    Ok(Json(ResolvedSubscription {
        subscription,
        effective_status,
    }))
}

/// PUT /api/subscriptions/:id - Update a subscription
pub async fn update_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Subscription>, AppError> {
    load_owned(&state, id, &current.user)?;
    let update = request.into_update()?;

    let subscription = state
        .db
        .update_subscription(id, update)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    state.db.log_audit(
        &current.user.email,
        "update",
        Some("subscription"),
        Some(id),
        None,
    )?;

    Ok(Json(subscription))
}

/// DELETE /api/subscriptions/:id - Delete a subscription
pub async fn delete_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let subscription = load_owned(&state, id, &current.user)?;

    state.db.delete_by_id(id)?;

    state.db.log_audit(
        &current.user.email,
        "delete",
        Some("subscription"),
        Some(id),
        Some(&format!("name={}", subscription.name)),
    )?;

    Ok(Json(SuccessResponse { success: true }))
}

/// PATCH /api/subscriptions/:id/cancel - Explicit status change (default: cancelled)
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Subscription>, AppError> {
    load_owned(&state, id, &current.user)?;
    let request: CancelRequest = parse_optional_body(&body)?;
    let status = request.status.as_deref().map(parse_status).transpose()?;

    let subscription = state
        .db
        .cancel_subscription(id, status)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    state.db.log_audit(
        &current.user.email,
        "cancel",
        Some("subscription"),
        Some(id),
        Some(&format!("status={}", subscription.status.as_str())),
    )?;

    Ok(Json(subscription))
}

/// PATCH /api/subscriptions/:id/upgrade - Move a free subscription to a paid plan
pub async fn upgrade_subscription(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    body: Bytes,
) -> Result<Json<Subscription>, AppError> {
    load_owned(&state, id, &current.user)?;
    let request: UpgradeRequest = parse_optional_body(&body)?;
    let upgrade = SubscriptionUpgrade {
        billing_cycle: request.billing_cycle.as_deref().map(parse_cycle).transpose()?,
        cost: request.cost,
        next_due_date: request.next_due_date.as_deref().map(parse_date).transpose()?,
    };

    let subscription = state
        .db
        .upgrade_subscription(id, &upgrade)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::not_found(&format!("Subscription {} not found", id)))?;

    state.db.log_audit(
        &current.user.email,
        "upgrade",
        Some("subscription"),
        Some(id),
        Some(&format!("cycle={}", subscription.billing_cycle.as_str())),
    )?;

    Ok(Json(subscription))
}

/// POST /api/subscriptions/reconcile - Persist resolved statuses for the caller
pub async fn reconcile_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ReconcileResult>, AppError> {
    let result = state
        .db
        .reconcile_statuses(Some(current.user.id), state.clock.now())?;

    state.db.log_audit(
        &current.user.email,
        "reconcile",
        Some("subscription"),
        None,
        Some(&format!(
            "checked={}, updated={}",
            result.checked, result.updated
        )),
    )?;

    Ok(Json(result))
}
