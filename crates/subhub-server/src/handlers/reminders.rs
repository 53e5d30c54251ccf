//! Manual reminder runs

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, CurrentUser};
use subhub_core::models::ReminderRunResult;
use subhub_core::reminders::DEFAULT_DAYS_BEFORE;
use subhub_core::ReminderDispatcher;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRemindersQuery {
    #[serde(default = "default_days_before")]
    pub days_before: u32,
}

fn default_days_before() -> u32 {
    DEFAULT_DAYS_BEFORE
}

/// POST /api/reminders/run - Run one reminder pass across all users
pub async fn run_reminders(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<RunRemindersQuery>,
) -> Result<Json<ReminderRunResult>, AppError> {
    if params.days_before == 0 {
        return Err(AppError::bad_request("daysBefore must be at least 1"));
    }

    let dispatcher = ReminderDispatcher::new(&state.db, &state.notifier, state.clock.as_ref());
    let result = dispatcher.dispatch(params.days_before).await?;

    state.db.log_audit(
        &current.user.email,
        "run",
        Some("reminders"),
        None,
        Some(&format!(
            "days_before={}, checked={}, sent={}",
            params.days_before, result.checked, result.sent
        )),
    )?;

    Ok(Json(result))
}
