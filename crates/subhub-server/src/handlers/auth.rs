//! Authentication-related handlers

use axum::{Extension, Json};
use serde::Serialize;

use subhub_core::models::User;

use crate::CurrentUser;

/// Response for the /api/me endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    /// The authenticated user
    pub user: User,
    /// How the user was authenticated
    pub auth_method: String,
}

/// GET /api/me - Get the currently authenticated user
pub async fn get_me(Extension(current): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: current.user,
        auth_method: current.auth_method.to_string(),
    })
}
