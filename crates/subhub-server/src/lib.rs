//! SubHub Web Server
//!
//! Axum-based REST API for the SubHub subscription tracker.
//!
//! Security features:
//! - Authenticating-proxy header or API key auth (secure by default, use --no-auth for local dev)
//! - Per-user ownership checks on every subscription
//! - Restrictive CORS policy
//! - Full audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use subhub_core::models::User;
use subhub_core::{Clock, Database, Notifier, NotificationTransport, SystemClock};

mod handlers;
mod scheduler;

pub use scheduler::{duration_until_next_run, start_reminder_scheduler, ReminderScheduleConfig};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header set by the authenticating reverse proxy
pub const USER_HEADER: &str = "x-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Identity used for API key requests without a user header
pub const API_KEY_USER: &str = "api-key";

/// Identity used when authentication is disabled
pub const LOCAL_DEV_USER: &str = "local-dev";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys for service-to-service access
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

impl ServerConfig {
    /// Parse a comma-separated `SUBHUB_API_KEYS` value
    pub fn parse_api_keys(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Transport used by manual reminder runs
    pub notifier: Notifier,
    /// Reference time for status, analytics and reminder windows
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig, notifier: Notifier) -> Self {
        Self {
            db,
            config,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock (for testing)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// The authenticated caller, inserted into request extensions by the auth middleware
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    /// How the caller was authenticated
    pub auth_method: &'static str,
}

/// Authentication middleware - resolves the caller and provisions their user record
///
/// # Security Notes
///
/// **Proxy header**: `X-Authenticated-User-Email` is trusted as-is. Only run with
/// auth enabled behind a proxy that strips/rewrites this header.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let header_user = request
        .headers()
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let (identity, auth_method) = if !state.config.require_auth {
        match header_user {
            Some(email) => (email, "header"),
            None => (LOCAL_DEV_USER.to_string(), "none"),
        }
    } else if let Some(email) = header_user {
        info!(user = %email, path = %request.uri().path(), "Authenticated via proxy header");
        (email, "proxy_header")
    } else if request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false)
    {
        info!(user = API_KEY_USER, path = %request.uri().path(), "Authenticated via API key");
        (API_KEY_USER.to_string(), "api_key")
    } else {
        warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
        return AppError::unauthorized("Authentication required").into_response();
    };

    let user = match state.db.upsert_user(&identity, None) {
        Ok(user) => user,
        Err(e) => return AppError::from(e).into_response(),
    };

    request
        .extensions_mut()
        .insert(CurrentUser { user, auth_method });
    next.run(request).await
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
///
/// Reminder runs use the transport configured in the environment, falling
/// back to logging when it cannot be built.
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let notifier = match Notifier::from_env() {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!(error = %e, "Notification transport misconfigured, reminders will only be logged");
            Notifier::Log(subhub_core::LogTransport)
        }
    };
    create_router_with_state(Arc::new(AppState::new(db, config, notifier)))
}

/// Create the application router from prepared state (for testing)
pub fn create_router_with_state(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Subscriptions
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route(
            "/subscriptions/reconcile",
            post(handlers::reconcile_subscriptions),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .put(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .route(
            "/subscriptions/:id/cancel",
            patch(handlers::cancel_subscription),
        )
        .route(
            "/subscriptions/:id/upgrade",
            patch(handlers::upgrade_subscription),
        )
        // Analytics
        .route("/analytics", get(handlers::get_analytics))
        .route("/analytics/spending", get(handlers::get_spending))
        // Reminders
        .route("/reminders/run", post(handlers::run_reminders))
        // Audit
        .route("/audit", get(handlers::list_audit_log));

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server with custom configuration
///
/// When `reminders` is set, the reminder scheduler runs alongside the API.
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
    reminders: Option<ReminderScheduleConfig>,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    let notifier = Notifier::from_env()?;
    info!(transport = notifier.name(), "Notification transport ready");

    if let Some(schedule) = reminders {
        start_reminder_scheduler(db.clone(), notifier.clone(), schedule);
    } else {
        info!("ℹ️  Reminder scheduler disabled");
    }

    let state = Arc::new(AppState::new(db, config, notifier));
    let app = create_router_with_state(state);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    /// Map a core error to its client-facing status
    ///
    /// Validation and lookup failures keep their message; anything else is
    /// logged and reported as a generic 500.
    pub fn from_core(err: subhub_core::Error) -> Self {
        use subhub_core::Error;
        match err {
            Error::InvalidData(msg) => Self::bad_request(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::NotAuthorized(msg) => Self::forbidden(&msg),
            other => Self::from(other),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
