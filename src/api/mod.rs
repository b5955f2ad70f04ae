//! HTTP API: kiosk and member session endpoints

mod errors;
mod extractors;
pub mod handlers;

pub use errors::ApiError;
pub use extractors::{AuthenticatorFor, RequireSession};

use axum::{
    routing::{get, post},
    Router,
};
use handlers::{
    health_check, kiosk_login, kiosk_logout, kiosk_session, member_login, member_logout,
    member_session, AppState,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
///   GET  /health
///   POST /api/kiosk/login    {event_code, pin}
///   POST /api/kiosk/logout
///   GET  /api/kiosk/session
///   POST /api/member/login   {member_id, password}
///   POST /api/member/logout
///   GET  /api/member/session
pub fn router(state: Arc<AppState>, max_concurrent_requests: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/kiosk/login", post(kiosk_login))
        .route("/api/kiosk/logout", post(kiosk_logout))
        .route("/api/kiosk/session", get(kiosk_session))
        .route("/api/member/login", post(member_login))
        .route("/api/member/logout", post(member_logout))
        .route("/api/member/session", get(member_session))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(max_concurrent_requests.max(1)))
        .with_state(state)
}
